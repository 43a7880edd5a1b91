use crate::camera::PerspectiveCamera;
use glint_assets::{ModelData, PrefilteredEnvironment};
use glint_common::Transform;
use std::sync::Arc;

/// Identifier of a model added to the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(pub u64);

/// The model placed in the scene together with its root transform.
#[derive(Debug, Clone)]
pub struct SceneModel {
    pub id: ModelId,
    pub transform: Transform,
    pub data: Arc<ModelData>,
}

/// Messages sent by the asset loader to the thread that owns the scene.
#[derive(Debug, Clone)]
pub enum LoadEvent {
    EnvironmentReady(Arc<PrefilteredEnvironment>),
    EnvironmentFailed(String),
    ModelProgress { loaded: u64, total: Option<u64> },
    ModelReady(Arc<ModelData>),
    ModelFailed(String),
}

/// A record produced by every scene mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent {
    EnvironmentSet { width: u32, height: u32, levels: u32 },
    ModelAdded { id: ModelId, name: String },
    ModelReplaced { old: ModelId, new: ModelId },
}

/// Progress of one asynchronous load.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Stage {
    #[default]
    Pending,
    Loading {
        fraction: Option<f32>,
    },
    Ready,
    Failed(String),
}

impl Stage {
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Ready | Self::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LoadStatus {
    pub environment: Stage,
    pub model: Stage,
}

/// Viewer scene: camera, environment lighting and at most one model.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub camera: PerspectiveCamera,
    environment: Option<Arc<PrefilteredEnvironment>>,
    model: Option<SceneModel>,
    status: LoadStatus,
    next_id: u64,
    event_log: Vec<SceneEvent>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn environment(&self) -> Option<&Arc<PrefilteredEnvironment>> {
        self.environment.as_ref()
    }

    pub fn set_environment(&mut self, env: Arc<PrefilteredEnvironment>) {
        let base = env.base();
        self.event_log.push(SceneEvent::EnvironmentSet {
            width: base.width,
            height: base.height,
            levels: env.mip_count(),
        });
        self.environment = Some(env);
        self.status.environment = Stage::Ready;
    }

    /// Place a model at the origin. A second call replaces the first model.
    pub fn add_model(&mut self, data: Arc<ModelData>) -> ModelId {
        let id = ModelId(self.next_id);
        self.next_id += 1;
        let name = data.name.clone();
        let previous = self.model.replace(SceneModel {
            id,
            transform: Transform::default(),
            data,
        });
        match previous {
            Some(old) => {
                tracing::warn!("replacing model {:?} with {:?}", old.id, id);
                self.event_log
                    .push(SceneEvent::ModelReplaced { old: old.id, new: id });
            }
            None => self.event_log.push(SceneEvent::ModelAdded { id, name }),
        }
        self.status.model = Stage::Ready;
        id
    }

    pub fn model(&self) -> Option<&SceneModel> {
        self.model.as_ref()
    }

    pub fn model_mut(&mut self) -> Option<&mut SceneModel> {
        self.model.as_mut()
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Number of objects in the scene (0 or 1).
    pub fn object_count(&self) -> usize {
        usize::from(self.model.is_some())
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    /// Mark the environment fetch as started.
    pub fn begin_loading(&mut self) {
        self.status.environment = Stage::Loading { fraction: None };
    }

    /// Route a loader message into scene state.
    pub fn apply(&mut self, event: LoadEvent) {
        match event {
            LoadEvent::EnvironmentReady(env) => {
                self.set_environment(env);
                tracing::info!("environment map assigned");
            }
            LoadEvent::EnvironmentFailed(message) => {
                tracing::error!("an error occurred while loading the environment map: {message}");
                self.status.environment = Stage::Failed(message);
            }
            LoadEvent::ModelProgress { loaded, total } => {
                let fraction = total
                    .filter(|t| *t > 0)
                    .map(|t| (loaded as f64 / t as f64).min(1.0) as f32);
                self.status.model = Stage::Loading { fraction };
            }
            LoadEvent::ModelReady(data) => {
                let id = self.add_model(data);
                tracing::info!("model {:?} added to scene", id);
            }
            LoadEvent::ModelFailed(message) => {
                tracing::error!("an error occurred while loading the glTF model: {message}");
                self.status.model = Stage::Failed(message);
            }
        }
    }

    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.event_log)
    }

    pub fn events(&self) -> &[SceneEvent] {
        &self.event_log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_assets::{HdrImage, MeshPrimitive};

    fn model(name: &str) -> Arc<ModelData> {
        Arc::new(ModelData {
            name: name.into(),
            primitives: vec![MeshPrimitive {
                positions: vec![[0.0; 3]; 3],
                normals: vec![[0.0, 0.0, 1.0]; 3],
                uvs: vec![[0.0; 2]; 3],
                indices: vec![0, 1, 2],
                material: None,
            }],
            ..ModelData::default()
        })
    }

    fn env() -> Arc<PrefilteredEnvironment> {
        let hdr = HdrImage::from_rgb(16, 8, vec![0.5; 16 * 8 * 3]).unwrap();
        Arc::new(PrefilteredEnvironment::from_equirect(&hdr, 8))
    }

    #[test]
    fn new_scene_is_empty() {
        let scene = Scene::new();
        assert!(!scene.has_model());
        assert!(scene.environment().is_none());
        assert_eq!(scene.object_count(), 0);
        assert_eq!(scene.status().model, Stage::Pending);
    }

    #[test]
    fn model_ready_adds_exactly_one_object() {
        let mut scene = Scene::new();
        scene.apply(LoadEvent::ModelReady(model("helmet")));
        assert_eq!(scene.object_count(), 1);
        let events = scene.drain_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], SceneEvent::ModelAdded { name, .. } if name == "helmet"));
        assert!(scene.events().is_empty());
        assert_eq!(scene.model().unwrap().transform, Transform::default());
    }

    #[test]
    fn second_model_replaces_first() {
        let mut scene = Scene::new();
        let a = scene.add_model(model("a"));
        let b = scene.add_model(model("b"));
        assert_ne!(a, b);
        assert_eq!(scene.object_count(), 1);
        assert_eq!(scene.model().unwrap().id, b);
        assert_eq!(
            scene.events().last(),
            Some(&SceneEvent::ModelReplaced { old: a, new: b })
        );
    }

    #[test]
    fn environment_ready_sets_slot() {
        let mut scene = Scene::new();
        scene.begin_loading();
        scene.apply(LoadEvent::EnvironmentReady(env()));
        assert!(scene.environment().is_some());
        assert_eq!(scene.status().environment, Stage::Ready);
        assert_eq!(
            scene.events(),
            &[SceneEvent::EnvironmentSet {
                width: 16,
                height: 8,
                levels: 3
            }]
        );
    }

    #[test]
    fn failures_only_change_status() {
        let mut scene = Scene::new();
        scene.apply(LoadEvent::EnvironmentFailed("404".into()));
        scene.apply(LoadEvent::ModelFailed("bad json".into()));
        assert!(!scene.has_model());
        assert!(scene.events().is_empty());
        assert_eq!(scene.status().model, Stage::Failed("bad json".into()));
        assert!(scene.status().environment.is_settled());
    }

    #[test]
    fn progress_fraction() {
        let mut scene = Scene::new();
        scene.apply(LoadEvent::ModelProgress {
            loaded: 50,
            total: Some(200),
        });
        assert_eq!(
            scene.status().model,
            Stage::Loading {
                fraction: Some(0.25)
            }
        );
        scene.apply(LoadEvent::ModelProgress {
            loaded: 50,
            total: None,
        });
        assert_eq!(scene.status().model, Stage::Loading { fraction: None });
    }
}
