use glint_scene::{Scene, Stage};

/// Renderer-agnostic interface. All renderers implement this trait.
///
/// The renderer reads scene state and produces output. It never mutates the
/// scene.
pub trait Renderer {
    /// The output type produced by this renderer.
    type Output;

    /// Render one frame from the given scene.
    fn render(&self, scene: &Scene) -> Self::Output;
}

/// Human-readable description of a scene, for the CLI, logs and tests.
#[derive(Debug, Default)]
pub struct DebugTextRenderer;

impl DebugTextRenderer {
    pub fn new() -> Self {
        Self
    }
}

fn stage_label(stage: &Stage) -> String {
    match stage {
        Stage::Pending => "pending".into(),
        Stage::Loading { fraction: Some(f) } => format!("loading {:.0}%", f * 100.0),
        Stage::Loading { fraction: None } => "loading".into(),
        Stage::Ready => "ready".into(),
        Stage::Failed(e) => format!("failed ({e})"),
    }
}

impl Renderer for DebugTextRenderer {
    type Output = String;

    fn render(&self, scene: &Scene) -> String {
        let mut out = String::new();
        let cam = &scene.camera;
        out.push_str(&format!("=== Scene (objects={}) ===\n", scene.object_count()));
        out.push_str(&format!(
            "Camera: pos=({:.1}, {:.1}, {:.1}) fov={:.0} aspect={:.2} near={} far={}\n",
            cam.position.x,
            cam.position.y,
            cam.position.z,
            cam.fov_degrees,
            cam.aspect,
            cam.near,
            cam.far
        ));

        let status = scene.status();
        match scene.environment() {
            Some(env) => out.push_str(&format!(
                "Environment: {}x{} levels={} [{}]\n",
                env.base().width,
                env.base().height,
                env.mip_count(),
                stage_label(&status.environment)
            )),
            None => out.push_str(&format!(
                "Environment: none [{}]\n",
                stage_label(&status.environment)
            )),
        }

        match scene.model() {
            Some(model) => {
                let s = model.data.summary();
                let r = model.transform.rotation;
                out.push_str(&format!(
                    "Model {:?} '{}': primitives={} vertices={} triangles={} materials={}\n",
                    model.id, s.name, s.primitives, s.vertices, s.triangles, s.materials
                ));
                out.push_str(&format!(
                    "  rotation=({:.3}, {:.3}, {:.3})\n",
                    r.x, r.y, r.z
                ));
            }
            None => out.push_str(&format!("Model: none [{}]\n", stage_label(&status.model))),
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_assets::{MeshPrimitive, ModelData};
    use glint_scene::LoadEvent;
    use std::sync::Arc;

    #[test]
    fn empty_scene() {
        let scene = Scene::new();
        let output = DebugTextRenderer::new().render(&scene);
        assert!(output.contains("objects=0"));
        assert!(output.contains("Model: none [pending]"));
        assert!(output.contains("fov=40"));
    }

    #[test]
    fn scene_with_model() {
        let mut scene = Scene::new();
        scene.add_model(Arc::new(ModelData {
            name: "tri".into(),
            primitives: vec![MeshPrimitive {
                positions: vec![[0.0; 3]; 3],
                normals: vec![[0.0, 1.0, 0.0]; 3],
                uvs: vec![[0.0; 2]; 3],
                indices: vec![0, 1, 2],
                material: None,
            }],
            ..ModelData::default()
        }));
        let output = DebugTextRenderer::new().render(&scene);
        assert!(output.contains("objects=1"));
        assert!(output.contains("'tri'"));
        assert!(output.contains("triangles=1"));
    }

    #[test]
    fn failed_load_is_reported() {
        let mut scene = Scene::new();
        scene.apply(LoadEvent::ModelFailed("404".into()));
        let output = DebugTextRenderer::new().render(&scene);
        assert!(output.contains("failed (404)"));
    }
}
