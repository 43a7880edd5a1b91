use crossbeam_channel::{Receiver, Sender};
use glint_assets::{
    AssetCache, AssetError, AssetSource, HdrImage, ModelData, PrefilteredEnvironment,
    fetch, fetch_with_progress,
};
use glint_scene::LoadEvent;
use std::sync::Arc;

/// What the background loader fetches, in order.
#[derive(Debug, Clone)]
pub struct LoadJob {
    pub environment: AssetSource,
    pub model: AssetSource,
    pub cache: Option<AssetCache>,
    pub env_levels: u32,
}

/// Start the loader thread. The returned channel closes once both assets
/// have been reported.
pub fn spawn(job: LoadJob) -> std::io::Result<Receiver<LoadEvent>> {
    let (tx, rx) = crossbeam_channel::unbounded();
    std::thread::Builder::new()
        .name("asset-loader".into())
        .spawn(move || run(&job, &tx))?;
    Ok(rx)
}

/// Environment first, then the model whether or not the environment loaded.
pub fn run(job: &LoadJob, tx: &Sender<LoadEvent>) {
    let env_event = match load_environment(&job.environment, job.cache.as_ref(), job.env_levels) {
        Ok(env) => LoadEvent::EnvironmentReady(Arc::new(env)),
        Err(e) => LoadEvent::EnvironmentFailed(e.to_string()),
    };
    if tx.send(env_event).is_err() {
        tracing::debug!("viewer closed before the environment was delivered");
        return;
    }

    let model_event = match load_model(&job.model, job.cache.as_ref(), tx) {
        Ok(model) => LoadEvent::ModelReady(Arc::new(model)),
        Err(e) => LoadEvent::ModelFailed(e.to_string()),
    };
    if tx.send(model_event).is_err() {
        tracing::debug!("viewer closed before the model was delivered");
    }
}

fn load_environment(
    source: &AssetSource,
    cache: Option<&AssetCache>,
    levels: u32,
) -> Result<PrefilteredEnvironment, AssetError> {
    let _span = tracing::info_span!("load_environment", %source).entered();
    let bytes = fetch(source, cache)?;
    let hdr = HdrImage::decode(&bytes)?;
    tracing::debug!(
        "environment {}x{}, peak luminance {:.1}",
        hdr.width,
        hdr.height,
        hdr.peak_luminance()
    );
    Ok(PrefilteredEnvironment::from_equirect(&hdr, levels))
}

fn load_model(
    source: &AssetSource,
    cache: Option<&AssetCache>,
    tx: &Sender<LoadEvent>,
) -> Result<ModelData, AssetError> {
    let _span = tracing::info_span!("load_model", %source).entered();
    let bytes = fetch_with_progress(source, cache, |loaded, total| {
        let _ = tx.send(LoadEvent::ModelProgress { loaded, total });
    })?;
    ModelData::import(&bytes, source, cache)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_hdr() -> Vec<u8> {
        let mut bytes = b"#?RADIANCE\nFORMAT=32-bit_rle_rgbe\n\n-Y 1 +X 2\n".to_vec();
        bytes.extend_from_slice(&[128, 128, 128, 129]);
        bytes.extend_from_slice(&[128, 0, 0, 129]);
        bytes
    }

    fn job(dir: &std::path::Path) -> LoadJob {
        LoadJob {
            environment: AssetSource::Path(dir.join("env.hdr")),
            model: AssetSource::Path(dir.join("missing.gltf")),
            cache: None,
            env_levels: 8,
        }
    }

    #[test]
    fn model_is_attempted_after_environment_failure() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = crossbeam_channel::unbounded();
        run(&job(dir.path()), &tx);
        drop(tx);
        let events: Vec<LoadEvent> = rx.iter().collect();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], LoadEvent::EnvironmentFailed(_)));
        assert!(matches!(events[1], LoadEvent::ModelFailed(_)));
    }

    #[test]
    fn environment_is_decoded_and_prefiltered() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("env.hdr"), tiny_hdr()).unwrap();
        let (tx, rx) = crossbeam_channel::unbounded();
        run(&job(dir.path()), &tx);
        drop(tx);
        let events: Vec<LoadEvent> = rx.iter().collect();
        match &events[0] {
            LoadEvent::EnvironmentReady(env) => {
                assert_eq!(env.base().width, 2);
                assert_eq!(env.mip_count(), 1);
            }
            other => panic!("unexpected first event {other:?}"),
        }
        assert!(matches!(events.last(), Some(LoadEvent::ModelFailed(_))));
    }

    #[test]
    fn spawned_loader_closes_channel() {
        let dir = tempfile::tempdir().unwrap();
        let rx = spawn(job(dir.path())).unwrap();
        let events: Vec<LoadEvent> = rx.iter().collect();
        assert_eq!(events.len(), 2);
    }
}
