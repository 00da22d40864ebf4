//! The display-composition collaborator: applies crops, switches scenes and
//! sets transitions. Each call resolves once the compositor has acknowledged
//! the request.

use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{info, warn};

use crate::common::config::{DryRunSettings, SceneSettings};
use crate::layout_engine::CropValues;
use crate::model::server::{SceneData, SourceData, SourceId};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CompositorError {
    #[error("compositor rejected {request}: {message}")]
    Request { request: &'static str, message: String },
    #[error("compositor connection is closed")]
    Disconnected,
}

pub trait Compositor: Send + Sync + 'static {
    fn apply_crop(
        &self,
        scene: &str,
        source: SourceId,
        crop: CropValues,
    ) -> impl Future<Output = Result<(), CompositorError>> + Send;

    fn switch_scene(&self, scene: &str) -> impl Future<Output = Result<(), CompositorError>> + Send;

    fn set_transition(
        &self,
        name: &str,
        duration: Option<Duration>,
    ) -> impl Future<Output = Result<(), CompositorError>> + Send;

    fn list_scenes(&self) -> impl Future<Output = Result<Vec<SceneData>, CompositorError>> + Send;
}

/// Runs `call` up to `1 + extra_attempts` times. Only for idempotent requests.
pub async fn with_retry<T, F, Fut>(
    extra_attempts: u32,
    what: &str,
    mut call: F,
) -> Result<T, CompositorError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CompositorError>>,
{
    let mut attempt = 0;
    loop {
        match call().await {
            Ok(v) => return Ok(v),
            Err(e) if attempt < extra_attempts => {
                attempt += 1;
                warn!(what, attempt, %e, "compositor call failed; retrying");
            }
            Err(e) => return Err(e),
        }
    }
}

/// Stand-in compositor that only logs. It pretends to host one gallery scene
/// per tile count, each holding that many full-frame display captures.
#[derive(Debug)]
pub struct LoggingCompositor {
    scenes: Vec<SceneData>,
    current_scene: Mutex<Option<String>>,
}

impl LoggingCompositor {
    pub fn new(dry_run: &DryRunSettings, scenes: &SceneSettings) -> Self {
        let kind = scenes
            .capture_kinds
            .first()
            .cloned()
            .unwrap_or_else(|| "display_capture".to_string());
        let mut all = vec![SceneData {
            name: scenes.blank_scene.clone(),
            sources: vec![],
        }];
        for count in 1..=dry_run.max_tiles {
            all.push(SceneData {
                name: format!("{}{count}", scenes.prefix),
                sources: (0..count)
                    .map(|i| SourceData {
                        id: SourceId::new(i as u64 + 1),
                        name: format!("gallery-{}", i + 1),
                        kind: kind.clone(),
                        width: dry_run.frame_width,
                        height: dry_run.frame_height,
                    })
                    .collect(),
            });
        }
        LoggingCompositor {
            scenes: all,
            current_scene: Mutex::new(None),
        }
    }

    pub fn current_scene(&self) -> Option<String> { self.current_scene.lock().clone() }
}

impl Compositor for LoggingCompositor {
    async fn apply_crop(
        &self,
        scene: &str,
        source: SourceId,
        crop: CropValues,
    ) -> Result<(), CompositorError> {
        info!(scene, %source, ?crop, "apply crop");
        Ok(())
    }

    async fn switch_scene(&self, scene: &str) -> Result<(), CompositorError> {
        if !self.scenes.iter().any(|s| s.name == scene) {
            return Err(CompositorError::Request {
                request: "switch_scene",
                message: format!("no scene named {scene:?}"),
            });
        }
        info!(scene, "switch scene");
        *self.current_scene.lock() = Some(scene.to_string());
        Ok(())
    }

    async fn set_transition(
        &self,
        name: &str,
        duration: Option<Duration>,
    ) -> Result<(), CompositorError> {
        info!(name, ?duration, "set transition");
        Ok(())
    }

    async fn list_scenes(&self) -> Result<Vec<SceneData>, CompositorError> {
        Ok(self.scenes.clone())
    }
}
