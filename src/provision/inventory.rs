//! Inventory check deciding whether a scene still needs capture sources

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::TransportError;
use crate::obs::SceneBackend;

use super::CaptureKind;

/// Decides which capture sources a scene is missing
#[async_trait]
pub trait InventoryChecker: Send + Sync {
    /// Kinds that should be created for `scene`; empty means nothing to do
    async fn missing_sources(&self, scene: &str) -> Result<Vec<CaptureKind>, TransportError>;
}

/// Treats a scene with any source at all as fully provisioned.
///
/// A scene holding only an audio source therefore never gets a video source.
pub struct AnySourcePresent {
    backend: Arc<dyn SceneBackend>,
}

impl AnySourcePresent {
    pub fn new(backend: Arc<dyn SceneBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl InventoryChecker for AnySourcePresent {
    async fn missing_sources(&self, scene: &str) -> Result<Vec<CaptureKind>, TransportError> {
        let sources = self.backend.list_scene_sources(scene).await?;
        if sources.is_empty() {
            Ok(CaptureKind::ALL.to_vec())
        } else {
            Ok(Vec::new())
        }
    }
}
