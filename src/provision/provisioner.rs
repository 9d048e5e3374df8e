//! Scene provisioning
//!
//! Ensures the game's scene exists, asks the inventory checker what is
//! missing, and creates those capture sources. Nothing is cached between
//! passes: every call re-queries OBS, so sources removed externally are
//! noticed on the next session.

use std::sync::Arc;
use tracing::{debug, info};

use crate::error::ProvisioningError;
use crate::game::Game;
use crate::obs::{SceneBackend, SceneOutcome};

use super::{InventoryChecker, SourceCatalog};

/// Outcome of one provisioning pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvisionResult {
    /// Whether any capture source was created
    pub created: bool,
}

pub struct Provisioner {
    backend: Arc<dyn SceneBackend>,
    inventory: Box<dyn InventoryChecker>,
    catalog: SourceCatalog,
}

impl Provisioner {
    pub fn new(
        backend: Arc<dyn SceneBackend>,
        inventory: Box<dyn InventoryChecker>,
        catalog: SourceCatalog,
    ) -> Self {
        Self {
            backend,
            inventory,
            catalog,
        }
    }

    pub async fn provision(&self, game: &Game) -> Result<ProvisionResult, ProvisioningError> {
        let scene = game.scene_name();

        let outcome = self
            .backend
            .create_scene(scene)
            .await
            .map_err(|source| ProvisioningError::Scene {
                scene: scene.to_string(),
                source,
            })?;
        if outcome == SceneOutcome::AlreadyExists {
            debug!("Reusing existing scene '{}'", scene);
        }

        let missing = self
            .inventory
            .missing_sources(scene)
            .await
            .map_err(|source| ProvisioningError::Inventory {
                scene: scene.to_string(),
                source,
            })?;

        if missing.is_empty() {
            debug!("Scene '{}' already has capture sources", scene);
            return Ok(ProvisionResult { created: false });
        }

        info!("Creating input sources for '{}'...", game);
        for kind in missing {
            let descriptor = self
                .catalog
                .descriptor(kind)
                .ok_or(ProvisioningError::NoSourceKind(kind.label()))?;
            let source_name = game.source_name(kind);

            self.backend
                .create_input(scene, &source_name, &descriptor.input_kind)
                .await
                .map_err(|source| ProvisioningError::Source {
                    source_name: source_name.clone(),
                    source,
                })?;
        }

        Ok(ProvisionResult { created: true })
    }
}
