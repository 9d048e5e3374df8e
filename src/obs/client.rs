//! OBS WebSocket client and the scene graph operations provisioning needs

use anyhow::{Context, Result};
use async_trait::async_trait;
use obws::responses::StatusCode;
use obws::Client;
use tracing::{debug, info};

use crate::config::ObsConfig;
use crate::error::TransportError;

/// Result of asking OBS to create a scene
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneOutcome {
    Created,
    AlreadyExists,
}

/// Scene graph operations on the production tool
#[async_trait]
pub trait SceneBackend: Send + Sync {
    /// Create a scene; an existing scene of the same name is not an error
    async fn create_scene(&self, name: &str) -> Result<SceneOutcome, TransportError>;

    /// Create an input of `input_kind` named `name` inside `scene`
    async fn create_input(
        &self,
        scene: &str,
        name: &str,
        input_kind: &str,
    ) -> Result<(), TransportError>;

    /// Names of the sources currently attached to `scene`
    async fn list_scene_sources(&self, scene: &str) -> Result<Vec<String>, TransportError>;
}

/// Connect to OBS. Identification completes inside `connect`.
pub async fn connect(config: &ObsConfig) -> Result<Client> {
    info!("Connecting to OBS WebSocket at {}:{}", config.host, config.port);

    let client = Client::connect(&config.host, config.port, config.password.as_deref())
        .await
        .context("Failed to connect to OBS WebSocket")?;

    if let Ok(version) = client.general().version().await {
        info!(
            "Connected to OBS {} (WebSocket {})",
            version.obs_version, version.obs_web_socket_version
        );
    }

    Ok(client)
}

/// `SceneBackend` over a live obws client
pub struct ObwsBackend {
    client: Client,
}

impl ObwsBackend {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SceneBackend for ObwsBackend {
    async fn create_scene(&self, name: &str) -> Result<SceneOutcome, TransportError> {
        match self.client.scenes().create(name).await {
            Ok(_) => {
                info!("Created scene '{}'", name);
                Ok(SceneOutcome::Created)
            }
            Err(obws::error::Error::Api {
                code: StatusCode::ResourceAlreadyExists,
                ..
            }) => {
                debug!("Scene '{}' already exists", name);
                Ok(SceneOutcome::AlreadyExists)
            }
            Err(source) => Err(request_error("CreateScene", source)),
        }
    }

    async fn create_input(
        &self,
        scene: &str,
        name: &str,
        input_kind: &str,
    ) -> Result<(), TransportError> {
        self.client
            .inputs()
            .create(obws::requests::inputs::Create {
                scene: scene.into(),
                input: name,
                kind: input_kind,
                settings: None::<serde_json::Value>,
                enabled: Some(true),
            })
            .await
            .map_err(|source| request_error("CreateInput", source))?;

        info!("Created input '{}' ({}) in scene '{}'", name, input_kind, scene);
        Ok(())
    }

    async fn list_scene_sources(&self, scene: &str) -> Result<Vec<String>, TransportError> {
        let items = self
            .client
            .scene_items()
            .list(scene.into())
            .await
            .map_err(|source| request_error("GetSceneItemList", source))?;

        Ok(items.into_iter().map(|item| item.source_name).collect())
    }
}

/// A dropped connection is reported as such, everything else as a failed request
fn request_error(request: &'static str, source: obws::error::Error) -> TransportError {
    match source {
        obws::error::Error::Disconnected => TransportError::Unavailable(source.to_string()),
        source => TransportError::Request { request, source },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disconnect_maps_to_unavailable() {
        let err = request_error("CreateScene", obws::error::Error::Disconnected);
        assert!(matches!(err, TransportError::Unavailable(_)));
    }

    #[test]
    fn test_other_errors_keep_the_request_name() {
        let err = request_error("CreateInput", obws::error::Error::Timeout);
        assert!(matches!(
            err,
            TransportError::Request {
                request: "CreateInput",
                ..
            }
        ));
    }
}
