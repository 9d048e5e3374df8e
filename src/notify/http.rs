//! HTTP notifier for the local coordinator

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::CoordinatorConfig;
use crate::error::NotificationError;
use crate::game::Game;

use super::Notifier;

/// Sends bodiless GETs to the coordinator's fixed endpoints
#[derive(Clone)]
pub struct HttpNotifier {
    client: Client,
    ready_url: String,
    change_game_url: String,
}

impl HttpNotifier {
    pub fn new(config: &CoordinatorConfig) -> Self {
        let client = build_client(config.timeout());

        Self {
            client,
            ready_url: config.ready_url(),
            change_game_url: config.change_game_url(),
        }
    }

    async fn get(&self, url: &str) -> Result<(), NotificationError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| NotificationError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotificationError::Status {
                url: url.to_string(),
                status,
            });
        }

        debug!("GET {} -> {}", url, status);
        Ok(())
    }
}

/// Client with `timeout`, or reqwest's default client if the builder fails
fn build_client(timeout: Duration) -> Client {
    match Client::builder().timeout(timeout).build() {
        Ok(client) => client,
        Err(e) => {
            warn!(
                "Failed to build coordinator HTTP client ({}), falling back to defaults without the {:?} timeout",
                e, timeout
            );
            Client::new()
        }
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn notify_ready(&self) -> Result<(), NotificationError> {
        self.get(&self.ready_url).await
    }

    async fn notify_game_changed(&self, _game: &Game) -> Result<(), NotificationError> {
        // The coordinator reads the new game from its own state
        self.get(&self.change_game_url).await
    }
}
