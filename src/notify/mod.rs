//! Best-effort signals to the local coordinator

mod http;

use async_trait::async_trait;

use crate::error::NotificationError;
use crate::game::Game;

pub use http::HttpNotifier;

/// Outbound signals with no acknowledgment beyond success or failure.
///
/// Callers fire each signal at most once per trigger and never roll back
/// local state when it fails.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Provisioning finished and OBS is ready
    async fn notify_ready(&self) -> Result<(), NotificationError>;

    /// The active game changed
    async fn notify_game_changed(&self, game: &Game) -> Result<(), NotificationError>;
}
