//! Session orchestration - reacts to OBS lifecycle events
//!
//! The dispatcher owns one OBS session: it provisions the active game's scene
//! after identification, signals readiness to the coordinator, and serves
//! commands from the presentation layer.

mod dispatcher;

pub use dispatcher::{SessionDispatcher, SessionExit};

use std::fmt;
use tokio::sync::{mpsc, oneshot, watch};
use uuid::Uuid;

use crate::error::SpawnError;
use crate::game::Game;

/// Connection state of a session with OBS
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No live connection
    Disconnected,
    /// Identified, provisioning scheduled or last pass failed
    Identified,
    /// A provisioning pass is in flight
    Provisioning,
    /// Scene and sources are in place, readiness signalled
    Ready,
    /// OBS is recording
    Recording,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Identified => "identified",
            SessionState::Provisioning => "provisioning",
            SessionState::Ready => "ready",
            SessionState::Recording => "recording",
        };
        f.write_str(name)
    }
}

/// Commands that can be sent to the session dispatcher
#[derive(Debug)]
pub enum SessionCommand {
    /// Switch the active game and tell the coordinator
    ChangeGame(Game),
    /// Launch the configured helper process
    RunHelper {
        reply: oneshot::Sender<Result<Uuid, SpawnError>>,
    },
}

/// Cloneable handle for talking to a running dispatcher
#[derive(Clone)]
pub struct SessionHandle {
    cmd_tx: mpsc::Sender<SessionCommand>,
    state_rx: watch::Receiver<SessionState>,
}

impl SessionHandle {
    pub fn state(&self) -> SessionState {
        *self.state_rx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_rx.clone()
    }

    /// Returns false if the dispatcher has stopped
    pub async fn change_game(&self, game: Game) -> bool {
        self.cmd_tx
            .send(SessionCommand::ChangeGame(game))
            .await
            .is_ok()
    }

    /// Launch the helper, returning its session id once spawned
    pub async fn run_helper(&self) -> Result<Uuid, SpawnError> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(SessionCommand::RunHelper { reply })
            .await
            .map_err(|_| SpawnError::Dropped)?;
        rx.await.map_err(|_| SpawnError::Dropped)?
    }
}

/// Channels connecting a dispatcher to its handle
pub struct SessionChannels {
    pub cmd_rx: mpsc::Receiver<SessionCommand>,
    pub state_tx: watch::Sender<SessionState>,
}

/// Create the command and state channels for a dispatcher
pub fn create_session_channels() -> (SessionHandle, SessionChannels) {
    let (cmd_tx, cmd_rx) = mpsc::channel(32);
    let (state_tx, state_rx) = watch::channel(SessionState::Disconnected);
    (
        SessionHandle { cmd_tx, state_rx },
        SessionChannels { cmd_rx, state_tx },
    )
}
