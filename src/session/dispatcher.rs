//! Session event dispatcher
//!
//! Single-task state machine over OBS session events and presentation-layer
//! commands. Provisioning runs on its own task so new events keep flowing
//! while it is awaited; at most one pass is scheduled or in flight at a time.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::{HelperConfig, SessionConfig};
use crate::error::{ProvisioningError, SpawnError};
use crate::game::{Game, SelectedGame};
use crate::helper::HelperBridge;
use crate::notify::Notifier;
use crate::obs::SessionEvent;
use crate::provision::{ProvisionResult, Provisioner};

use super::{SessionChannels, SessionCommand, SessionState};

/// Why the dispatcher stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionExit {
    /// OBS announced it is exiting
    ExitStarted,
    /// The event stream closed
    Disconnected,
    /// Shutdown was requested locally
    Shutdown,
}

/// What the run loop should do after an event
enum Next {
    Continue,
    ScheduleProvisioning,
    Exit,
}

type ProvisionTask = JoinHandle<Result<ProvisionResult, ProvisioningError>>;

/// The session dispatcher
pub struct SessionDispatcher {
    /// Session ID, fresh per connection
    id: Uuid,
    /// Current state, mirrored to `state_tx`
    state: SessionState,
    /// Game provisioned on the next pass
    game: Option<Game>,
    /// Shared selected-game value kept in sync with `game`
    selected: SelectedGame,
    settle_delay: Duration,
    provisioner: Arc<Provisioner>,
    notifier: Arc<dyn Notifier>,
    helper: Option<(HelperBridge, HelperConfig)>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    cmd_rx: mpsc::Receiver<SessionCommand>,
    state_tx: watch::Sender<SessionState>,
    shutdown: CancellationToken,
}

impl SessionDispatcher {
    pub fn new(
        config: &SessionConfig,
        provisioner: Arc<Provisioner>,
        notifier: Arc<dyn Notifier>,
        events: mpsc::UnboundedReceiver<SessionEvent>,
        channels: SessionChannels,
        shutdown: CancellationToken,
    ) -> Self {
        let game = config.game.clone().and_then(Game::new);

        Self {
            id: Uuid::new_v4(),
            state: SessionState::Disconnected,
            selected: SelectedGame::new(game.clone()),
            game,
            settle_delay: config.settle_delay(),
            provisioner,
            notifier,
            helper: None,
            events,
            cmd_rx: channels.cmd_rx,
            state_tx: channels.state_tx,
            shutdown,
        }
    }

    /// Share the selected-game value with other components
    pub fn with_selected_game(mut self, selected: SelectedGame) -> Self {
        if let Some(game) = &self.game {
            selected.set(game.clone());
        }
        self.selected = selected;
        self
    }

    /// Enable `SessionCommand::RunHelper`
    pub fn with_helper(mut self, bridge: HelperBridge, config: HelperConfig) -> Self {
        self.helper = Some((bridge, config));
        self
    }

    /// Run the dispatcher until OBS exits, disconnects, or shutdown is requested
    pub async fn run(mut self) -> SessionExit {
        info!("Session {} started", self.id);

        // Both are local so the select! futures below only borrow them
        let mut settle_timer: Option<std::pin::Pin<Box<tokio::time::Sleep>>> = None;
        let mut in_flight: Option<ProvisionTask> = None;

        let exit = loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown requested");
                    break SessionExit::Shutdown;
                }

                event = self.events.recv() => {
                    let Some(event) = event else {
                        info!("OBS connection closed");
                        break SessionExit::Disconnected;
                    };

                    let busy = settle_timer.is_some() || in_flight.is_some();
                    match self.handle_event(event, busy) {
                        Next::Continue => {}
                        Next::ScheduleProvisioning => {
                            debug!("Provisioning in {:?}", self.settle_delay);
                            settle_timer = Some(Box::pin(tokio::time::sleep(self.settle_delay)));
                        }
                        Next::Exit => break SessionExit::ExitStarted,
                    }
                }

                Some(cmd) = self.cmd_rx.recv() => {
                    self.handle_command(cmd);
                }

                // Settle delay elapsed
                _ = async {
                    match settle_timer.as_mut() {
                        Some(timer) => timer.as_mut().await,
                        None => std::future::pending().await,
                    }
                } => {
                    settle_timer = None;
                    in_flight = self.start_provisioning();
                }

                // Provisioning pass finished
                result = async {
                    match in_flight.as_mut() {
                        Some(task) => task.await,
                        None => std::future::pending().await,
                    }
                } => {
                    in_flight = None;
                    match result {
                        Ok(result) => self.finish_provisioning(result),
                        Err(e) => {
                            error!("Provisioning task failed: {}", e);
                            self.set_state(SessionState::Identified);
                        }
                    }
                }
            }
        };

        // Dropping the timer cancels it
        drop(settle_timer);
        if let Some(task) = in_flight.take() {
            warn!("Abandoning in-flight provisioning pass");
            task.abort();
        }

        self.set_state(SessionState::Disconnected);
        info!("Session {} ended ({:?})", self.id, exit);
        exit
    }

    fn handle_event(&mut self, event: SessionEvent, busy: bool) -> Next {
        match event {
            SessionEvent::ExitStarted => {
                info!("Now exiting...");
                // Stops the gate server and main loop as well
                self.shutdown.cancel();
                Next::Exit
            }

            SessionEvent::Identified => {
                if busy {
                    warn!("Identified while a provisioning pass is pending, skipping");
                    return Next::Continue;
                }
                info!("Connected to OBS WebSocket");
                self.set_state(SessionState::Identified);
                Next::ScheduleProvisioning
            }

            SessionEvent::RecordStateChanged {
                output_active,
                output_path,
            } => {
                if !output_active {
                    if let Some(path) = &output_path {
                        info!("Recording finished: {:?}", path);
                    }
                }

                match (output_active, self.state) {
                    (true, SessionState::Ready) => self.set_state(SessionState::Recording),
                    (false, SessionState::Recording) => self.set_state(SessionState::Ready),
                    (active, state) => {
                        debug!("Record state active={} while {}", active, state)
                    }
                }
                Next::Continue
            }

            SessionEvent::ReplayBufferSaved { path } => {
                info!("Replay buffer saved: {:?}", path);
                Next::Continue
            }

            SessionEvent::InputCreated { name, kind } => {
                info!("Input created: {} ({})", name, kind);
                Next::Continue
            }
        }
    }

    fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::ChangeGame(game) => self.change_game(game),
            SessionCommand::RunHelper { reply } => {
                let result = self.run_helper();
                if let Err(e) = &result {
                    error!("Failed to start helper: {}", e);
                }
                let _ = reply.send(result);
            }
        }
    }

    fn change_game(&mut self, game: Game) {
        info!("Active game set to '{}'", game);
        self.game = Some(game.clone());
        self.selected.set(game.clone());

        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            match notifier.notify_game_changed(&game).await {
                Ok(()) => info!("Game changed to {}", game),
                Err(e) => warn!("Failed to change the game: {}", e),
            }
        });
    }

    fn run_helper(&self) -> Result<Uuid, SpawnError> {
        let Some((bridge, config)) = &self.helper else {
            return Err(SpawnError::NotConfigured);
        };
        let Some(executable) = &config.executable else {
            return Err(SpawnError::NotConfigured);
        };

        let mut env = BTreeMap::new();
        if let Some(game) = &self.game {
            env.insert("CURRENT_GAME".to_string(), game.name().to_string());
        }
        // Last game seen by the gate, which may differ from the session's game
        if let Some(game) = self.selected.get() {
            env.insert("SELECTED_GAME".to_string(), game.name().to_string());
        }
        env.extend(config.env.clone());

        let session = bridge.spawn(executable, &config.args, &env)?;
        Ok(session.id())
    }

    fn start_provisioning(&mut self) -> Option<ProvisionTask> {
        let Some(game) = self.game.clone() else {
            warn!("No game selected, skipping provisioning");
            return None;
        };

        info!("Provisioning scene for '{}'", game);
        self.set_state(SessionState::Provisioning);

        let provisioner = Arc::clone(&self.provisioner);
        Some(tokio::spawn(async move { provisioner.provision(&game).await }))
    }

    fn finish_provisioning(&mut self, result: Result<ProvisionResult, ProvisioningError>) {
        match result {
            Ok(result) => {
                info!("Provisioning complete (sources created: {})", result.created);
                self.set_state(SessionState::Ready);
                self.signal_ready();
            }
            Err(e) => {
                error!("Provisioning failed: {:#}", anyhow::Error::new(e));
                self.set_state(SessionState::Identified);
            }
        }
    }

    /// Fire-and-forget; failures never undo `Ready`
    fn signal_ready(&self) {
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            if let Err(e) = notifier.notify_ready().await {
                warn!("Failed to signal readiness: {}", e);
            }
        });
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            debug!("Session {}: {} -> {}", self.id, self.state, state);
        }
        self.state = state;
        self.state_tx.send_replace(state);
    }
}
