//! In-memory fakes for the OBS backend and the coordinator

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::error::{NotificationError, TransportError};
use crate::game::Game;
use crate::notify::Notifier;
use crate::obs::{SceneBackend, SceneOutcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    CreateScene(String),
    ListSources(String),
    CreateInput {
        scene: String,
        name: String,
        kind: String,
    },
}

#[derive(Default)]
struct BackendState {
    scenes: BTreeMap<String, Vec<String>>,
    calls: Vec<BackendCall>,
    fail_create_scene: bool,
    fail_list_sources: bool,
}

/// Scene graph kept in memory, recording every call
#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<BackendState>,
    /// Virtual time spent inside `create_scene`
    scene_delay: Option<Duration>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scene_delay(delay: Duration) -> Self {
        Self {
            scene_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn seed_scene(&self, scene: &str, sources: &[&str]) {
        self.state.lock().unwrap().scenes.insert(
            scene.to_string(),
            sources.iter().map(|s| s.to_string()).collect(),
        );
    }

    pub fn fail_create_scene(&self, fail: bool) {
        self.state.lock().unwrap().fail_create_scene = fail;
    }

    pub fn fail_list_sources(&self) {
        self.state.lock().unwrap().fail_list_sources = true;
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn scene_creations(&self) -> usize {
        self.count(|call| matches!(call, BackendCall::CreateScene(_)))
    }

    pub fn input_creations(&self) -> usize {
        self.count(|call| matches!(call, BackendCall::CreateInput { .. }))
    }

    pub fn sources_of(&self, scene: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .scenes
            .get(scene)
            .cloned()
            .unwrap_or_default()
    }

    fn count(&self, pred: impl Fn(&BackendCall) -> bool) -> usize {
        self.state.lock().unwrap().calls.iter().filter(|c| pred(c)).count()
    }
}

fn unavailable() -> TransportError {
    TransportError::Unavailable("fake backend failure".to_string())
}

#[async_trait]
impl SceneBackend for FakeBackend {
    async fn create_scene(&self, name: &str) -> Result<SceneOutcome, TransportError> {
        if let Some(delay) = self.scene_delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        state.calls.push(BackendCall::CreateScene(name.to_string()));
        if state.fail_create_scene {
            return Err(unavailable());
        }
        if state.scenes.contains_key(name) {
            return Ok(SceneOutcome::AlreadyExists);
        }
        state.scenes.insert(name.to_string(), Vec::new());
        Ok(SceneOutcome::Created)
    }

    async fn create_input(
        &self,
        scene: &str,
        name: &str,
        input_kind: &str,
    ) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(BackendCall::CreateInput {
            scene: scene.to_string(),
            name: name.to_string(),
            kind: input_kind.to_string(),
        });
        state
            .scenes
            .entry(scene.to_string())
            .or_default()
            .push(name.to_string());
        Ok(())
    }

    async fn list_scene_sources(&self, scene: &str) -> Result<Vec<String>, TransportError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(BackendCall::ListSources(scene.to_string()));
        if state.fail_list_sources {
            return Err(unavailable());
        }
        Ok(state.scenes.get(scene).cloned().unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    Ready,
    GameChanged(String),
}

/// Reports each signal on a channel; optionally fails every call
pub struct FakeNotifier {
    tx: mpsc::UnboundedSender<Signal>,
    fail: bool,
}

impl FakeNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Signal>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, fail: false }, rx)
    }

    pub fn failing() -> (Self, mpsc::UnboundedReceiver<Signal>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, fail: true }, rx)
    }

    fn record(&self, signal: Signal) -> Result<(), NotificationError> {
        let _ = self.tx.send(signal);
        if self.fail {
            return Err(NotificationError::Status {
                url: "http://fake/".to_string(),
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn notify_ready(&self) -> Result<(), NotificationError> {
        self.record(Signal::Ready)
    }

    async fn notify_game_changed(&self, game: &Game) -> Result<(), NotificationError> {
        self.record(Signal::GameChanged(game.name().to_string()))
    }
}
