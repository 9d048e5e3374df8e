//! Game identity and the shared selected-game handle

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::provision::CaptureKind;

/// A game, identified only by its display name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Game(String);

impl Game {
    /// Returns `None` for empty or whitespace-only names
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            None
        } else {
            Some(Self(name))
        }
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// The scene is named after the game
    pub fn scene_name(&self) -> &str {
        &self.0
    }

    /// Name of the capture source of `kind` owned by this game's scene
    pub fn source_name(&self, kind: CaptureKind) -> String {
        format!("{} {} Capture", self.0, kind.label())
    }
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Last-write-wins handle to the currently selected game.
///
/// Cloned into whichever component needs it; there is no per-request isolation,
/// so concurrent requests for different games race on this value.
#[derive(Debug, Clone, Default)]
pub struct SelectedGame {
    inner: Arc<RwLock<Option<Game>>>,
}

impl SelectedGame {
    pub fn new(initial: Option<Game>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial)),
        }
    }

    pub fn get(&self) -> Option<Game> {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Replace the selected game, returning true if it changed
    pub fn set(&self, game: Game) -> bool {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if guard.as_ref() == Some(&game) {
            return false;
        }
        *guard = Some(game);
        true
    }
}
