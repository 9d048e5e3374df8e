//! Session lifecycle events and the forwarder from the obws event stream

use anyhow::{Context, Result};
use futures::{Stream, StreamExt};
use obws::events::Event;
use obws::Client;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::debug;

/// Lifecycle events the session dispatcher reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Client finished the Hello/Identify handshake
    Identified,
    /// OBS is shutting down
    ExitStarted,
    /// Recording output changed state
    RecordStateChanged {
        output_active: bool,
        output_path: Option<PathBuf>,
    },
    /// Replay buffer written to disk
    ReplayBufferSaved { path: PathBuf },
    /// An input was created (by us or anyone else)
    InputCreated { name: String, kind: String },
}

impl SessionEvent {
    /// Map a raw obws event, dropping the ones the dispatcher ignores
    pub fn from_obs(event: Event) -> Option<Self> {
        match event {
            Event::ExitStarted => Some(SessionEvent::ExitStarted),
            Event::RecordStateChanged { active, path, .. } => {
                Some(SessionEvent::RecordStateChanged {
                    output_active: active,
                    output_path: path.map(PathBuf::from),
                })
            }
            Event::ReplayBufferSaved { path } => Some(SessionEvent::ReplayBufferSaved {
                path: PathBuf::from(path),
            }),
            Event::InputCreated { id, kind, .. } => Some(SessionEvent::InputCreated {
                name: id.name,
                kind,
            }),
            _ => None,
        }
    }
}

/// Subscribe to OBS events and forward session events to a channel.
///
/// `Identified` is sent first since the client is already identified by the
/// time it can subscribe. The channel closes when OBS disconnects.
pub fn subscribe_session_events(client: &Client) -> Result<mpsc::UnboundedReceiver<SessionEvent>> {
    let raw_events = client
        .events()
        .context("Failed to subscribe to OBS events")?;

    let (tx, rx) = mpsc::unbounded_channel();
    let _ = tx.send(SessionEvent::Identified);
    tokio::spawn(forward_events(raw_events, tx));

    Ok(rx)
}

async fn forward_events<S>(raw_events: S, tx: mpsc::UnboundedSender<SessionEvent>)
where
    S: Stream<Item = Event>,
{
    tokio::pin!(raw_events);

    while let Some(event) = raw_events.next().await {
        let Some(event) = SessionEvent::from_obs(event) else {
            continue;
        };

        if tx.send(event).is_err() {
            // Receiver dropped
            break;
        }
    }

    debug!("OBS event stream ended");
}
