//! Auxiliary helper process, streamed back to the presentation layer

mod bridge;

pub use bridge::HelperBridge;

use uuid::Uuid;

/// One relayed event from a helper process
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HelperEvent {
    /// A chunk of stdout, as read
    Output(String),
    /// A chunk of stderr, forwarded verbatim regardless of severity
    Error(String),
    /// Process exited; `None` when terminated by a signal
    Close(Option<i32>),
}

impl HelperEvent {
    /// Channel name the presentation layer listens on
    pub fn channel(&self) -> &'static str {
        match self {
            HelperEvent::Output(_) => "helper-output",
            HelperEvent::Error(_) => "helper-error",
            HelperEvent::Close(_) => "helper-close",
        }
    }
}

/// A helper event tagged with the session that produced it
#[derive(Debug, Clone)]
pub struct HelperMessage {
    pub session: Uuid,
    pub event: HelperEvent,
}
