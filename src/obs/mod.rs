//! OBS WebSocket adapter: scene graph calls and session events

mod client;
mod events;

pub use client::*;
pub use events::*;
