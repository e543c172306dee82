//! Repeat detection for group conversations.
//!
//! Tracks a sliding window of recent messages per group and echoes content
//! once it has been repeated often enough, subject to a per-content cooldown.

mod detector;
mod service;
mod types;
mod window;

pub use detector::RepeatDetector;
pub use service::{EchoSender, RepeatService, RepeatStats};
pub use types::{IncomingMessage, LastRepeat, RepeatAction, SendError};
pub use window::{GroupState, WindowEntry};
