/// Message extraction and the update handler tree
pub mod handlers;
/// Telegram runtime entrypoint
pub mod runner;
/// Echo delivery with automatic retry
pub mod sender;

pub use handlers::{incoming_from_message, setup_handler};
pub use runner::run_bot;
pub use sender::TelegramSender;
