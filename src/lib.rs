#![deny(missing_docs)]
//! Repeat echo bot library.
//!
//! Detects content repeated in group chats and echoes it back once.

/// Telegram transport adapter.
pub mod bot;
/// Configuration management.
pub mod config;
/// Repeat detection core and service.
pub mod repeat;
