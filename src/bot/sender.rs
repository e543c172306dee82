//! Echo delivery through the Telegram Bot API.
//!
//! Sends are retried on transient failures using exponential backoff with
//! jitter. The detector state is already committed when a send starts, so a
//! send that fails after all retries only gets logged.

use crate::repeat::{EchoSender, SendError};
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use teloxide::prelude::*;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;
use tracing::warn;

/// Initial delay before the first retry (ms).
pub const TELEGRAM_API_INITIAL_BACKOFF_MS: u64 = 500;
/// Upper bound for a single retry delay (ms).
pub const TELEGRAM_API_MAX_BACKOFF_MS: u64 = 4000;
/// Maximum number of retries after the first attempt.
pub const TELEGRAM_API_MAX_RETRIES: usize = 3;

/// [`EchoSender`] backed by a teloxide [`Bot`].
#[derive(Clone)]
pub struct TelegramSender {
    bot: Bot,
}

impl TelegramSender {
    /// Wrap a bot handle.
    #[must_use]
    pub const fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl EchoSender for TelegramSender {
    async fn send_text(&self, group_id: &str, text: &str) -> Result<(), SendError> {
        let chat_id = parse_chat_id(group_id)?;
        retry_telegram_operation(|| async {
            self.bot
                .send_message(chat_id, text.to_string())
                .await
                .map(|_| ())
                .map_err(|e| anyhow::anyhow!("Telegram send error: {e}"))
        })
        .await
        .map_err(|e| SendError::Transport(e.to_string()))
    }
}

/// Map a group id produced by [`super::incoming_from_message`] back to a chat.
///
/// # Errors
///
/// Returns [`SendError::InvalidGroup`] if `group_id` is not a Telegram chat id.
pub fn parse_chat_id(group_id: &str) -> Result<ChatId, SendError> {
    group_id
        .parse::<i64>()
        .map(ChatId)
        .map_err(|_| SendError::InvalidGroup(group_id.to_string()))
}

/// Retry a Telegram API operation with exponential backoff.
///
/// # Errors
///
/// Returns the last error if every attempt fails.
pub async fn retry_telegram_operation<F, Fut, T>(operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let retry_strategy = ExponentialBackoff::from_millis(TELEGRAM_API_INITIAL_BACKOFF_MS)
        .max_delay(Duration::from_millis(TELEGRAM_API_MAX_BACKOFF_MS))
        .map(jitter)
        .take(TELEGRAM_API_MAX_RETRIES);

    Retry::spawn(retry_strategy, operation).await.map_err(|e| {
        warn!(
            attempts = TELEGRAM_API_MAX_RETRIES + 1,
            error = %e,
            "Telegram API operation failed"
        );
        e
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn parses_group_chat_ids() {
        assert!(matches!(
            parse_chat_id("-1001234567890"),
            Ok(ChatId(-1_001_234_567_890))
        ));
        assert!(matches!(
            parse_chat_id("not-a-chat"),
            Err(SendError::InvalidGroup(id)) if id == "not-a-chat"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success() {
        let attempts = AtomicUsize::new(0);
        let result = retry_telegram_operation(|| async {
            if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(anyhow::anyhow!("transient"))
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result.ok(), Some(7));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_retries() {
        let attempts = AtomicUsize::new(0);
        let result: Result<()> = retry_telegram_operation(|| async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(anyhow::anyhow!("down"))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), TELEGRAM_API_MAX_RETRIES + 1);
    }
}
