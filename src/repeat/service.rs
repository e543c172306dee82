//! Concurrent repeat detection front door.
//!
//! Keeps one lock per group so messages from the same group are processed
//! one at a time while different groups never contend, and hands triggered
//! echoes to an [`EchoSender`].

use super::types::{IncomingMessage, RepeatAction, SendError};
use super::window::GroupState;
use crate::config::{RepeatConfig, MAX_GROUP_IDLE_MINUTES};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Outbound transport used to deliver echoes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EchoSender: Send + Sync {
    /// Send `text` to the conversation identified by `group_id`.
    async fn send_text(&self, group_id: &str, text: &str) -> Result<(), SendError>;
}

/// Counters exposed for monitoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepeatStats {
    /// Echoes triggered.
    pub echoes: u64,
    /// Echoes whose delivery failed.
    pub send_failures: u64,
    /// Messages skipped before reaching a group window.
    pub ignored: u64,
}

/// Thread-safe repeat detector with echo delivery.
pub struct RepeatService {
    config: Arc<RepeatConfig>,
    sender: Arc<dyn EchoSender>,
    groups: Cache<String, Arc<Mutex<GroupState>>>,
    echoes: AtomicU64,
    send_failures: AtomicU64,
    ignored: AtomicU64,
}

impl RepeatService {
    /// Create a service; groups idle longer than `group_idle_minutes` are
    /// evicted when that option is non-zero.
    #[must_use]
    pub fn new(config: Arc<RepeatConfig>, sender: Arc<dyn EchoSender>) -> Self {
        let idle = config.group_idle_timeout();
        Self::with_idle_timeout(config, sender, idle)
    }

    /// Create a service with an explicit idle eviction timeout.
    ///
    /// Timeouts above [`MAX_GROUP_IDLE_MINUTES`] disable eviction.
    #[must_use]
    pub fn with_idle_timeout(
        config: Arc<RepeatConfig>,
        sender: Arc<dyn EchoSender>,
        idle: Option<Duration>,
    ) -> Self {
        let max_idle = Duration::from_secs(MAX_GROUP_IDLE_MINUTES * 60);
        let mut builder = Cache::builder();
        if let Some(idle) = idle.filter(|idle| *idle <= max_idle) {
            builder = builder.time_to_idle(idle);
        }

        Self {
            config,
            sender,
            groups: builder.build(),
            echoes: AtomicU64::new(0),
            send_failures: AtomicU64::new(0),
            ignored: AtomicU64::new(0),
        }
    }

    /// Update the window for `msg` and decide whether to echo it.
    ///
    /// Does not deliver anything; see [`Self::handle_message`].
    pub async fn evaluate(&self, msg: &IncomingMessage, now: DateTime<Utc>) -> RepeatAction {
        let Some((group_id, text)) = self.accept(msg) else {
            self.ignored.fetch_add(1, Ordering::Relaxed);
            return RepeatAction::None;
        };

        let state = self
            .groups
            .get_with(group_id.to_string(), async {
                Arc::new(Mutex::new(GroupState::new()))
            })
            .await;

        let triggered = state.lock().await.observe(text, now, &self.config);
        if !triggered {
            return RepeatAction::None;
        }

        self.echoes.fetch_add(1, Ordering::Relaxed);
        info!(group_id, "repeat_service: echo triggered");
        RepeatAction::Echo {
            group_id: group_id.to_string(),
            content: text.to_string(),
        }
    }

    /// Evaluate `msg` and deliver the echo if one was triggered.
    ///
    /// The window and cooldown are committed before sending, so a failed
    /// send is logged and counted but never undone.
    pub async fn handle_message(&self, msg: &IncomingMessage, now: DateTime<Utc>) -> RepeatAction {
        let action = self.evaluate(msg, now).await;
        if let RepeatAction::Echo { group_id, content } = &action {
            if let Err(e) = self.sender.send_text(group_id, content).await {
                self.send_failures.fetch_add(1, Ordering::Relaxed);
                warn!(group_id = %group_id, error = %e, "repeat_service: failed to send echo");
            }
        }
        action
    }

    /// Snapshot of the service counters.
    #[must_use]
    pub fn stats(&self) -> RepeatStats {
        RepeatStats {
            echoes: self.echoes.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
        }
    }

    /// Approximate number of tracked groups.
    ///
    /// Eviction is applied lazily; call [`Self::sync`] first for an exact count.
    #[must_use]
    pub fn group_count(&self) -> u64 {
        self.groups.entry_count()
    }

    /// Copy of the state tracked for `group_id`.
    pub async fn group_snapshot(&self, group_id: &str) -> Option<GroupState> {
        let state = self.groups.get(group_id).await?;
        let snapshot = state.lock().await.clone();
        Some(snapshot)
    }

    /// Run pending cache maintenance (evictions, counters).
    pub async fn sync(&self) {
        self.groups.run_pending_tasks().await;
    }

    /// Forget all tracked groups.
    pub fn reset(&self) {
        self.groups.invalidate_all();
    }

    /// Active options.
    #[must_use]
    pub fn config(&self) -> &RepeatConfig {
        &self.config
    }

    fn accept<'a>(&self, msg: &'a IncomingMessage) -> Option<(&'a str, &'a str)> {
        if !msg.is_group {
            return None;
        }
        let group_id = msg.group_id.as_deref()?;
        let text = msg.plain_text.as_deref()?;
        self.config
            .accepts(group_id, text)
            .then_some((group_id, text))
    }
}
