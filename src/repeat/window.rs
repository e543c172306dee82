//! Per-group sliding window.

use super::types::LastRepeat;
use crate::config::RepeatConfig;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::VecDeque;
use tracing::debug;

/// A message retained in the window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowEntry {
    /// Arrival time.
    pub timestamp: DateTime<Utc>,
    /// Plain text content.
    pub content: String,
}

/// Recent history and cooldown record for one group.
#[derive(Debug, Clone, Default)]
pub struct GroupState {
    recent: VecDeque<WindowEntry>,
    last_repeat: Option<LastRepeat>,
    last_seen: Option<DateTime<Utc>>,
}

impl GroupState {
    /// Create an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `content` and decide whether it should be echoed.
    ///
    /// The caller is responsible for filtering empty or oversized content.
    /// Returns `true` when an echo was triggered, in which case the cooldown
    /// record has already been updated.
    pub fn observe(&mut self, content: &str, now: DateTime<Utc>, config: &RepeatConfig) -> bool {
        self.last_seen = Some(now);
        self.recent.push_back(WindowEntry {
            timestamp: now,
            content: content.to_string(),
        });

        self.prune_expired(now, minutes(config.time_window_minutes));
        self.truncate(config.message_window_size.max(1));

        let occurrences = self.occurrences(content);
        let threshold = config.required_same_count.max(1);
        if occurrences < threshold {
            return false;
        }

        if self.in_cooldown(content, now, minutes(config.repeat_cooldown_minutes)) {
            debug!(
                occurrences,
                threshold, "repeat_window: threshold reached but content is cooling down"
            );
            return false;
        }

        self.last_repeat = Some(LastRepeat {
            content: content.to_string(),
            timestamp: now,
        });
        true
    }

    /// Number of messages currently retained.
    #[must_use]
    pub fn len(&self) -> usize {
        self.recent.len()
    }

    /// Whether the window holds no messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }

    /// Retained messages, oldest first.
    pub fn messages(&self) -> impl Iterator<Item = &WindowEntry> {
        self.recent.iter()
    }

    /// Last echo emitted for this group.
    #[must_use]
    pub const fn last_repeat(&self) -> Option<&LastRepeat> {
        self.last_repeat.as_ref()
    }

    /// Time of the latest observed message.
    #[must_use]
    pub const fn last_seen(&self) -> Option<DateTime<Utc>> {
        self.last_seen
    }

    /// Count retained entries whose content equals `content` exactly.
    #[must_use]
    pub fn occurrences(&self, content: &str) -> usize {
        self.recent
            .iter()
            .filter(|entry| entry.content == content)
            .count()
    }

    // Entries arrive in timestamp order, so scanning from the newest end can
    // stop at the first stale one.
    fn prune_expired(&mut self, now: DateTime<Utc>, window: TimeDelta) {
        let fresh = self
            .recent
            .iter()
            .rev()
            .take_while(|entry| now - entry.timestamp <= window)
            .count();
        let stale = self.recent.len() - fresh;
        self.recent.drain(..stale);
    }

    fn truncate(&mut self, max_len: usize) {
        if self.recent.len() > max_len {
            let excess = self.recent.len() - max_len;
            self.recent.drain(..excess);
        }
    }

    fn in_cooldown(&self, content: &str, now: DateTime<Utc>, cooldown: TimeDelta) -> bool {
        match &self.last_repeat {
            Some(last) if last.content == content => now - last.timestamp <= cooldown,
            _ => false,
        }
    }
}

fn minutes(value: u64) -> TimeDelta {
    i64::try_from(value)
        .ok()
        .and_then(TimeDelta::try_minutes)
        .unwrap_or(TimeDelta::MAX)
}
