//! Single-owner repeat detector.

use super::types::RepeatAction;
use super::window::GroupState;
use crate::config::RepeatConfig;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use tracing::info;

/// Tracks recent messages per group and decides when to echo.
///
/// Callers must serialise access; use [`super::RepeatService`] when messages
/// arrive concurrently.
pub struct RepeatDetector {
    config: RepeatConfig,
    groups: HashMap<String, GroupState>,
}

impl RepeatDetector {
    /// Create a detector with the given options.
    #[must_use]
    pub fn new(config: RepeatConfig) -> Self {
        Self {
            config,
            groups: HashMap::new(),
        }
    }

    /// Ingest one group message and return the resulting action.
    ///
    /// Empty group ids, empty content and content longer than
    /// `max_message_length` characters are ignored without touching state.
    pub fn ingest(&mut self, group_id: &str, content: &str, now: DateTime<Utc>) -> RepeatAction {
        if !self.config.accepts(group_id, content) {
            return RepeatAction::None;
        }

        let state = self.groups.entry(group_id.to_string()).or_default();
        if !state.observe(content, now, &self.config) {
            return RepeatAction::None;
        }

        info!(group_id, "repeat_detector: echo triggered");
        RepeatAction::Echo {
            group_id: group_id.to_string(),
            content: content.to_string(),
        }
    }

    /// State tracked for `group_id`, if any message was accepted from it.
    #[must_use]
    pub fn group(&self, group_id: &str) -> Option<&GroupState> {
        self.groups.get(group_id)
    }

    /// Number of groups with state.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Drop groups that have not seen a message for longer than `idle`.
    ///
    /// Returns the number of evicted groups.
    pub fn evict_idle(&mut self, now: DateTime<Utc>, idle: TimeDelta) -> usize {
        let before = self.groups.len();
        self.groups.retain(|_, state| {
            state
                .last_seen()
                .is_some_and(|seen| now - seen <= idle)
        });
        before - self.groups.len()
    }

    /// Forget all tracked groups.
    pub fn reset(&mut self) {
        self.groups.clear();
    }

    /// Active options.
    #[must_use]
    pub const fn config(&self) -> &RepeatConfig {
        &self.config
    }
}
