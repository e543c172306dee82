use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use repeat_echo::config::RepeatConfig;
use repeat_echo::repeat::{EchoSender, IncomingMessage, RepeatService, SendError};
use std::sync::{Arc, Mutex};

/// Sender that records every delivery and can be told to fail.
#[derive(Default)]
struct RecordingSender {
    sent: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingSender {
    fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl EchoSender for RecordingSender {
    async fn send_text(&self, group_id: &str, text: &str) -> Result<(), SendError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((group_id.to_string(), text.to_string()));
        }
        if self.fail {
            return Err(SendError::Transport("network down".to_string()));
        }
        Ok(())
    }
}

fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default() + TimeDelta::seconds(secs)
}

async fn feed(service: &RepeatService, group: &str, text: &str, times: &[i64]) -> usize {
    let msg = IncomingMessage::group_text(group, text);
    let mut echoes = 0;
    for &t in times {
        if service.handle_message(&msg, at(t)).await.is_echo() {
            echoes += 1;
        }
    }
    echoes
}

#[tokio::test]
async fn echo_cooldown_and_content_change() {
    let sender = Arc::new(RecordingSender::default());
    let service = RepeatService::new(Arc::new(RepeatConfig::default()), sender.clone());

    assert_eq!(feed(&service, "g", "A", &[0, 1, 2]).await, 1);
    assert_eq!(feed(&service, "g", "A", &[3, 4, 5]).await, 0);
    assert_eq!(feed(&service, "g", "B", &[6, 7, 8]).await, 1);
    assert_eq!(feed(&service, "g", "A", &[700, 701, 702]).await, 1);

    assert_eq!(
        sender.sent(),
        vec![
            ("g".to_string(), "A".to_string()),
            ("g".to_string(), "B".to_string()),
            ("g".to_string(), "A".to_string()),
        ]
    );
    assert_eq!(service.stats().echoes, 3);
}

#[tokio::test]
async fn groups_do_not_share_windows() {
    let sender = Arc::new(RecordingSender::default());
    let service = RepeatService::new(Arc::new(RepeatConfig::default()), sender.clone());

    assert_eq!(feed(&service, "g1", "A", &[0, 1]).await, 0);
    assert_eq!(feed(&service, "g2", "A", &[2]).await, 0);
    assert_eq!(feed(&service, "g1", "A", &[3]).await, 1);
    assert_eq!(feed(&service, "g2", "A", &[4, 5]).await, 1);

    let groups: Vec<String> = sender.sent().into_iter().map(|(g, _)| g).collect();
    assert_eq!(groups, vec!["g1".to_string(), "g2".to_string()]);
}

#[tokio::test]
async fn failed_send_still_starts_cooldown() {
    let sender = Arc::new(RecordingSender {
        fail: true,
        ..RecordingSender::default()
    });
    let service = RepeatService::new(Arc::new(RepeatConfig::default()), sender.clone());

    assert_eq!(feed(&service, "g", "A", &[0, 1, 2, 3, 4]).await, 1);
    assert_eq!(sender.sent().len(), 1);
    assert_eq!(service.stats().send_failures, 1);
}

#[tokio::test]
async fn message_count_window_limits_repeats() {
    let config = RepeatConfig {
        message_window_size: 3,
        ..RepeatConfig::default()
    };
    let sender = Arc::new(RecordingSender::default());
    let service = RepeatService::new(Arc::new(config), sender.clone());

    for (t, text) in ["A", "x", "A", "y", "A"].iter().enumerate() {
        let msg = IncomingMessage::group_text("g", *text);
        assert!(!service.handle_message(&msg, at(t as i64)).await.is_echo());
    }
    assert!(sender.sent().is_empty());
}
