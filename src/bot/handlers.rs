use crate::repeat::{IncomingMessage, RepeatService};
use chrono::Utc;
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use tracing::debug;

/// Convert a Telegram message into the detector's input.
///
/// Groups and supergroups are group conversations; the chat id becomes the
/// group id. Media without text yields no content.
#[must_use]
pub fn incoming_from_message(msg: &Message) -> IncomingMessage {
    let is_group = msg.chat.is_group() || msg.chat.is_supergroup();
    incoming_from_parts(msg.chat.id, is_group, msg.text())
}

fn incoming_from_parts(chat_id: ChatId, is_group: bool, text: Option<&str>) -> IncomingMessage {
    IncomingMessage {
        group_id: Some(chat_id.to_string()),
        is_group,
        plain_text: text.map(str::to_string),
    }
}

/// Build the update handler: every message goes through the repeat service.
#[must_use]
pub fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    Update::filter_message().endpoint(handle_message)
}

async fn handle_message(
    msg: Message,
    service: Arc<RepeatService>,
) -> Result<(), teloxide::RequestError> {
    let incoming = incoming_from_message(&msg);
    let action = service.handle_message(&incoming, Utc::now()).await;
    debug!(
        chat_id = %msg.chat.id,
        echoed = action.is_echo(),
        "handler: message processed"
    );
    respond(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_text_keeps_chat_id_and_text() {
        let incoming = incoming_from_parts(ChatId(-100_123), true, Some("hi there"));
        assert_eq!(incoming.group_id.as_deref(), Some("-100123"));
        assert!(incoming.is_group);
        assert_eq!(incoming.plain_text.as_deref(), Some("hi there"));
    }

    #[test]
    fn media_message_has_no_text() {
        let incoming = incoming_from_parts(ChatId(-5), true, None);
        assert!(incoming.plain_text.is_none());
    }

    #[test]
    fn private_chat_is_not_group() {
        let incoming = incoming_from_parts(ChatId(42), false, Some("A"));
        assert!(!incoming.is_group);
    }
}
