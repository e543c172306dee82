use super::handlers::setup_handler;
use super::sender::TelegramSender;
use crate::config::{RepeatConfig, Settings};
use crate::repeat::RepeatService;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::info;

/// Run the Telegram transport runtime.
pub async fn run_bot(settings: Arc<Settings>, config: Arc<RepeatConfig>) {
    let bot = Bot::new(settings.telegram_token.clone());
    let service = init_repeat_service(bot.clone(), config);
    let handler = setup_handler();

    info!("Bot is running...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![service])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

fn init_repeat_service(bot: Bot, config: Arc<RepeatConfig>) -> Arc<RepeatService> {
    info!(
        enabled = config.enabled,
        time_window_minutes = config.time_window_minutes,
        message_window_size = config.message_window_size,
        required_same_count = config.required_same_count,
        max_message_length = config.max_message_length,
        repeat_cooldown_minutes = config.repeat_cooldown_minutes,
        group_idle_minutes = config.group_idle_minutes,
        "Initializing RepeatService"
    );

    Arc::new(RepeatService::new(
        config,
        Arc::new(TelegramSender::new(bot)),
    ))
}
