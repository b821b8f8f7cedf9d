use std::sync::Arc;

use chrono::Local;
use teloxide::{prelude::*, types::BotCommand};

use crate::commands::{CommandRouter, command_help::command_descriptions};

/// Handle a text message: record an amount or run a command, then reply
pub async fn handle_text_message(
    bot: Bot,
    msg: Message,
    router: Arc<CommandRouter>,
) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let now = Local::now();
    if let Some(reply) = router.handle_message(msg.chat.id, text, &now).await {
        if let Err(e) = bot.send_message(msg.chat.id, reply).await {
            log::error!("Failed to send reply to chat {}: {}", msg.chat.id, e);
            return Err(e);
        }
    }

    Ok(())
}

/// Register the command menu shown by Telegram clients
pub async fn register_commands(bot: &Bot) {
    let commands: Vec<BotCommand> = command_descriptions()
        .into_iter()
        .map(|(name, description)| BotCommand::new(name, description))
        .collect();

    if let Err(e) = bot.set_my_commands(commands).await {
        log::warn!("Failed to register bot commands: {}", e);
    }
}
