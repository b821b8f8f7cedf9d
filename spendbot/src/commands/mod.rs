pub mod command_help;
pub mod command_record;
pub mod command_start;
pub mod command_total;
pub mod command_trait;
pub mod command_undo;

use chrono::{DateTime, TimeZone};
use teloxide::types::ChatId;

use crate::{
    commands::{
        command_help::CommandHelp,
        command_record::CommandRecord,
        command_start::CommandStart,
        command_total::CommandTotal,
        command_trait::{CommandReplyTarget, CommandTrait},
        command_undo::CommandUndo,
    },
    engine::{LedgerEngine, current_month_key},
    parser::parse_amount,
};

pub const SAVE_FAILED_REPLY: &str = "⚠️ Couldn't save that, please try again";
pub const NOT_A_NUMBER_REPLY: &str = "❌ Please send just a number, for example 12.5";

/// What a single message asks for, decided once per message
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start(CommandStart),
    Help(CommandHelp),
    Undo(CommandUndo),
    Total(CommandTotal),
    Record(CommandRecord),
    Unrecognized,
}

impl Command {
    /// Classify message text. Blank text is not a command at all.
    pub fn parse(text: &str) -> Option<Command> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let cmd = if CommandStart::matches(text) {
            CommandStart.into()
        } else if CommandUndo::matches(text) {
            CommandUndo.into()
        } else if CommandTotal::matches(text) {
            CommandTotal.into()
        } else if CommandHelp::matches(text) {
            CommandHelp.into()
        } else {
            match parse_amount(text) {
                Ok(amount) => CommandRecord { amount }.into(),
                Err(_) => Command::Unrecognized,
            }
        };
        Some(cmd)
    }

    fn kind(&self) -> &'static str {
        match self {
            Command::Start(_) => "start",
            Command::Help(_) => "help",
            Command::Undo(_) => "undo",
            Command::Total(_) => "total",
            Command::Record(_) => "record",
            Command::Unrecognized => "unrecognized",
        }
    }
}

/// Execute a single command and build its reply
pub async fn execute_command(target: &CommandReplyTarget<'_>, cmd: Command) -> String {
    match cmd {
        Command::Start(start) => start.run(target).await,
        Command::Help(help) => help.run(target).await,
        Command::Undo(undo) => undo.run(target).await,
        Command::Total(total) => total.run(target).await,
        Command::Record(record) => record.run(target).await,
        Command::Unrecognized => NOT_A_NUMBER_REPLY.to_string(),
    }
}

/// Entry point for inbound text: maps it to a command against the ledger
pub struct CommandRouter {
    engine: LedgerEngine,
    currency: String,
}

impl CommandRouter {
    pub fn new(engine: LedgerEngine, currency: impl Into<String>) -> Self {
        Self {
            engine,
            currency: currency.into(),
        }
    }

    /// Reply for one message, or `None` when the message is to be ignored
    pub async fn handle_message<Tz: TimeZone>(
        &self,
        chat_id: ChatId,
        text: &str,
        now: &DateTime<Tz>,
    ) -> Option<String> {
        let cmd = Command::parse(text)?;
        let target = CommandReplyTarget {
            engine: &self.engine,
            key: current_month_key(chat_id, now),
            currency: &self.currency,
        };
        log::info!("Chat {}: {} command for {}", chat_id, cmd.kind(), target.key.month);
        if cmd == Command::Unrecognized {
            log::warn!("Chat {}: not a number: {:?}", chat_id, text);
        }
        Some(execute_command(&target, cmd).await)
    }
}
