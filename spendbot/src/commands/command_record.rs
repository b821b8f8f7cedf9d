use crate::{commands::command_trait::CommandReplyTarget, engine::RecordError, parser::Amount};

pub const TOTAL_TOO_LARGE_REPLY: &str = "❌ That would make this month's total too large";

/// A bare amount sent as a message.
///
/// Not a `CommandTrait`: it has no name to type, any message that parses as
/// an amount is a record.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandRecord {
    pub amount: Amount,
}

impl CommandRecord {
    pub async fn run(&self, target: &CommandReplyTarget<'_>) -> String {
        match target.engine.record_amount(&target.key, self.amount).await {
            Ok(total) => format!(
                "💰 Spent in {}: total {}",
                target.month_name(),
                target.money(total)
            ),
            Err(RecordError::TotalTooLarge(e)) => {
                log::warn!("Amount {} for {} refused: {}", self.amount, target.key, e);
                TOTAL_TOO_LARGE_REPLY.to_string()
            }
            Err(RecordError::Storage(e)) => {
                log::error!("Amount {} for {} was not saved: {}", self.amount, target.key, e);
                super::SAVE_FAILED_REPLY.to_string()
            }
        }
    }
}

impl From<CommandRecord> for crate::commands::Command {
    fn from(cmd: CommandRecord) -> Self {
        crate::commands::Command::Record(cmd)
    }
}
