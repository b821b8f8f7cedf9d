use crate::{
    commands::command_trait::{CommandReplyTarget, CommandTrait},
    engine::UndoError,
};

#[derive(Default, Debug, Clone, PartialEq)]
pub struct CommandUndo;

#[async_trait::async_trait]
impl CommandTrait for CommandUndo {
    const NAME: &'static str = "undo";
    const ALIASES: &'static [&'static str] = &["отмена"];
    const DESCRIPTION: &'static str = "remove the last amount of this month";

    async fn run(&self, target: &CommandReplyTarget<'_>) -> String {
        match target.engine.undo_last(&target.key).await {
            Ok((removed, total)) => format!(
                "↩️ Removed {}, total {} ({})",
                removed,
                target.money(total),
                target.month_name()
            ),
            Err(UndoError::NothingToUndo) => {
                format!("🤷 Nothing to undo for {}", target.month_name())
            }
            Err(UndoError::Storage(e)) => {
                log::error!("Undo in {} was not saved: {}", target.key, e);
                super::SAVE_FAILED_REPLY.to_string()
            }
        }
    }
}

impl From<CommandUndo> for crate::commands::Command {
    fn from(cmd: CommandUndo) -> Self {
        crate::commands::Command::Undo(cmd)
    }
}
