use crate::commands::{
    command_trait::{CommandReplyTarget, CommandTrait},
    command_undo::CommandUndo,
};

#[derive(Default, Debug, Clone, PartialEq)]
pub struct CommandStart;

#[async_trait::async_trait]
impl CommandTrait for CommandStart {
    const NAME: &'static str = "start";
    const DESCRIPTION: &'static str = "start the bot";

    async fn run(&self, _target: &CommandReplyTarget<'_>) -> String {
        format!(
            "👋 Hi! Send me the amount of a purchase and I'll count how much was spent this month.\n\
             Made a mistake? {} removes the last amount.",
            CommandUndo::to_command_string()
        )
    }
}

impl From<CommandStart> for crate::commands::Command {
    fn from(cmd: CommandStart) -> Self {
        crate::commands::Command::Start(cmd)
    }
}
