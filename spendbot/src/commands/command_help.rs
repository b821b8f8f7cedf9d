use crate::commands::{
    command_start::CommandStart,
    command_total::CommandTotal,
    command_trait::{CommandReplyTarget, CommandTrait},
    command_undo::CommandUndo,
};

#[derive(Default, Debug, Clone, PartialEq)]
pub struct CommandHelp;

/// One line per command, used both here and for the bot menu
pub fn command_descriptions() -> Vec<(&'static str, &'static str)> {
    vec![
        (CommandStart::NAME, CommandStart::DESCRIPTION),
        (CommandUndo::NAME, CommandUndo::DESCRIPTION),
        (CommandTotal::NAME, CommandTotal::DESCRIPTION),
        (CommandHelp::NAME, CommandHelp::DESCRIPTION),
    ]
}

#[async_trait::async_trait]
impl CommandTrait for CommandHelp {
    const NAME: &'static str = "help";
    const DESCRIPTION: &'static str = "display this help";

    async fn run(&self, _target: &CommandReplyTarget<'_>) -> String {
        let mut text = String::from("💡 Send a number like 12.5 or 12,5 to record a purchase.\n");
        for (name, description) in command_descriptions() {
            text.push_str(&format!("\n/{} - {}", name, description));
        }
        text
    }
}

impl From<CommandHelp> for crate::commands::Command {
    fn from(cmd: CommandHelp) -> Self {
        crate::commands::Command::Help(cmd)
    }
}
