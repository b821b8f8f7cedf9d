use crate::commands::command_trait::{CommandReplyTarget, CommandTrait};

#[derive(Default, Debug, Clone, PartialEq)]
pub struct CommandTotal;

#[async_trait::async_trait]
impl CommandTrait for CommandTotal {
    const NAME: &'static str = "total";
    const DESCRIPTION: &'static str = "show the total of this month";

    async fn run(&self, target: &CommandReplyTarget<'_>) -> String {
        let bucket = target.engine.bucket(&target.key).await;
        let count = bucket.entries().len();
        format!(
            "📊 {}: {} {}, total {}",
            target.month_name(),
            count,
            if count == 1 { "purchase" } else { "purchases" },
            target.money(bucket.total())
        )
    }
}

impl From<CommandTotal> for crate::commands::Command {
    fn from(cmd: CommandTotal) -> Self {
        crate::commands::Command::Total(cmd)
    }
}
