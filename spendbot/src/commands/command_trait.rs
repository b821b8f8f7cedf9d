use crate::{engine::LedgerEngine, parser::Amount, storages::LedgerKey};

/// Everything a command needs to act on one chat's current month
pub struct CommandReplyTarget<'a> {
    pub engine: &'a LedgerEngine,
    pub key: LedgerKey,
    pub currency: &'a str,
}

impl CommandReplyTarget<'_> {
    /// Amount with the currency suffix, e.g. `15.50 €`
    pub fn money(&self, amount: Amount) -> String {
        if self.currency.is_empty() {
            amount.to_string()
        } else {
            format!("{} {}", amount, self.currency)
        }
    }

    pub fn month_name(&self) -> String {
        self.key.month.display_name()
    }
}

#[async_trait::async_trait]
pub trait CommandTrait: Send + Sync {
    const NAME: &'static str;
    const ALIASES: &'static [&'static str] = &[];
    const DESCRIPTION: &'static str;

    /// Produce the reply text, mutating the ledger if the command does so
    async fn run(&self, target: &CommandReplyTarget<'_>) -> String;

    fn to_command_string() -> String {
        format!("/{}", Self::NAME)
    }

    /// Whole-message match on the command or one of its aliases, case-sensitive
    fn matches(text: &str) -> bool {
        text.strip_prefix('/')
            .is_some_and(|name| name == Self::NAME || Self::ALIASES.contains(&name))
    }
}
