use std::path::PathBuf;

use clap::Parser;

pub const DEFAULT_LEDGER_FILE: &str = "expenses.yaml";

pub const WRITE_TIMEOUT_SECONDS: u64 = 5; // Give up on a ledger rewrite after N seconds

/// A Telegram bot that sums up purchases per chat and month
#[derive(Parser, Debug)]
#[command(name = "spendbot")]
#[command(about = "A Telegram bot that keeps a monthly spending total", long_about = None)]
pub struct Args {
    #[arg(
        long,
        default_value = "TOKEN",
        help = "Environment variable name containing the bot token"
    )]
    pub bot_token_env: String,

    #[arg(
        long,
        num_args = 0..=1,
        value_name = "PATH",
        help = "Keep the ledger in a YAML file (defaults to expenses.yaml when no path is given)"
    )]
    pub persistent_storage: Option<Option<PathBuf>>,

    #[arg(long, default_value = "€", help = "Currency suffix shown after totals")]
    pub currency: String,
}

impl Args {
    /// Get the bot token from the configured environment variable
    pub fn get_token(&self) -> Result<String, std::env::VarError> {
        std::env::var(&self.bot_token_env)
    }

    /// Resolve the ledger file path, if persistence was requested
    pub fn ledger_file(&self) -> Option<PathBuf> {
        self.persistent_storage
            .as_ref()
            .map(|path| path.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_LEDGER_FILE)))
    }
}
