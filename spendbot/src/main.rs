mod commands;
mod config;
mod engine;
mod handlers;
mod parser;
mod storages;

use std::sync::Arc;

use clap::Parser;
use config::Args;
use commands::CommandRouter;
use engine::LedgerEngine;
use handlers::{handle_text_message, register_commands};
use storages::{LedgerStorage, LedgerStorageTrait, PersistentLedgerStorage};
use teloxide::prelude::*;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    pretty_env_logger::init();
    log::info!("Starting monthly spending bot...");

    let token = match args.get_token() {
        Ok(token) => token,
        Err(e) => {
            log::error!(
                "Can't read bot token from environment variable {}: {}",
                args.bot_token_env,
                e
            );
            return;
        }
    };
    let bot = Bot::new(token);

    // Initialize ledger storage based on CLI arguments
    let storage: Arc<dyn LedgerStorageTrait> = if let Some(ledger_file) = args.ledger_file() {
        log::info!("Using persistent ledger file: {:?}", ledger_file);
        Arc::new(PersistentLedgerStorage::load(ledger_file).await)
    } else {
        log::info!("Using in-memory ledger");
        Arc::new(LedgerStorage::new())
    };

    let router = Arc::new(CommandRouter::new(LedgerEngine::new(storage), args.currency));

    register_commands(&bot).await;

    let handler = dptree::entry().branch(
        Update::filter_message().branch(
            dptree::filter(|msg: Message| msg.text().is_some()).endpoint(handle_text_message),
        ),
    );

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![router])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}
