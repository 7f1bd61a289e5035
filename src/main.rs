use clap::Parser;
use std::sync::Arc;
use textbook_rsa::cli::{self, ChatMode, Cli, Command};
use textbook_rsa::{client, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .init();

    match cli.command {
        Command::Create {
            private_key,
            public_key,
            range,
            exponents,
            force,
        } => cli::create(&private_key, &public_key, &range, exponents, force)?,
        Command::Encrypt(target) | Command::Decrypt(target) => cli::transform(&target)?,
        Command::Chat(ChatMode::Server { addr, exponents }) => {
            let keys = Arc::new(cli::chat_keys(exponents)?);
            server::run_server(&addr, keys)
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
        }
        Command::Chat(ChatMode::Client { addr, exponents }) => {
            let keys = Arc::new(cli::chat_keys(exponents)?);
            client::run_client(&addr, keys)
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
        }
    }

    Ok(())
}
