//! cold-wallet CLI
//!
//! Usage:
//!   cold-wallet                                   # Bitcoin mainnet account
//!   cold-wallet --coin ethereum --qr              # Ethereum account + address QR
//!   cold-wallet -t --encrypt -p secret -o key.enc # testnet, save encrypted WIF

use std::error::Error;
use std::process;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cold_wallet::{generate_account, qr, Config};

fn main() {
    let config = Config::parse();
    init_logging(&config);

    if let Err(e) = run(&config) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(config: &Config) -> Result<(), Box<dyn Error>> {
    config.validate()?;

    info!(coin = ?config.coin, testnet = config.testnet, "generating account");
    let account = generate_account(config.coin.into(), config.extra_entropy(), config.testnet)?;

    if config.json {
        println!("{}", serde_json::to_string_pretty(&account.record()?)?);
    } else {
        println!("{}", account.format_text()?);
    }

    if config.qr {
        println!();
        qr::print_qr("Address", account.address()?)?;
    }

    if config.encrypt {
        let passphrase = config.passphrase.as_deref().unwrap_or_default();
        let sealed = account.encrypted_private_key(passphrase)?;
        match &config.output {
            Some(path) => {
                sealed.save(path)?;
                info!(path = %path.display(), "encrypted private key saved");
                println!("\nEncrypted private key saved to {}", path.display());
            }
            None => println!("\nEncrypted private key: {}", sealed),
        }
    }

    Ok(())
}
