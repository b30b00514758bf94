//! Command-line configuration for the `cold-wallet` binary.

use crate::account::Coin;
use clap::{Parser, ValueEnum};
use std::fmt;
use std::path::PathBuf;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoinArg {
    /// BIP32 account with a legacy P2PKH address
    Bitcoin,
    /// Raw secp256k1 keypair with a Keccak-256 address
    Ethereum,
}

impl From<CoinArg> for Coin {
    fn from(arg: CoinArg) -> Self {
        match arg {
            CoinArg::Bitcoin => Coin::Bitcoin,
            CoinArg::Ethereum => Coin::Ethereum,
        }
    }
}

/// Generate cryptocurrency credentials for offline storage
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Account type to generate
    #[arg(short, long, value_enum, default_value_t = CoinArg::Bitcoin)]
    pub coin: CoinArg,

    /// Use Bitcoin testnet encodings
    #[arg(short, long)]
    pub testnet: bool,

    /// Extra entropy mixed into the Bitcoin master seed
    #[arg(short, long)]
    pub entropy: Option<String>,

    /// Render the address as a QR code
    #[arg(long)]
    pub qr: bool,

    /// Print the account as JSON instead of text
    #[arg(long)]
    pub json: bool,

    /// Encrypt the private key under the passphrase
    #[arg(long)]
    pub encrypt: bool,

    /// Passphrase for --encrypt
    #[arg(short, long, env = "COLD_WALLET_PASSPHRASE", hide_env_values = true)]
    pub passphrase: Option<String>,

    /// Save the encrypted private key to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output.is_some() && !self.encrypt {
            return Err(ConfigError::OutputWithoutEncrypt);
        }
        if self.encrypt {
            match self.passphrase.as_deref() {
                None => return Err(ConfigError::MissingPassphrase),
                Some("") => return Err(ConfigError::EmptyPassphrase),
                Some(_) => {}
            }
        }
        Ok(())
    }

    pub fn extra_entropy(&self) -> Option<&[u8]> {
        self.entropy.as_deref().map(str::as_bytes)
    }

    /// Filter directive used when `RUST_LOG` is unset.
    pub fn default_log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "warn"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    MissingPassphrase,
    EmptyPassphrase,
    OutputWithoutEncrypt,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::MissingPassphrase => {
                write!(f, "--encrypt needs --passphrase or COLD_WALLET_PASSPHRASE")
            }
            ConfigError::EmptyPassphrase => write!(f, "Passphrase cannot be empty"),
            ConfigError::OutputWithoutEncrypt => write!(f, "--output is only valid with --encrypt"),
        }
    }
}

impl std::error::Error for ConfigError {}
