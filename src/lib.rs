//! # cold_wallet
//!
//! Generate Bitcoin and Ethereum account credentials for offline storage.
//!
//! - `account`: the `Account` contract and its Bitcoin / Ethereum variants
//! - `derivation`, `keys`, `network`: BIP32 derivation and key encodings
//! - `storage`: passphrase encryption of exported private keys
//! - `qr`: terminal QR rendering

pub mod account;
pub mod config;
pub mod derivation;
pub mod entropy;
pub mod error;
pub mod keys;
pub mod network;
pub mod qr;
pub mod storage;

pub use account::{generate_account, Account, AccountRecord, BitcoinAccount, Coin, EthereumAccount};
pub use config::{Config, ConfigError};
pub use error::AccountError;
pub use network::Network;
pub use storage::{EncryptedKey, StorageError};
