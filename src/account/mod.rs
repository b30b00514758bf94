//! Account abstraction shared by the Bitcoin and Ethereum variants.
//!
//! An account holds whichever key material it was built from and derives the
//! rest on first access. Derived values are cached and never recomputed.

mod bitcoin;
mod ethereum;

pub use bitcoin::BitcoinAccount;
pub use ethereum::EthereumAccount;

use serde::Serialize;
use std::cell::OnceCell;
use std::fmt;
use std::str::FromStr;

use crate::error::AccountError;
use crate::network::Network;
use crate::qr;
use crate::storage::{self, EncryptedKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Coin {
    Bitcoin,
    Ethereum,
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Coin::Bitcoin => write!(f, "bitcoin"),
            Coin::Ethereum => write!(f, "ethereum"),
        }
    }
}

impl FromStr for Coin {
    type Err = AccountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bitcoin" | "btc" => Ok(Coin::Bitcoin),
            "ethereum" | "eth" => Ok(Coin::Ethereum),
            other => Err(AccountError::Validation(format!("unknown coin '{}'", other))),
        }
    }
}

/// Serializable snapshot of an account's credentials.
#[derive(Debug, Clone, Serialize)]
pub struct AccountRecord {
    pub coin: Coin,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<Network>,
    pub public_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    pub address: String,
}

pub trait Account {
    fn coin(&self) -> Coin;

    fn network(&self) -> Option<Network>;

    fn has_private_keys(&self) -> bool;

    fn public_key(&self) -> Result<&str, AccountError>;

    /// Fails with `AccountError::Access` on watch-only accounts.
    fn private_key(&self) -> Result<String, AccountError>;

    fn address(&self) -> Result<&str, AccountError>;

    fn format_text(&self) -> Result<String, AccountError> {
        if self.has_private_keys() {
            Ok(format!(
                "Private: {}\nPublic: {}\nAddress: {}",
                self.private_key()?,
                self.public_key()?,
                self.address()?
            ))
        } else {
            Ok(format!(
                "Public: {}\nAddress: {}",
                self.public_key()?,
                self.address()?
            ))
        }
    }

    /// Seals the exported private key under `passphrase`.
    fn encrypted_private_key(&self, passphrase: &str) -> Result<EncryptedKey, AccountError> {
        if passphrase.is_empty() {
            return Err(AccountError::Validation("passphrase must not be empty".to_string()));
        }
        let private_key = zeroize::Zeroizing::new(self.private_key()?);
        Ok(storage::encrypt(passphrase, &private_key)?)
    }

    fn address_qr(&self) -> Result<String, AccountError> {
        Ok(qr::render_qr(self.address()?)?)
    }

    fn record(&self) -> Result<AccountRecord, AccountError> {
        let private_key = if self.has_private_keys() {
            Some(self.private_key()?)
        } else {
            None
        };
        Ok(AccountRecord {
            coin: self.coin(),
            network: self.network(),
            public_key: self.public_key()?.to_string(),
            private_key,
            address: self.address()?.to_string(),
        })
    }
}

/// Generates a fresh account of the requested coin.
///
/// `testnet` and `extra_entropy` only affect Bitcoin accounts.
pub fn generate_account(
    coin: Coin,
    extra_entropy: Option<&[u8]>,
    testnet: bool,
) -> Result<Box<dyn Account>, AccountError> {
    match coin {
        Coin::Bitcoin => Ok(Box::new(BitcoinAccount::generate(extra_entropy, testnet)?)),
        Coin::Ethereum => {
            if extra_entropy.is_some() || testnet {
                tracing::warn!("extra entropy and testnet are ignored for ethereum accounts");
            }
            Ok(Box::new(EthereumAccount::generate()))
        }
    }
}

/// Returns the cached value, deriving and storing it on first use.
pub(crate) fn cached<F>(cell: &OnceCell<String>, derive: F) -> Result<&str, AccountError>
where
    F: FnOnce() -> Result<String, AccountError>,
{
    if let Some(value) = cell.get() {
        return Ok(value.as_str());
    }
    let value = derive()?;
    Ok(cell.get_or_init(|| value).as_str())
}

/// Empty strings count as absent key material or address.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

pub(crate) fn display_account<A: Account + ?Sized>(
    account: &A,
    f: &mut fmt::Formatter,
) -> fmt::Result {
    match account.format_text() {
        Ok(text) => write!(f, "{}", text),
        Err(e) => write!(f, "<unavailable: {}>", e),
    }
}
