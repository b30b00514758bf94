use rand::rngs::OsRng;
use secp256k1::{PublicKey, Secp256k1, SecretKey};
use std::cell::OnceCell;
use std::fmt;
use tracing::debug;

use super::{cached, display_account, non_empty, Account, Coin};
use crate::error::AccountError;
use crate::keys::{eth_address, eth_checksum_address, uncompressed_coordinates};
use crate::network::Network;

/// A raw secp256k1 keypair addressed the Ethereum way.
pub struct EthereumAccount {
    public_key: OnceCell<PublicKey>,
    private_key: Option<SecretKey>,
    public_key_hex: OnceCell<String>,
    address: OnceCell<String>,
}

impl EthereumAccount {
    /// Builds an account from existing key material. At least one key is required.
    pub fn new(
        public_key: Option<PublicKey>,
        private_key: Option<SecretKey>,
        address: Option<String>,
    ) -> Result<Self, AccountError> {
        if public_key.is_none() && private_key.is_none() {
            return Err(AccountError::Validation(
                "a private or public key must be provided".to_string(),
            ));
        }

        Ok(EthereumAccount {
            public_key: public_key.map(OnceCell::from).unwrap_or_default(),
            private_key,
            public_key_hex: OnceCell::new(),
            address: non_empty(address).map(OnceCell::from).unwrap_or_default(),
        })
    }

    /// Draws a fresh private scalar from the OS random source.
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (private_key, public_key) = secp.generate_keypair(&mut OsRng);
        debug!("generated ethereum keypair");

        EthereumAccount {
            public_key: OnceCell::from(public_key),
            private_key: Some(private_key),
            public_key_hex: OnceCell::new(),
            address: OnceCell::new(),
        }
    }

    /// Imports a 32-byte private scalar given as hex, with or without `0x`.
    pub fn from_private_key_hex(encoded: &str) -> Result<Self, AccountError> {
        let bytes = decode_hex(encoded)?;
        let private_key = SecretKey::from_slice(&bytes)
            .map_err(|_| AccountError::Validation("invalid private key".to_string()))?;
        Self::new(None, Some(private_key), None)
    }

    /// Imports a watch-only account from X‖Y hex (64 bytes) or a
    /// 0x04-tagged uncompressed key (65 bytes).
    pub fn from_public_key_hex(encoded: &str) -> Result<Self, AccountError> {
        let mut bytes = decode_hex(encoded)?;
        match bytes.len() {
            64 => bytes.insert(0, 0x04),
            65 => {}
            len => {
                return Err(AccountError::Validation(format!(
                    "public key must be 64 or 65 bytes, got {}",
                    len
                )))
            }
        }
        let public_key = PublicKey::from_slice(&bytes)
            .map_err(|_| AccountError::Validation("invalid public key".to_string()))?;
        Self::new(Some(public_key), None, None)
    }

    fn point(&self) -> Result<&PublicKey, AccountError> {
        if let Some(point) = self.public_key.get() {
            return Ok(point);
        }
        let private_key = self.private_key.ok_or_else(|| {
            AccountError::Derivation("no key material to derive a public key from".to_string())
        })?;
        let point = PublicKey::from_secret_key(&Secp256k1::new(), &private_key);
        Ok(self.public_key.get_or_init(|| point))
    }

    /// EIP-55 mixed-case form of [`Account::address`].
    pub fn checksum_address(&self) -> Result<String, AccountError> {
        Ok(eth_checksum_address(self.address()?))
    }
}

fn decode_hex(encoded: &str) -> Result<Vec<u8>, AccountError> {
    let trimmed = encoded.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    hex::decode(digits).map_err(|e| AccountError::Validation(format!("invalid hex: {}", e)))
}

impl Account for EthereumAccount {
    fn coin(&self) -> Coin {
        Coin::Ethereum
    }

    fn network(&self) -> Option<Network> {
        None
    }

    fn has_private_keys(&self) -> bool {
        self.private_key.is_some()
    }

    fn public_key(&self) -> Result<&str, AccountError> {
        cached(&self.public_key_hex, || {
            Ok(hex::encode(uncompressed_coordinates(self.point()?)))
        })
    }

    fn private_key(&self) -> Result<String, AccountError> {
        let private_key = self.private_key.ok_or_else(AccountError::no_private_key)?;
        Ok(hex::encode(private_key.secret_bytes()))
    }

    fn address(&self) -> Result<&str, AccountError> {
        cached(&self.address, || Ok(eth_address(self.point()?)))
    }
}

impl fmt::Display for EthereumAccount {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        display_account(self, f)
    }
}
