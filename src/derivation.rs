use bitcoin_hashes::{hash160, Hash};
use hmac::{Hmac, Mac};
use secp256k1::{PublicKey, Scalar, Secp256k1, SecretKey};
use sha2::Sha512;
use std::fmt;
use tracing::debug;

pub const HARDENED_BIT: u32 = 0x80000000;

const MASTER_HMAC_KEY: &[u8] = b"Bitcoin seed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DerivationError {
    InvalidChildNumber,
    MissingPrivateKey,
    KeyDerivationFailed,
    HmacError,
    Secp256k1Error,
}

impl fmt::Display for DerivationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DerivationError::InvalidChildNumber => write!(f, "Invalid child number"),
            DerivationError::MissingPrivateKey => {
                write!(f, "Private key required for this derivation")
            }
            DerivationError::KeyDerivationFailed => write!(f, "Key derivation failed"),
            DerivationError::HmacError => write!(f, "HMAC operation failed"),
            DerivationError::Secp256k1Error => write!(f, "Secp256k1 operation failed"),
        }
    }
}

impl std::error::Error for DerivationError {}

/// A BIP32 extended key. Watch-only keys carry no private half.
#[derive(Debug, Clone)]
pub struct ExtendedKey {
    pub private_key: Option<SecretKey>,
    pub public_key: PublicKey,
    pub chain_code: [u8; 32],
    pub depth: u8,
    pub parent_fingerprint: [u8; 4],
    pub child_number: u32,
}

impl ExtendedKey {
    /// Creates a new master key from a seed
    pub fn from_seed(seed: &[u8]) -> Result<Self, DerivationError> {
        let secp = Secp256k1::new();

        let (left, chain_code) = hmac_sha512(MASTER_HMAC_KEY, seed)?;

        // Invalid for 1 in 2^127 seeds; the caller draws a fresh seed.
        let private_key = SecretKey::from_slice(&left)
            .map_err(|_| DerivationError::Secp256k1Error)?;
        let public_key = PublicKey::from_secret_key(&secp, &private_key);

        debug!("derived master key from {}-byte seed", seed.len());

        Ok(ExtendedKey {
            private_key: Some(private_key),
            public_key,
            chain_code,
            depth: 0,
            parent_fingerprint: [0u8; 4],
            child_number: 0,
        })
    }

    /// Derives the hardened child `index'`. Only private keys can do this.
    pub fn derive_hardened(&self, index: u32) -> Result<Self, DerivationError> {
        if is_hardened(index) {
            return Err(DerivationError::InvalidChildNumber);
        }
        let private_key = self
            .private_key
            .ok_or(DerivationError::MissingPrivateKey)?;
        let depth = self
            .depth
            .checked_add(1)
            .ok_or(DerivationError::KeyDerivationFailed)?;
        let child_number = index | HARDENED_BIT;

        // 0x00 ‖ 32-byte private key ‖ 4-byte index
        let mut data = Vec::with_capacity(37);
        data.push(0);
        data.extend_from_slice(&private_key.secret_bytes());
        data.extend_from_slice(&child_number.to_be_bytes());

        let (left, chain_code) = hmac_sha512(&self.chain_code, &data)?;

        let tweak = Scalar::from_be_bytes(left)
            .map_err(|_| DerivationError::KeyDerivationFailed)?;
        let child_private_key = private_key
            .add_tweak(&tweak)
            .map_err(|_| DerivationError::KeyDerivationFailed)?;
        let child_public_key = PublicKey::from_secret_key(&Secp256k1::new(), &child_private_key);

        debug!(depth, index, "derived hardened child key");

        Ok(ExtendedKey {
            private_key: Some(child_private_key),
            public_key: child_public_key,
            chain_code,
            depth,
            parent_fingerprint: self.fingerprint(),
            child_number,
        })
    }

    /// First four bytes of hash160 of the compressed public key.
    pub fn fingerprint(&self) -> [u8; 4] {
        let hash = hash160::Hash::hash(&self.public_key.serialize()).to_byte_array();
        let mut result = [0u8; 4];
        result.copy_from_slice(&hash[..4]);
        result
    }

    pub fn has_private_key(&self) -> bool {
        self.private_key.is_some()
    }

    /// Drops the private half, keeping everything needed for an xpub.
    pub fn neuter(&self) -> Self {
        ExtendedKey {
            private_key: None,
            ..self.clone()
        }
    }
}

pub fn is_hardened(index: u32) -> bool {
    index & HARDENED_BIT != 0
}

fn hmac_sha512(key: &[u8], data: &[u8]) -> Result<([u8; 32], [u8; 32]), DerivationError> {
    let mut hmac = Hmac::<Sha512>::new_from_slice(key)
        .map_err(|_| DerivationError::HmacError)?;
    hmac.update(data);
    let result = hmac.finalize().into_bytes();

    let mut left = [0u8; 32];
    let mut right = [0u8; 32];
    left.copy_from_slice(&result[0..32]);
    right.copy_from_slice(&result[32..64]);
    Ok((left, right))
}
