use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use pbkdf2::pbkdf2_hmac;
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use tracing::debug;
use zeroize::Zeroizing;

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const PBKDF2_ROUNDS: u32 = 100_000;

#[derive(Debug)]
pub enum StorageError {
    IoError(std::io::Error),
    EncryptionError,
    PasswordError,
    InvalidFormat,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StorageError::IoError(e) => write!(f, "IO error: {}", e),
            StorageError::EncryptionError => write!(f, "Failed to encrypt data"),
            StorageError::PasswordError => write!(f, "Invalid passphrase"),
            StorageError::InvalidFormat => write!(f, "Invalid envelope format"),
        }
    }
}

impl Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::IoError(err)
    }
}

/// A private key sealed under a passphrase: salt + nonce + AES-GCM ciphertext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedKey {
    salt: [u8; SALT_LEN],
    nonce: [u8; NONCE_LEN],
    ciphertext: Vec<u8>,
}

/// Encrypts `plaintext` with a key stretched from `passphrase`.
pub fn encrypt(passphrase: &str, plaintext: &str) -> Result<EncryptedKey, StorageError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let key = derive_key(passphrase, &salt);
    let cipher = Aes256Gcm::new_from_slice(&key[..]).map_err(|_| StorageError::EncryptionError)?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
        .map_err(|_| StorageError::EncryptionError)?;

    debug!(bytes = ciphertext.len(), "sealed private key");

    Ok(EncryptedKey { salt, nonce, ciphertext })
}

fn derive_key(passphrase: &str, salt: &[u8]) -> Zeroizing<[u8; 32]> {
    let mut key = Zeroizing::new([0u8; 32]);
    pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, PBKDF2_ROUNDS, &mut key[..]);
    key
}

impl EncryptedKey {
    /// Recovers the plaintext; a wrong passphrase fails authentication.
    pub fn decrypt(&self, passphrase: &str) -> Result<Zeroizing<String>, StorageError> {
        let key = derive_key(passphrase, &self.salt);
        let cipher = Aes256Gcm::new_from_slice(&key[..]).map_err(|_| StorageError::InvalidFormat)?;
        let plaintext = cipher
            .decrypt(Nonce::from_slice(&self.nonce), self.ciphertext.as_slice())
            .map_err(|_| StorageError::PasswordError)?;

        String::from_utf8(plaintext)
            .map(Zeroizing::new)
            .map_err(|_| StorageError::InvalidFormat)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(SALT_LEN + NONCE_LEN + self.ciphertext.len());
        data.extend_from_slice(&self.salt);
        data.extend_from_slice(&self.nonce);
        data.extend_from_slice(&self.ciphertext);
        data
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, StorageError> {
        if data.len() < SALT_LEN + NONCE_LEN + TAG_LEN {
            return Err(StorageError::InvalidFormat);
        }
        let mut salt = [0u8; SALT_LEN];
        salt.copy_from_slice(&data[..SALT_LEN]);
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&data[SALT_LEN..SALT_LEN + NONCE_LEN]);

        Ok(EncryptedKey {
            salt,
            nonce,
            ciphertext: data[SALT_LEN + NONCE_LEN..].to_vec(),
        })
    }

    /// Hex text form, suitable for printing or pasting.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn from_hex(encoded: &str) -> Result<Self, StorageError> {
        let data = hex::decode(encoded.trim()).map_err(|_| StorageError::InvalidFormat)?;
        Self::from_bytes(&data)
    }

    /// Writes the hex envelope to `path`, readable only by the owner on Unix.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, self.to_hex())?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
        }

        debug!(path = %path.display(), "saved encrypted key");
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let contents = fs::read_to_string(path)?;
        Self::from_hex(&contents)
    }
}

impl fmt::Display for EncryptedKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decrypts_with_matching_passphrase() {
        let wif = "L5BmPijJjrKbiUfG4zbiFKNqkvuJ8usooJmzuD7Z8dkRoTThYnAT";
        let sealed = encrypt("correct horse", wif).unwrap();
        let opened = sealed.decrypt("correct horse").unwrap();
        assert_eq!(opened.as_str(), wif);
    }

    #[test]
    fn wrong_passphrase_is_rejected() {
        let sealed = encrypt("correct horse", "secret").unwrap();
        assert!(matches!(
            sealed.decrypt("battery staple"),
            Err(StorageError::PasswordError)
        ));
    }

    #[test]
    fn envelopes_are_salted() {
        let a = encrypt("pass", "secret").unwrap();
        let b = encrypt("pass", "secret").unwrap();
        assert_ne!(a.to_hex(), b.to_hex());
    }

    #[test]
    fn hex_form_parses_back() {
        let sealed = encrypt("pass", "secret").unwrap();
        let parsed = EncryptedKey::from_hex(&sealed.to_hex()).unwrap();
        assert_eq!(parsed, sealed);
        assert_eq!(parsed.decrypt("pass").unwrap().as_str(), "secret");
    }

    #[test]
    fn truncated_envelope_is_invalid() {
        assert!(matches!(
            EncryptedKey::from_hex("00ff"),
            Err(StorageError::InvalidFormat)
        ));
        assert!(matches!(
            EncryptedKey::from_hex("not hex"),
            Err(StorageError::InvalidFormat)
        ));
    }

    #[test]
    fn save_and_load() {
        let dir = std::env::temp_dir().join(format!("cold-wallet-test-{}", std::process::id()));
        let path = dir.join("key.enc");
        let sealed = encrypt("pass", "secret").unwrap();

        sealed.save(&path).unwrap();
        let loaded = EncryptedKey::load(&path).unwrap();
        assert_eq!(loaded, sealed);

        fs::remove_dir_all(&dir).unwrap();
    }
}
