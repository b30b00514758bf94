use std::error::Error;
use std::fmt;

use crate::derivation::DerivationError;
use crate::keys::KeyError;
use crate::qr::QrError;
use crate::storage::StorageError;

/// Errors raised by account construction and accessors.
#[derive(Debug)]
pub enum AccountError {
    /// Missing or invalid construction parameters.
    Validation(String),
    /// Private-key operation on a watch-only account.
    Access(String),
    /// Neither key was available at derivation time.
    Derivation(String),
    /// Stored key material failed to decode or derive.
    Key(KeyError),
    Storage(StorageError),
    Qr(QrError),
}

impl AccountError {
    pub(crate) fn no_private_key() -> Self {
        AccountError::Access("no private key material".to_string())
    }
}

impl fmt::Display for AccountError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AccountError::Validation(msg) => write!(f, "Validation error: {}", msg),
            AccountError::Access(msg) => write!(f, "Access error: {}", msg),
            AccountError::Derivation(msg) => write!(f, "Derivation error: {}", msg),
            AccountError::Key(e) => write!(f, "Key error: {}", e),
            AccountError::Storage(e) => write!(f, "Storage error: {}", e),
            AccountError::Qr(e) => write!(f, "QR error: {}", e),
        }
    }
}

impl Error for AccountError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AccountError::Key(e) => Some(e),
            AccountError::Storage(e) => Some(e),
            AccountError::Qr(e) => Some(e),
            _ => None,
        }
    }
}

impl From<KeyError> for AccountError {
    fn from(err: KeyError) -> Self {
        AccountError::Key(err)
    }
}

impl From<DerivationError> for AccountError {
    fn from(err: DerivationError) -> Self {
        AccountError::Key(KeyError::DerivationError(err))
    }
}

impl From<StorageError> for AccountError {
    fn from(err: StorageError) -> Self {
        AccountError::Storage(err)
    }
}

impl From<QrError> for AccountError {
    fn from(err: QrError) -> Self {
        AccountError::Qr(err)
    }
}
