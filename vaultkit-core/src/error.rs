//! Error types for the secure value read path.

use thiserror::Error;

/// Result type for read-path operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised while recovering a stored secret.
///
/// A missing record is not an error; [`crate::reader::SecureValueReader::lookup`]
/// reports it as `Ok(None)`. Every variant here is fatal for the current
/// lookup except [`StorageError::KeystoreUnavailable`], which the caller may
/// retry once the device keystore becomes reachable.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The device keystore cannot be opened, e.g. the device has not been
    /// unlocked since boot. Transient; see [`StorageError::is_retryable`].
    #[error("keystore unavailable: {0}")]
    KeystoreUnavailable(String),

    /// A record exists but the wrapped symmetric key is absent from the key
    /// material store. The installation is misconfigured; distinct from
    /// "nothing stored".
    #[error("wrapped symmetric key missing from key material store")]
    KeyMaterialMissing,

    /// The wrapped key is malformed, the declared algorithm does not match,
    /// or the private key handle is invalid or missing.
    #[error("key unwrap failed: {0}")]
    UnwrapFailure(String),

    /// The stored record is malformed: bad base64, shorter than the
    /// initialization vector, or an IV of the wrong size.
    #[error("invalid stored record: {0}")]
    InvalidRecord(String),

    /// Symmetric decryption failed: wrong key, wrong IV, or corrupted
    /// ciphertext.
    #[error("decryption failed: {0}")]
    DecryptFailure(String),

    /// The backing record store failed to read.
    #[error("record store error: {0}")]
    RecordStore(String),
}

impl StorageError {
    /// Whether the caller may retry the failed lookup.
    ///
    /// Only keystore unavailability is transient; every other failure is
    /// fatal for the record it occurred on.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::KeystoreUnavailable(_))
    }
}
