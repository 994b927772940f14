//! Common error types shared across crates.

use std::fmt;

use thiserror::Error;

/// Top-level envelope error type.
///
/// Every variant is terminal for the seal or open call that produced it.
/// Encryption is deterministic given its inputs, so retrying with the same
/// inputs reproduces the same failure; callers start over with fresh input.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The cryptographically secure random source reported a failure.
    #[error("secure random source unavailable: {0}")]
    SecureRandomUnavailable(String),

    /// A key or nonce had the wrong length for AES-256-GCM.
    #[error("invalid key material: {what} must be {expected} bytes, got {actual}")]
    InvalidKeyMaterial {
        /// Which input was malformed (`"key"` or `"nonce"`).
        what: &'static str,
        /// Length or lengths the input may have.
        expected: AcceptedLen,
        /// Length actually supplied.
        actual: usize,
    },

    /// The AEAD backend rejected the operation.
    #[error("encryption backend unavailable")]
    EncryptionBackendUnavailable,

    /// The container could not be encoded.
    #[error("serialization failure: {0}")]
    SerializationFailure(String),

    /// A container failed structural validation before decryption.
    #[error("malformed container: {0}")]
    MalformedContainer(String),

    /// The authentication tag did not verify: wrong key or tampered data.
    #[error("authentication failed")]
    AuthenticationFailed,
}

/// Byte lengths accepted for a key or nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptedLen {
    /// Exactly this many bytes.
    Exactly(usize),
    /// Either of two lengths.
    Either(usize, usize),
}

impl fmt::Display for AcceptedLen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcceptedLen::Exactly(n) => write!(f, "{n}"),
            AcceptedLen::Either(a, b) => write!(f, "{a} or {b}"),
        }
    }
}

impl EnvelopeError {
    /// Short machine-readable code, stable across releases.
    pub fn code(&self) -> &'static str {
        match self {
            EnvelopeError::SecureRandomUnavailable(_) => "secure_random_unavailable",
            EnvelopeError::InvalidKeyMaterial { .. } => "invalid_key_material",
            EnvelopeError::EncryptionBackendUnavailable => "encryption_backend_unavailable",
            EnvelopeError::SerializationFailure(_) => "serialization_failure",
            EnvelopeError::MalformedContainer(_) => "malformed_container",
            EnvelopeError::AuthenticationFailed => "authentication_failed",
        }
    }

    /// Always `false`; kept as an explicit API so callers never build retry loops.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
