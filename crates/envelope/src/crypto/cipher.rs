//! AES-256-GCM encryption and decryption of whole payloads.
//!
//! **Nonce length:** GCM is specified for 96-bit nonces. Longer nonces are
//! legal and are first compressed through GHASH; WebCrypto does this for the
//! 16-byte IVs found in browser-made containers, so [`NonceLength::Extended`]
//! keeps those containers readable. Both lengths share the same key size and
//! 16-byte tag.
//!
//! **Never reuse a key/nonce pair.** GCM nonce reuse breaks both
//! confidentiality and authentication; callers get fresh material from
//! [`crate::keys::KeyMaterialGenerator`] for every payload.

use aes_gcm::{
    aead::{consts::U16, generic_array::typenum::Unsigned, Aead, AeadCore, KeyInit, Nonce},
    aes::Aes256,
    Aes256Gcm, AesGcm,
};
use common::{AcceptedLen, EnvelopeError};
use serde::{Deserialize, Serialize};

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Byte length of the GCM authentication tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;

/// AES-256-GCM with a 128-bit nonce.
type Aes256Gcm128 = AesGcm<Aes256, U16>;

/// Supported GCM nonce lengths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum NonceLength {
    /// 12 bytes, the GCM recommendation.
    Standard,
    /// 16 bytes, matching browser-made containers.
    #[default]
    Extended,
}

impl NonceLength {
    /// Length in bytes.
    pub const fn byte_len(self) -> usize {
        match self {
            NonceLength::Standard => 12,
            NonceLength::Extended => 16,
        }
    }

    /// Map a byte length back to a supported variant.
    pub fn from_len(len: usize) -> Option<Self> {
        match len {
            12 => Some(NonceLength::Standard),
            16 => Some(NonceLength::Extended),
            _ => None,
        }
    }
}

impl TryFrom<u8> for NonceLength {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        NonceLength::from_len(value as usize)
            .ok_or_else(|| format!("unsupported nonce length {value}; expected 12 or 16"))
    }
}

impl From<NonceLength> for u8 {
    fn from(value: NonceLength) -> Self {
        value.byte_len() as u8
    }
}

/// Stateless AES-256-GCM encryptor bound to one nonce length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Encryptor {
    nonce_len: NonceLength,
}

impl Encryptor {
    /// Create an encryptor that accepts nonces of exactly `nonce_len` bytes.
    pub fn new(nonce_len: NonceLength) -> Self {
        Self { nonce_len }
    }

    /// The nonce length this encryptor requires.
    pub fn nonce_length(&self) -> NonceLength {
        self.nonce_len
    }

    /// Encrypt `plaintext` under `key` and `nonce` with no associated data.
    ///
    /// Returns `ciphertext ‖ tag`, always `plaintext.len() + TAG_LEN` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::InvalidKeyMaterial`] if `key` is not
    /// [`KEY_LEN`] bytes or `nonce` is not the configured length.
    /// Returns [`EnvelopeError::EncryptionBackendUnavailable`] if the AEAD
    /// backend rejects the operation.
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        key: &[u8],
        nonce: &[u8],
    ) -> Result<Vec<u8>, EnvelopeError> {
        match self.nonce_len {
            NonceLength::Standard => seal::<Aes256Gcm>(plaintext, key, nonce),
            NonceLength::Extended => seal::<Aes256Gcm128>(plaintext, key, nonce),
        }
    }

    /// Decrypt `ciphertext ‖ tag` produced by [`Encryptor::encrypt`].
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::InvalidKeyMaterial`] for wrong key or nonce
    /// lengths, [`EnvelopeError::MalformedContainer`] if the input is shorter
    /// than a tag, and [`EnvelopeError::AuthenticationFailed`] if the tag does
    /// not verify.
    pub fn decrypt(
        &self,
        ciphertext: &[u8],
        key: &[u8],
        nonce: &[u8],
    ) -> Result<Vec<u8>, EnvelopeError> {
        if ciphertext.len() < TAG_LEN {
            return Err(EnvelopeError::MalformedContainer(format!(
                "ciphertext is {} bytes, shorter than the {TAG_LEN}-byte tag",
                ciphertext.len()
            )));
        }
        match self.nonce_len {
            NonceLength::Standard => open::<Aes256Gcm>(ciphertext, key, nonce),
            NonceLength::Extended => open::<Aes256Gcm128>(ciphertext, key, nonce),
        }
    }
}

fn seal<C>(plaintext: &[u8], key: &[u8], nonce: &[u8]) -> Result<Vec<u8>, EnvelopeError>
where
    C: KeyInit + Aead,
{
    let cipher = build_cipher::<C>(key)?;
    let nonce = check_nonce::<C>(nonce)?;
    cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| EnvelopeError::EncryptionBackendUnavailable)
}

fn open<C>(ciphertext: &[u8], key: &[u8], nonce: &[u8]) -> Result<Vec<u8>, EnvelopeError>
where
    C: KeyInit + Aead,
{
    let cipher = build_cipher::<C>(key)?;
    let nonce = check_nonce::<C>(nonce)?;
    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| EnvelopeError::AuthenticationFailed)
}

fn build_cipher<C: KeyInit>(key: &[u8]) -> Result<C, EnvelopeError> {
    let invalid = || EnvelopeError::InvalidKeyMaterial {
        what: "key",
        expected: AcceptedLen::Exactly(KEY_LEN),
        actual: key.len(),
    };
    if key.len() != KEY_LEN {
        return Err(invalid());
    }
    C::new_from_slice(key).map_err(|_| invalid())
}

fn check_nonce<C: AeadCore>(nonce: &[u8]) -> Result<&Nonce<C>, EnvelopeError> {
    let expected = C::NonceSize::USIZE;
    if nonce.len() != expected {
        return Err(EnvelopeError::InvalidKeyMaterial {
            what: "nonce",
            expected: AcceptedLen::Exactly(expected),
            actual: nonce.len(),
        });
    }
    Ok(Nonce::<C>::from_slice(nonce))
}
