//! [`KeyMaterial`] and the generator that draws it from an injected CSPRNG.

use aes_gcm::aead::{
    rand_core::{CryptoRng, RngCore},
    OsRng,
};
use common::EnvelopeError;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::{NonceLength, KEY_LEN};

/// A fresh AES-256 key and GCM nonce for exactly one payload.
///
/// Not `Clone`: a value is moved into the seal call that consumes it, so the
/// same key/nonce pair cannot reach two plaintexts. Both buffers are
/// overwritten with zeroes on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial {
    key: [u8; KEY_LEN],
    nonce: Vec<u8>,
    #[zeroize(skip)]
    nonce_len: NonceLength,
}

impl KeyMaterial {
    /// Raw key bytes.
    pub fn key(&self) -> &[u8; KEY_LEN] {
        &self.key
    }

    /// Raw nonce bytes (12 or 16, see [`KeyMaterial::nonce_length`]).
    pub fn nonce(&self) -> &[u8] {
        &self.nonce
    }

    /// Which nonce length this material was drawn for.
    pub fn nonce_length(&self) -> NonceLength {
        self.nonce_len
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material, not even in debug builds.
        f.debug_struct("KeyMaterial")
            .field("key", &"[REDACTED]")
            .field("nonce_len", &self.nonce.len())
            .finish()
    }
}

/// Draws independent [`KeyMaterial`] values from a cryptographically secure RNG.
///
/// Production code uses [`OsRng`]; tests inject a seeded CSPRNG or a failing
/// double through [`KeyMaterialGenerator::with_rng`].
#[derive(Debug)]
pub struct KeyMaterialGenerator<R = OsRng> {
    rng: R,
    nonce_len: NonceLength,
}

impl KeyMaterialGenerator<OsRng> {
    /// Create a generator backed by the operating system CSPRNG.
    pub fn new(nonce_len: NonceLength) -> Self {
        Self::with_rng(OsRng, nonce_len)
    }
}

impl Default for KeyMaterialGenerator<OsRng> {
    fn default() -> Self {
        Self::new(NonceLength::default())
    }
}

impl<R: CryptoRng + RngCore> KeyMaterialGenerator<R> {
    /// Create a generator backed by `rng`.
    pub fn with_rng(rng: R, nonce_len: NonceLength) -> Self {
        Self { rng, nonce_len }
    }

    /// The nonce length of every [`KeyMaterial`] this generator produces.
    pub fn nonce_length(&self) -> NonceLength {
        self.nonce_len
    }

    /// Draw a fresh 256-bit key and nonce.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::SecureRandomUnavailable`] if the RNG reports a
    /// failure. No partial material is returned.
    pub fn generate(&mut self) -> Result<KeyMaterial, EnvelopeError> {
        let mut material = KeyMaterial {
            key: [0u8; KEY_LEN],
            nonce: vec![0u8; self.nonce_len.byte_len()],
            nonce_len: self.nonce_len,
        };
        self.rng
            .try_fill_bytes(&mut material.key)
            .map_err(|e| EnvelopeError::SecureRandomUnavailable(e.to_string()))?;
        self.rng
            .try_fill_bytes(&mut material.nonce)
            .map_err(|e| EnvelopeError::SecureRandomUnavailable(e.to_string()))?;
        Ok(material)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aes_gcm::aead::rand_core;
    use rand::{rngs::StdRng, SeedableRng};
    use std::collections::HashSet;
    use std::num::NonZeroU32;

    /// RNG double whose every draw fails.
    struct BrokenRng;

    impl RngCore for BrokenRng {
        fn next_u32(&mut self) -> u32 {
            0
        }
        fn next_u64(&mut self) -> u64 {
            0
        }
        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(0);
        }
        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand_core::Error> {
            let code = NonZeroU32::new(rand_core::Error::CUSTOM_START).unwrap();
            Err(rand_core::Error::from(code))
        }
    }

    impl CryptoRng for BrokenRng {}

    #[test]
    fn sizes_follow_nonce_length() {
        let mut standard = KeyMaterialGenerator::new(NonceLength::Standard);
        let m = standard.generate().unwrap();
        assert_eq!(m.key().len(), KEY_LEN);
        assert_eq!(m.nonce().len(), 12);
        assert_eq!(m.nonce_length(), NonceLength::Standard);

        let m = KeyMaterialGenerator::default().generate().unwrap();
        assert_eq!(m.nonce().len(), 16);
    }

    #[test]
    fn independent_draws_differ() {
        let mut generator = KeyMaterialGenerator::default();
        let mut keys = HashSet::new();
        let mut nonces = HashSet::new();
        for _ in 0..512 {
            let m = generator.generate().unwrap();
            assert!(keys.insert(*m.key()), "duplicate key drawn");
            assert!(nonces.insert(m.nonce().to_vec()), "duplicate nonce drawn");
            assert_ne!(&m.key()[..16], m.nonce(), "nonce repeats key bytes");
        }
    }

    #[test]
    fn seeded_rng_is_reproducible() {
        let mut a = KeyMaterialGenerator::with_rng(StdRng::seed_from_u64(7), NonceLength::Extended);
        let mut b = KeyMaterialGenerator::with_rng(StdRng::seed_from_u64(7), NonceLength::Extended);
        let (ma, mb) = (a.generate().unwrap(), b.generate().unwrap());
        assert_eq!(ma.key(), mb.key());
        assert_eq!(ma.nonce(), mb.nonce());

        let next = a.generate().unwrap();
        assert_ne!(next.key(), ma.key());
    }

    #[test]
    fn broken_rng_surfaces_secure_random_unavailable() {
        let mut generator = KeyMaterialGenerator::with_rng(BrokenRng, NonceLength::Extended);
        assert!(matches!(
            generator.generate(),
            Err(EnvelopeError::SecureRandomUnavailable(_))
        ));
    }

    #[test]
    fn key_material_redacted_in_debug() {
        let m = KeyMaterialGenerator::default().generate().unwrap();
        let s = format!("{m:?}");
        assert!(s.contains("REDACTED"));
        assert!(s.contains("nonce_len: 16"));
    }
}
