//! The seal and open pipelines.
//!
//! Seal: `KeyMaterialGenerator → Encryptor → ContainerSerializer`, one fresh
//! [`KeyMaterial`](crate::keys::KeyMaterial) per call. Open: parse, validate,
//! decrypt. Both run to completion synchronously and keep no state between
//! calls.

use aes_gcm::aead::{
    rand_core::{CryptoRng, RngCore},
    OsRng,
};
use common::{ContainerEncoding, EncryptedContainer, EnvelopeError};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::container::{self, ContainerSerializer};
use crate::crypto::{Encryptor, NonceLength};
use crate::keys::KeyMaterialGenerator;

/// Knobs shared by every seal call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EnvelopeOptions {
    /// Length of freshly generated nonces.
    pub nonce_length: NonceLength,
    /// Text encoding of the container's binary fields.
    pub encoding: ContainerEncoding,
}

/// Raw input handed over by the file-loading side.
#[derive(Debug, Clone, Copy)]
pub struct PlaintextInput<'a> {
    /// File contents to seal; may be empty.
    pub bytes: &'a [u8],
    /// MIME type label such as `"image/png"`; empty when unknown.
    pub content_type: &'a str,
}

impl<'a> PlaintextInput<'a> {
    /// Borrow `bytes` labelled with `content_type`.
    pub fn new(bytes: &'a [u8], content_type: &'a str) -> Self {
        Self {
            bytes,
            content_type,
        }
    }
}

/// Result of opening a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedContainer {
    /// The authenticated plaintext.
    pub plaintext: Vec<u8>,
    /// Content type label read from the container.
    pub content_type: String,
}

/// Runs the seal pipeline.
///
/// Not `Clone` and not shared: concurrent callers each build their own
/// [`Sealer`], so no RNG state or buffer is reused across requests.
#[derive(Debug)]
pub struct Sealer<R = OsRng> {
    generator: KeyMaterialGenerator<R>,
    encryptor: Encryptor,
    serializer: ContainerSerializer,
}

impl Sealer<OsRng> {
    /// Create a sealer backed by the operating system CSPRNG.
    pub fn new(options: EnvelopeOptions) -> Self {
        Self::with_rng(options, OsRng)
    }
}

impl<R: CryptoRng + RngCore> Sealer<R> {
    /// Create a sealer that draws key material from `rng`.
    pub fn with_rng(options: EnvelopeOptions, rng: R) -> Self {
        Self {
            generator: KeyMaterialGenerator::with_rng(rng, options.nonce_length),
            encryptor: Encryptor::new(options.nonce_length),
            serializer: ContainerSerializer::new(options.encoding),
        }
    }

    /// Encrypt `input` under fresh key material and package the result.
    ///
    /// # Errors
    ///
    /// Any [`EnvelopeError`] from the three stages; no partial container is
    /// ever returned.
    #[instrument(
        skip_all,
        fields(
            plaintext_len = input.bytes.len(),
            content_type = input.content_type,
            nonce_len = self.encryptor.nonce_length().byte_len(),
            encoding = %self.serializer.encoding(),
        )
    )]
    pub fn seal(&mut self, input: PlaintextInput<'_>) -> Result<EncryptedContainer, EnvelopeError> {
        let material = self.generator.generate()?;
        let ciphertext = self
            .encryptor
            .encrypt(input.bytes, material.key(), material.nonce())?;
        let ciphertext_len = ciphertext.len();
        let container = self.serializer.serialize(
            material.key(),
            material.nonce(),
            ciphertext,
            input.content_type,
        )?;
        debug!(ciphertext_len, "payload sealed");
        Ok(container)
    }
}

/// Parse container JSON and decrypt its payload.
///
/// The nonce length is taken from the container, so containers made with
/// either nonce length open.
///
/// # Errors
///
/// [`EnvelopeError::MalformedContainer`] for structural problems and
/// [`EnvelopeError::AuthenticationFailed`] when the tag does not verify.
#[instrument(skip_all, fields(container_len = bytes.len()))]
pub fn open(bytes: &[u8]) -> Result<OpenedContainer, EnvelopeError> {
    let decoded = container::parse(bytes).inspect_err(|e| warn!(error = %e, "container rejected"))?;
    let encryptor = Encryptor::new(decoded.nonce_length());
    let plaintext = encryptor
        .decrypt(decoded.ciphertext(), decoded.key(), decoded.nonce())
        .inspect_err(|e| warn!(error = %e, "container failed to decrypt"))?;
    debug!(
        plaintext_len = plaintext.len(),
        content_type = decoded.content_type(),
        "payload opened"
    );
    Ok(OpenedContainer {
        plaintext,
        content_type: decoded.content_type().to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{decode, to_json};
    use crate::crypto::{KEY_LEN, TAG_LEN};
    use aes_gcm::aead::rand_core;
    use rand::{rngs::StdRng, SeedableRng};
    use std::num::NonZeroU32;

    /// RNG double that refuses every draw.
    struct FailingRng;

    impl RngCore for FailingRng {
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

    impl CryptoRng for FailingRng {}

    fn png_bytes() -> Vec<u8> {
        let mut v = b"\x89PNG\r\n\x1a\n".to_vec();
        v.extend((0..1000u32).map(|i| (i % 251) as u8));
        v
    }

    #[test]
    fn seal_then_open_round_trip() {
        let mut sealer = Sealer::new(EnvelopeOptions::default());
        let input = png_bytes();
        let c = sealer.seal(PlaintextInput::new(&input, "image/png")).unwrap();
        let opened = open(&to_json(&c).unwrap()).unwrap();
        assert_eq!(opened.plaintext, input);
        assert_eq!(opened.content_type, "image/png");
    }

    #[test]
    fn sealed_container_satisfies_length_invariants() {
        for options in [
            EnvelopeOptions::default(),
            EnvelopeOptions {
                nonce_length: NonceLength::Standard,
                encoding: ContainerEncoding::Legacy,
            },
        ] {
            let mut sealer = Sealer::new(options);
            let c = sealer.seal(PlaintextInput::new(&[1u8; 10], "image/bmp")).unwrap();
            let decoded = decode(c).unwrap();
            assert_eq!(decoded.key().len(), KEY_LEN);
            assert_eq!(decoded.nonce().len(), options.nonce_length.byte_len());
            assert_eq!(decoded.ciphertext().len(), 10 + TAG_LEN);
        }
    }

    #[test]
    fn empty_input_seals_to_tag_only() {
        let mut sealer = Sealer::new(EnvelopeOptions::default());
        let c = sealer.seal(PlaintextInput::new(&[], "image/png")).unwrap();
        assert_eq!(decode(c.clone()).unwrap().ciphertext().len(), TAG_LEN);
        assert!(open(&to_json(&c).unwrap()).unwrap().plaintext.is_empty());
    }

    #[test]
    fn each_seal_uses_fresh_material() {
        let mut sealer = Sealer::new(EnvelopeOptions::default());
        let a = sealer.seal(PlaintextInput::new(b"same", "image/png")).unwrap();
        let b = sealer.seal(PlaintextInput::new(b"same", "image/png")).unwrap();
        assert_ne!(a.key, b.key);
        assert_ne!(a.iv, b.iv);
        assert_ne!(a.data, b.data);
    }

    #[test]
    fn seeded_sealer_is_deterministic() {
        let options = EnvelopeOptions::default();
        let a = Sealer::with_rng(options, StdRng::seed_from_u64(42))
            .seal(PlaintextInput::new(b"pixels", "image/png"))
            .unwrap();
        let b = Sealer::with_rng(options, StdRng::seed_from_u64(42))
            .seal(PlaintextInput::new(b"pixels", "image/png"))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn bad_content_type_yields_no_container() {
        let mut sealer = Sealer::new(EnvelopeOptions::default());
        let err = sealer
            .seal(PlaintextInput::new(b"x", "image/png\u{0}"))
            .unwrap_err();
        assert!(matches!(err, EnvelopeError::SerializationFailure(_)));
    }

    #[test]
    fn random_source_failure_yields_no_container() {
        for options in [
            EnvelopeOptions::default(),
            EnvelopeOptions {
                nonce_length: NonceLength::Standard,
                encoding: ContainerEncoding::Legacy,
            },
        ] {
            let mut sealer = Sealer::with_rng(options, FailingRng);
            let result = sealer.seal(PlaintextInput::new(&png_bytes(), "image/png"));
            assert!(matches!(
                result,
                Err(EnvelopeError::SecureRandomUnavailable(_))
            ));
        }
    }

    #[test]
    fn open_detects_tampering() {
        let mut sealer = Sealer::new(EnvelopeOptions {
            nonce_length: NonceLength::Extended,
            encoding: ContainerEncoding::Legacy,
        });
        let mut c = sealer.seal(PlaintextInput::new(b"secret", "image/png")).unwrap();
        if let common::EncodedData::Indexed(ref mut bytes) = c.data {
            bytes.0[0] ^= 0x01;
        }
        assert!(matches!(
            open(&to_json(&c).unwrap()),
            Err(EnvelopeError::AuthenticationFailed)
        ));
    }

    #[test]
    fn open_rejects_garbage() {
        assert!(matches!(
            open(b"not json"),
            Err(EnvelopeError::MalformedContainer(_))
        ));
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let o: EnvelopeOptions = serde_json::from_str(r#"{"nonce_length": 12}"#).unwrap();
        assert_eq!(o.nonce_length, NonceLength::Standard);
        assert_eq!(o.encoding, ContainerEncoding::Base64);
    }
}
