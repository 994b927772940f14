//! Encoding of key, nonce and ciphertext into an [`EncryptedContainer`] and back.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::{
    AcceptedLen, ContainerEncoding, EncodedData, EncryptedContainer, EnvelopeError, IndexedBytes,
};
use zeroize::Zeroizing;

use crate::crypto::{NonceLength, KEY_LEN, TAG_LEN};

/// Builds containers from raw key material and ciphertext.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContainerSerializer {
    encoding: ContainerEncoding,
}

impl ContainerSerializer {
    /// Serializer writing `key`, `iv` and `data` in `encoding`.
    pub fn new(encoding: ContainerEncoding) -> Self {
        Self { encoding }
    }

    /// The encoding this serializer writes.
    pub fn encoding(&self) -> ContainerEncoding {
        self.encoding
    }

    /// Package `key`, `nonce`, `ciphertext` and `content_type` into a container.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::InvalidKeyMaterial`] for a key that is not
    /// [`KEY_LEN`] bytes or a nonce that is neither 12 nor 16 bytes.
    /// Returns [`EnvelopeError::SerializationFailure`] if `content_type`
    /// contains characters a content-type label cannot carry.
    pub fn serialize(
        &self,
        key: &[u8],
        nonce: &[u8],
        ciphertext: Vec<u8>,
        content_type: &str,
    ) -> Result<EncryptedContainer, EnvelopeError> {
        if key.len() != KEY_LEN {
            return Err(EnvelopeError::InvalidKeyMaterial {
                what: "key",
                expected: AcceptedLen::Exactly(KEY_LEN),
                actual: key.len(),
            });
        }
        if NonceLength::from_len(nonce.len()).is_none() {
            return Err(EnvelopeError::InvalidKeyMaterial {
                what: "nonce",
                expected: AcceptedLen::Either(
                    NonceLength::Standard.byte_len(),
                    NonceLength::Extended.byte_len(),
                ),
                actual: nonce.len(),
            });
        }
        check_content_type(content_type).map_err(EnvelopeError::SerializationFailure)?;

        let container = match self.encoding {
            ContainerEncoding::Base64 => EncryptedContainer {
                key: STANDARD.encode(key),
                iv: STANDARD.encode(nonce),
                data: EncodedData::Text(STANDARD.encode(&ciphertext)),
                content_type: content_type.to_owned(),
            },
            ContainerEncoding::Legacy => EncryptedContainer {
                key: decimal_list(key),
                iv: decimal_list(nonce),
                data: EncodedData::Indexed(IndexedBytes(ciphertext)),
                content_type: content_type.to_owned(),
            },
        };
        Ok(container)
    }
}

/// Render a container as the JSON bytes written to disk.
///
/// # Errors
///
/// Returns [`EnvelopeError::SerializationFailure`] if JSON encoding fails.
pub fn to_json(container: &EncryptedContainer) -> Result<Vec<u8>, EnvelopeError> {
    serde_json::to_vec(container).map_err(|e| EnvelopeError::SerializationFailure(e.to_string()))
}

/// A container whose fields have been decoded and validated.
pub struct DecodedContainer {
    key: Zeroizing<Vec<u8>>,
    nonce: Vec<u8>,
    ciphertext: Vec<u8>,
    content_type: String,
}

impl DecodedContainer {
    /// The 32-byte AES-256 key.
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// The 12- or 16-byte nonce.
    pub fn nonce(&self) -> &[u8] {
        &self.nonce
    }

    /// The length of [`DecodedContainer::nonce`]; validated during parsing.
    pub fn nonce_length(&self) -> NonceLength {
        NonceLength::from_len(self.nonce.len()).unwrap_or_default()
    }

    /// Ciphertext followed by the 16-byte tag.
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Content type label stored with the payload.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }
}

impl std::fmt::Debug for DecodedContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedContainer")
            .field("key", &"[REDACTED]")
            .field("nonce_len", &self.nonce.len())
            .field("ciphertext_len", &self.ciphertext.len())
            .field("content_type", &self.content_type)
            .finish()
    }
}

/// Parse and validate container JSON.
///
/// Either encoding is accepted, detected per field: a `key`/`iv` containing a
/// comma is a decimal list, otherwise base64; a string `data` is base64, an
/// object is an indexed byte map.
///
/// # Errors
///
/// Returns [`EnvelopeError::MalformedContainer`] if the JSON is invalid, a
/// field is missing or undecodable, or the key, nonce or ciphertext has an
/// impossible length.
pub fn parse(bytes: &[u8]) -> Result<DecodedContainer, EnvelopeError> {
    let container: EncryptedContainer = serde_json::from_slice(bytes)
        .map_err(|e| EnvelopeError::MalformedContainer(format!("invalid container JSON: {e}")))?;
    decode(container)
}

/// Decode and validate an already-deserialised container.
///
/// # Errors
///
/// See [`parse`].
pub fn decode(container: EncryptedContainer) -> Result<DecodedContainer, EnvelopeError> {
    let key = Zeroizing::new(decode_text_field("key", &container.key)?);
    if key.len() != KEY_LEN {
        return Err(EnvelopeError::MalformedContainer(format!(
            "key decodes to {} bytes, expected {KEY_LEN}",
            key.len()
        )));
    }

    let nonce = decode_text_field("iv", &container.iv)?;
    if NonceLength::from_len(nonce.len()).is_none() {
        return Err(EnvelopeError::MalformedContainer(format!(
            "iv decodes to {} bytes, expected 12 or 16",
            nonce.len()
        )));
    }

    let ciphertext = match container.data {
        EncodedData::Text(s) => STANDARD
            .decode(s.as_bytes())
            .map_err(|e| EnvelopeError::MalformedContainer(format!("data is not base64: {e}")))?,
        EncodedData::Indexed(IndexedBytes(bytes)) => bytes,
    };
    if ciphertext.len() < TAG_LEN {
        return Err(EnvelopeError::MalformedContainer(format!(
            "data decodes to {} bytes, shorter than the {TAG_LEN}-byte tag",
            ciphertext.len()
        )));
    }

    check_content_type(&container.content_type).map_err(EnvelopeError::MalformedContainer)?;

    Ok(DecodedContainer {
        key,
        nonce,
        ciphertext,
        content_type: container.content_type,
    })
}

fn decode_text_field(name: &str, value: &str) -> Result<Vec<u8>, EnvelopeError> {
    if value.contains(',') {
        parse_decimal_list(value).ok_or_else(|| {
            EnvelopeError::MalformedContainer(format!("{name} is not a list of byte values"))
        })
    } else {
        STANDARD
            .decode(value.as_bytes())
            .map_err(|e| EnvelopeError::MalformedContainer(format!("{name} is not base64: {e}")))
    }
}

/// `[1, 22, 255]` → `"1,22,255"`.
fn decimal_list(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(u8::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn parse_decimal_list(s: &str) -> Option<Vec<u8>> {
    s.split(',').map(|part| part.parse::<u8>().ok()).collect()
}

/// Content types are printable ASCII; an empty label means "unknown".
fn check_content_type(content_type: &str) -> Result<(), String> {
    match content_type
        .chars()
        .find(|c| !c.is_ascii() || c.is_ascii_control())
    {
        Some(c) => Err(format!(
            "content type contains unsupported character {c:?}"
        )),
        None => Ok(()),
    }
}
