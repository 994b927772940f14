//! `envelope`: client-side AES-256-GCM encryption of image payloads.
//!
//! Pipeline: plaintext bytes + content type → fresh key/nonce → AES-256-GCM →
//! JSON container `{key, iv, data, type}`.
//!
//! The container stores the key next to the ciphertext. It is a
//! self-contained demo container and is not secure for transport; anyone who
//! holds the file can decrypt it.
//!
//! ```text
//! KeyMaterialGenerator (OsRng, 32-byte key, 16- or 12-byte nonce)
//!   └── Encryptor (AES-256-GCM, no AAD, ciphertext ‖ 16-byte tag)
//!         └── ContainerSerializer (base64 or legacy browser encoding)
//! ```

pub mod container;
pub mod crypto;
pub mod keys;
pub mod pipeline;

pub use container::{parse, to_json, ContainerSerializer, DecodedContainer};
pub use crypto::{Encryptor, NonceLength, KEY_LEN, TAG_LEN};
pub use keys::{KeyMaterial, KeyMaterialGenerator};
pub use pipeline::{open, EnvelopeOptions, OpenedContainer, PlaintextInput, Sealer};
