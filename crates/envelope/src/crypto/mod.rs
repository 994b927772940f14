//! AES-256-GCM payload encryption primitives.
//!
//! This module is free of I/O and encoding concerns. It provides the
//! encrypt/decrypt operations used by the seal and open pipeline.
//!
//! # Ciphertext format
//!
//! ```text
//! ciphertext (same length as plaintext) ‖ 16-byte GCM tag
//! ```
//!
//! The nonce is not prefixed; it travels in the container's `iv` field.

pub mod cipher;

pub use cipher::{Encryptor, NonceLength, KEY_LEN, TAG_LEN};
