//! Per-payload key material.
//!
//! # Lifecycle
//!
//! 1. [`KeyMaterialGenerator::generate`] draws a 256-bit key and a nonce from
//!    the injected CSPRNG.
//! 2. The resulting [`KeyMaterial`] is moved into exactly one seal call.
//! 3. The seal call encodes the bytes into the container and drops the value,
//!    which zeroizes both buffers.
//!
//! # Security invariants
//!
//! - Key material is never logged or included in spans.
//! - A [`KeyMaterial`] cannot be cloned, so it cannot reach a second plaintext.

pub mod material;

pub use material::{KeyMaterial, KeyMaterialGenerator};
