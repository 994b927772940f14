//! Common types, container format definitions, and errors shared across `image-envelope` crates.

pub mod error;
pub mod protocol;

pub use error::{AcceptedLen, EnvelopeError};
pub use protocol::{ContainerEncoding, EncodedData, EncryptedContainer, IndexedBytes};
