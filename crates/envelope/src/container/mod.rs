//! Container serialization and parsing.
//!
//! # Wire format
//!
//! ```text
//! {"key": <32 bytes>, "iv": <12|16 bytes>, "data": <ciphertext‖tag>, "type": "<content type>"}
//! ```
//!
//! Binary fields are base64 by default. The legacy encoding writes `key` and
//! `iv` as comma-joined decimal bytes and `data` as an index-keyed object, the
//! shape a browser produces when it stringifies `Uint8Array` values. Parsing
//! accepts both.

pub mod codec;

pub use codec::{decode, parse, to_json, ContainerSerializer, DecodedContainer};
