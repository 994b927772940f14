//! Container format and report types exchanged between components.
//!
//! The container is the sole persisted artifact: a JSON object with exactly
//! four fields, `key`, `iv`, `data` and `type`. It carries the key next to the
//! ciphertext, so it is a self-contained demo container and is not secure for
//! transport.

use std::fmt;

use serde::{
    de::{self, MapAccess, Visitor},
    ser::SerializeMap,
    Deserialize, Deserializer, Serialize, Serializer,
};

// ---------------------------------------------------------------------------
// Container
// ---------------------------------------------------------------------------

/// The exported container.
///
/// `key` and `iv` are text encodings of the raw key and nonce bytes; `data` is
/// the encoded ciphertext with the 16-byte GCM tag appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EncryptedContainer {
    /// Encoded 32-byte AES-256 key.
    pub key: String,
    /// Encoded GCM nonce (16 bytes, or 12 in standard-nonce mode).
    pub iv: String,
    /// Encoded ciphertext‖tag.
    pub data: EncodedData,
    /// Content type of the sealed input, e.g. `"image/png"`.
    #[serde(rename = "type")]
    pub content_type: String,
}

/// The `data` field in either of its two wire shapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EncodedData {
    /// Base64 text.
    Text(String),
    /// Object keyed by decimal index, as a browser serialises a `Uint8Array`.
    Indexed(IndexedBytes),
}

/// Which text encoding the serializer emits for binary fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerEncoding {
    /// Standard padded base64 for `key`, `iv` and `data`.
    #[default]
    Base64,
    /// Comma-joined decimal bytes for `key`/`iv` and an indexed object for `data`.
    Legacy,
}

impl fmt::Display for ContainerEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerEncoding::Base64 => f.write_str("base64"),
            ContainerEncoding::Legacy => f.write_str("legacy"),
        }
    }
}

/// Bytes serialised as `{"0":b0,"1":b1,...}` in ascending index order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexedBytes(pub Vec<u8>);

impl Serialize for IndexedBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (i, b) in self.0.iter().enumerate() {
            map.serialize_entry(&i.to_string(), b)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for IndexedBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(IndexedBytesVisitor)
    }
}

struct IndexedBytesVisitor;

impl<'de> Visitor<'de> for IndexedBytesVisitor {
    type Value = IndexedBytes;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object mapping indices 0..n to byte values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut entries: Vec<(usize, u8)> = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, u8>()? {
            let index = key
                .parse::<usize>()
                .ok()
                .filter(|index| index.to_string() == key)
                .ok_or_else(|| de::Error::custom(format!("non-canonical index {key:?}")))?;
            entries.push((index, value));
        }
        entries.sort_unstable_by_key(|(index, _)| *index);
        for (position, (index, _)) in entries.iter().enumerate() {
            if *index != position {
                return Err(de::Error::custom(format!(
                    "indices must be contiguous from 0; expected {position}, found {index}"
                )));
            }
        }
        Ok(IndexedBytes(entries.into_iter().map(|(_, b)| b).collect()))
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// One successful export, printed as a JSON line by the collaborator binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSummary {
    /// Input path as given.
    pub source: String,
    /// Path the output was written to.
    pub output: String,
    /// Content type recorded in (or read from) the container.
    pub content_type: String,
    /// Plaintext length in bytes.
    pub plaintext_len: u64,
    /// Size of the written artifact in bytes.
    pub output_len: u64,
}

/// Failure report for a single input file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureReport {
    /// Input path as given.
    pub file: String,
    /// Short machine-readable error code (e.g. `"authentication_failed"`).
    pub code: String,
    /// Human-readable description; never contains key material.
    pub message: String,
}

impl FailureReport {
    /// Construct a [`FailureReport`] from a file, code and message.
    pub fn new(
        file: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn container_uses_type_field_name() {
        let c = EncryptedContainer {
            key: "k".into(),
            iv: "i".into(),
            data: EncodedData::Text("d".into()),
            content_type: "image/png".into(),
        };
        let value = serde_json::to_value(&c).unwrap();
        assert_eq!(
            value,
            json!({"key": "k", "iv": "i", "data": "d", "type": "image/png"})
        );
    }

    #[test]
    fn container_rejects_extra_fields() {
        let s = r#"{"key":"k","iv":"i","data":"d","type":"image/png","alg":"x"}"#;
        assert!(serde_json::from_str::<EncryptedContainer>(s).is_err());
    }

    #[test]
    fn indexed_bytes_serialise_in_index_order() {
        let data = EncodedData::Indexed(IndexedBytes((0u8..12).collect()));
        let s = serde_json::to_string(&data).unwrap();
        assert!(s.starts_with(r#"{"0":0,"1":1,"2":2,"#));
        assert!(s.ends_with(r#""10":10,"11":11}"#));
    }

    #[test]
    fn indexed_bytes_accept_any_key_order() {
        let data: EncodedData = serde_json::from_str(r#"{"2":30,"0":10,"1":20}"#).unwrap();
        assert_eq!(data, EncodedData::Indexed(IndexedBytes(vec![10, 20, 30])));
    }

    #[test]
    fn indexed_bytes_reject_gaps() {
        assert!(serde_json::from_str::<IndexedBytes>(r#"{"0":1,"2":3}"#).is_err());
    }

    #[test]
    fn indexed_bytes_reject_non_canonical_keys() {
        for s in [r#"{"00":1,"1":2}"#, r#"{"0":1,"+1":2}"#, r#"{"0":1," 1":2}"#, r#"{"a":1}"#] {
            assert!(serde_json::from_str::<IndexedBytes>(s).is_err(), "{s}");
        }
    }

    #[test]
    fn indexed_bytes_reject_out_of_range_values() {
        assert!(serde_json::from_str::<IndexedBytes>(r#"{"0":256}"#).is_err());
    }

    #[test]
    fn untagged_data_prefers_text_for_strings() {
        let data: EncodedData = serde_json::from_str(r#""AAEC""#).unwrap();
        assert_eq!(data, EncodedData::Text("AAEC".into()));
    }

    #[test]
    fn encoding_parses_lowercase() {
        let e: ContainerEncoding = serde_json::from_str(r#""legacy""#).unwrap();
        assert_eq!(e, ContainerEncoding::Legacy);
        assert_eq!(ContainerEncoding::default().to_string(), "base64");
    }

    #[test]
    fn failure_report_new() {
        let r = FailureReport::new("cat.png", "unsupported_type", "not an image");
        assert_eq!(r.code, "unsupported_type");
        assert!(r.message.contains("not an image"));
    }
}
