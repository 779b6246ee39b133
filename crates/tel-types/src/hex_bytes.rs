//! Serde helpers that render byte buffers as lowercase hex strings.
//!
//! Use with `#[serde(with = "tel_types::hex_bytes")]` on a `Vec<u8>` field,
//! or `#[serde(with = "tel_types::hex_bytes::list")]` on a `Vec<Vec<u8>>`.

use serde::{Deserialize, Deserializer, Serializer};

use crate::error::TypeError;

/// Decode a hex string into bytes.
pub fn decode(s: &str) -> Result<Vec<u8>, TypeError> {
    hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))
}

pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&hex::encode(bytes))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    decode(&s).map_err(serde::de::Error::custom)
}

pub mod list {
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(items: &[Vec<u8>], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(items.len()))?;
        for item in items {
            seq.serialize_element(&hex::encode(item))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let strings = Vec::<String>::deserialize(deserializer)?;
        strings
            .iter()
            .map(|s| super::decode(s).map_err(serde::de::Error::custom))
            .collect()
    }
}
