use std::{fmt, str::FromStr};

use blake3::Hasher;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

/// Content fingerprint of a block. A BLAKE3 digest, rendered as lowercase hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockHash(blake3::Hash);

impl BlockHash {
    pub const fn from_bytes(bytes: [u8; blake3::OUT_LEN]) -> Self {
        Self(blake3::Hash::from_bytes(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; blake3::OUT_LEN] {
        self.0.as_bytes()
    }

    pub fn to_hex(&self) -> String {
        self.0.to_hex().to_string()
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_hex())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid block hash {0:?}: expected {len} hex characters", len = blake3::OUT_LEN * 2)]
pub struct ParseHashError(String);

impl FromStr for BlockHash {
    type Err = ParseHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // blake3 accepts uppercase digits too, the wire format is lowercase only
        if s.bytes().any(|b| b.is_ascii_uppercase()) {
            return Err(ParseHashError(s.to_owned()));
        }
        blake3::Hash::from_hex(s)
            .map(Self)
            .map_err(|_| ParseHashError(s.to_owned()))
    }
}

impl Serialize for BlockHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_hex())
    }
}

impl<'de> Deserialize<'de> for BlockHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// `PrevHash` on the wire: empty string for genesis, hex digest otherwise.
pub(crate) mod prev_hash {
    use serde::{Deserialize, Deserializer, Serializer, de};

    use super::BlockHash;

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(
        prev_hash: &Option<BlockHash>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match prev_hash {
            Some(hash) => serializer.serialize_str(&hash.to_hex()),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<BlockHash>, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s.is_empty() {
            return Ok(None);
        }
        s.parse().map(Some).map_err(de::Error::custom)
    }
}

/// Canonical string form of a timestamp as fed to the hasher.
pub fn canonical_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Fingerprint of a block's fields.
///
/// Every field is either fixed width or length prefixed, so no two distinct
/// field tuples share an encoding (`index=1, bpm=23` and `index=12, bpm=3`
/// hash differently).
pub fn calculate_hash(
    index: u64,
    timestamp: &DateTime<Utc>,
    bpm: i64,
    prev_hash: Option<&BlockHash>,
) -> BlockHash {
    let timestamp = canonical_timestamp(timestamp);
    let mut hasher = Hasher::new();
    hasher
        .update(&index.to_le_bytes())
        .update(&(timestamp.len() as u64).to_le_bytes())
        .update(timestamp.as_bytes())
        .update(&bpm.to_le_bytes());
    match prev_hash {
        Some(hash) => hasher.update(&[1]).update(hash.as_bytes()),
        None => hasher.update(&[0]),
    };
    BlockHash(hasher.finalize())
}
