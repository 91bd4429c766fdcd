use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use rand::RngCore;
use serde::{Serialize, Serializer};
use utoipa::openapi::schema::{ObjectBuilder, Schema, Type};
use utoipa::openapi::RefOr;

/// Length of the textual form of an [`ObjectId`].
pub const OBJECT_ID_HEX_LEN: usize = 24;

/// Document identifier: 12 bytes rendered as 24 lowercase hex characters.
///
/// The first four bytes hold the big-endian unix timestamp of creation, the
/// remaining eight are random. Ids therefore sort roughly by creation time.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 12]);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a 24-character hex identifier")]
pub struct InvalidObjectId(pub String);

impl ObjectId {
    /// Generate a fresh id stamped with the current time.
    pub fn new() -> Self {
        let mut bytes = [0u8; 12];
        let secs = Utc::now().timestamp().clamp(0, u32::MAX as i64) as u32;
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        rand::thread_rng().fill_bytes(&mut bytes[4..]);
        Self(bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Syntax check only; says nothing about whether the document exists.
    pub fn is_valid(raw: &str) -> bool {
        raw.len() == OBJECT_ID_HEX_LEN && raw.bytes().all(|b| b.is_ascii_hexdigit())
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for ObjectId {
    type Err = InvalidObjectId;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if !Self::is_valid(raw) {
            return Err(InvalidObjectId(raw.to_string()));
        }
        let mut bytes = [0u8; 12];
        hex::decode_to_slice(raw, &mut bytes).map_err(|_| InvalidObjectId(raw.to_string()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl utoipa::PartialSchema for ObjectId {
    fn schema() -> RefOr<Schema> {
        ObjectBuilder::new()
            .schema_type(Type::String)
            .min_length(Some(OBJECT_ID_HEX_LEN))
            .max_length(Some(OBJECT_ID_HEX_LEN))
            .pattern(Some("^[0-9a-fA-F]{24}$"))
            .into()
    }
}

impl utoipa::ToSchema for ObjectId {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_valid_hex() {
        let id = ObjectId::new();
        let hex = id.to_hex();
        assert_eq!(hex.len(), OBJECT_ID_HEX_LEN);
        assert!(ObjectId::is_valid(&hex));
        assert_eq!(hex.parse::<ObjectId>().unwrap(), id);
    }

    #[test]
    fn generated_ids_differ() {
        assert_ne!(ObjectId::new(), ObjectId::new());
    }

    #[test]
    fn parse_normalizes_uppercase() {
        let id: ObjectId = "6650F1C2A4B8E93D7C1F0A12".parse().unwrap();
        assert_eq!(id.to_string(), "6650f1c2a4b8e93d7c1f0a12");
    }

    #[test]
    fn parse_rejects_wrong_length_and_non_hex() {
        assert!("6650f1c2a4b8e93d7c1f0a1".parse::<ObjectId>().is_err());
        assert!("6650f1c2a4b8e93d7c1f0a123".parse::<ObjectId>().is_err());
        assert!("zz50f1c2a4b8e93d7c1f0a12".parse::<ObjectId>().is_err());
        assert!("".parse::<ObjectId>().is_err());
    }

    #[test]
    fn serializes_as_plain_string() {
        let id: ObjectId = "6650f1c2a4b8e93d7c1f0a12".parse().unwrap();
        assert_eq!(
            serde_json::to_value(id).unwrap(),
            serde_json::json!("6650f1c2a4b8e93d7c1f0a12")
        );
    }
}
