//! Wire types for the signature endpoints.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Identifier of a stored signature. The API hands these out as opaque strings
/// or integers; both deserialize here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RecordId(SmolStr);

impl RecordId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(SmolStr::new(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<u64> for RecordId {
    fn from(n: u64) -> Self {
        Self(smol_str::format_smolstr!("{n}"))
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(SmolStr),
            Number(u64),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => Self(s),
            Raw::Number(n) => n.into(),
        })
    }
}

/// A signature as the API returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureRecord {
    pub id: RecordId,
    #[serde(default)]
    pub name: String,
    /// Stored markup. Absent for records that never had content.
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

/// Body of an update or create request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignaturePayload {
    pub name: String,
    pub content: String,
    pub is_default: bool,
}
