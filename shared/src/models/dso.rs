//! Content object references
//!
//! 容器层级：Community → Collection → Item → Bitstream

use super::ParseModelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Content object type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DsoType {
    Bitstream,
    Item,
    Collection,
    Community,
}

impl DsoType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            DsoType::Bitstream => "BITSTREAM",
            DsoType::Item => "ITEM",
            DsoType::Collection => "COLLECTION",
            DsoType::Community => "COMMUNITY",
        }
    }
}

impl fmt::Display for DsoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DsoType {
    type Err = ParseModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BITSTREAM" => Ok(DsoType::Bitstream),
            "ITEM" => Ok(DsoType::Item),
            "COLLECTION" => Ok(DsoType::Collection),
            "COMMUNITY" => Ok(DsoType::Community),
            other => Err(ParseModelError::UnknownType(other.to_string())),
        }
    }
}

/// Typed object reference, written `TYPE.ID`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DsoRef {
    pub kind: DsoType,
    pub id: u64,
}

impl DsoRef {
    pub const fn new(kind: DsoType, id: u64) -> Self {
        Self { kind, id }
    }

    pub const fn bitstream(id: u64) -> Self {
        Self::new(DsoType::Bitstream, id)
    }

    /// Bitstreams hold no other objects
    pub fn is_container(&self) -> bool {
        self.kind != DsoType::Bitstream
    }

    /// Storage key, e.g. `ITEM.12`
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DsoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.kind, self.id)
    }
}

impl FromStr for DsoRef {
    type Err = ParseModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .trim()
            .split_once('.')
            .ok_or_else(|| ParseModelError::InvalidReference(s.to_string()))?;
        let kind: DsoType = kind.parse()?;
        let id = id
            .parse::<u64>()
            .map_err(|_| ParseModelError::InvalidReference(s.to_string()))?;
        Ok(Self { kind, id })
    }
}

/// Stored object record with its owning container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DsoRecord {
    pub object: DsoRef,
    /// Persistent identifier, e.g. `123456789/42` (containers only)
    pub handle: Option<String>,
    /// Owning container, `None` for top-level communities
    pub parent: Option<DsoRef>,
}
