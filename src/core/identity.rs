//! Record identity system using type-prefixed ULIDs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use ulid::Ulid;

/// Record type prefixes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordPrefix {
    /// User document (one wizard run toward one generated document)
    Doc,
    /// Wizard session (resumption record)
    Ses,
    /// Clause audit trail entry
    Aud,
    /// Clause changelog entry
    Chg,
}

impl RecordPrefix {
    /// Get the string representation of the prefix
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordPrefix::Doc => "DOC",
            RecordPrefix::Ses => "SES",
            RecordPrefix::Aud => "AUD",
            RecordPrefix::Chg => "CHG",
        }
    }

    /// Get all valid prefixes
    pub fn all() -> &'static [RecordPrefix] {
        &[
            RecordPrefix::Doc,
            RecordPrefix::Ses,
            RecordPrefix::Aud,
            RecordPrefix::Chg,
        ]
    }
}

impl fmt::Display for RecordPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RecordPrefix {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "DOC" => Ok(RecordPrefix::Doc),
            "SES" => Ok(RecordPrefix::Ses),
            "AUD" => Ok(RecordPrefix::Aud),
            "CHG" => Ok(RecordPrefix::Chg),
            _ => Err(IdParseError::InvalidPrefix(s.to_string())),
        }
    }
}

/// A storage key combining a type prefix and ULID.
///
/// These are the only identifiers used to address stored records. The
/// human-facing case number printed on a document is separate and carries no
/// uniqueness guarantee.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId {
    prefix: RecordPrefix,
    ulid: Ulid,
}

impl RecordId {
    /// Create a new RecordId with the given prefix
    pub fn new(prefix: RecordPrefix) -> Self {
        Self {
            prefix,
            ulid: Ulid::new(),
        }
    }

    pub fn from_parts(prefix: RecordPrefix, ulid: Ulid) -> Self {
        Self { prefix, ulid }
    }

    pub fn prefix(&self) -> RecordPrefix {
        self.prefix
    }

    pub fn ulid(&self) -> Ulid {
        self.ulid
    }

    /// Parse a RecordId, requiring a specific prefix
    pub fn parse_as(s: &str, expected: RecordPrefix) -> Result<Self, IdParseError> {
        let id: RecordId = s.parse()?;
        if id.prefix != expected {
            return Err(IdParseError::WrongPrefix {
                expected,
                found: id.prefix,
            });
        }
        Ok(id)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.prefix, self.ulid)
    }
}

impl FromStr for RecordId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix_str, ulid_str) = s
            .split_once('-')
            .ok_or_else(|| IdParseError::MissingDelimiter(s.to_string()))?;

        let prefix = prefix_str.parse()?;
        let ulid = Ulid::from_string(ulid_str)
            .map_err(|e| IdParseError::InvalidUlid(ulid_str.to_string(), e.to_string()))?;

        Ok(Self { prefix, ulid })
    }
}

impl Serialize for RecordId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors that can occur when parsing record IDs
#[derive(Debug, Error)]
pub enum IdParseError {
    #[error("invalid record prefix: '{0}' (valid: DOC, SES, AUD, CHG)")]
    InvalidPrefix(String),

    #[error("missing '-' delimiter in record ID: '{0}'")]
    MissingDelimiter(String),

    #[error("invalid ULID '{0}': {1}")]
    InvalidUlid(String, String),

    #[error("expected a {expected} identifier, got {found}")]
    WrongPrefix {
        expected: RecordPrefix,
        found: RecordPrefix,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_generation() {
        let id = RecordId::new(RecordPrefix::Doc);
        assert!(id.to_string().starts_with("DOC-"));
        assert_eq!(id.to_string().len(), 30);
    }

    #[test]
    fn test_record_id_parsing() {
        let original = RecordId::new(RecordPrefix::Ses);
        let parsed: RecordId = original.to_string().parse().unwrap();
        assert_eq!(parsed.prefix(), RecordPrefix::Ses);
        assert_eq!(original, parsed);
    }

    #[test]
    fn test_record_id_invalid_prefix() {
        let err = "XXX-01HQ3K4N5M6P7R8S9T0UVWXYZ".parse::<RecordId>().unwrap_err();
        assert!(matches!(err, IdParseError::InvalidPrefix(_)));
    }

    #[test]
    fn test_record_id_missing_delimiter() {
        let err = "DOC01HQ3K4N5M6P7R8S9T0UVWXYZ".parse::<RecordId>().unwrap_err();
        assert!(matches!(err, IdParseError::MissingDelimiter(_)));
    }

    #[test]
    fn test_record_id_invalid_ulid() {
        let err = "DOC-notaulid".parse::<RecordId>().unwrap_err();
        assert!(matches!(err, IdParseError::InvalidUlid(_, _)));
    }

    #[test]
    fn test_parse_as_rejects_other_prefix() {
        let id = RecordId::new(RecordPrefix::Ses);
        let err = RecordId::parse_as(&id.to_string(), RecordPrefix::Doc).unwrap_err();
        assert!(matches!(err, IdParseError::WrongPrefix { .. }));
    }

    #[test]
    fn test_ids_sort_by_creation_time() {
        let first = RecordId::from_parts(RecordPrefix::Doc, Ulid::from_parts(1, 0));
        let second = RecordId::from_parts(RecordPrefix::Doc, Ulid::from_parts(2, 0));
        assert!(first < second);
    }

    #[test]
    fn test_ids_group_by_prefix_in_btree() {
        let doc = RecordId::from_parts(RecordPrefix::Doc, Ulid::from_parts(9, 0));
        let ses = RecordId::from_parts(RecordPrefix::Ses, Ulid::from_parts(1, 0));
        let ids: std::collections::BTreeSet<_> = [ses.clone(), doc.clone()].into_iter().collect();
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec![doc, ses]);
        assert!(RecordPrefix::Doc < RecordPrefix::Chg);
    }
}
