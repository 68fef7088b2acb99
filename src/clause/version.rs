//! Semantic version numbers and the enums of clause version control

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// `major.minor.patch`, ordered numerically
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClauseVersionNumber {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ClauseVersionNumber {
    pub const INITIAL: ClauseVersionNumber = ClauseVersionNumber {
        major: 1,
        minor: 0,
        patch: 0,
    };

    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Next version for a change of the given type, `None` when the
    /// component to increment is already at its maximum
    pub fn bump(self, change: ChangeType) -> Option<Self> {
        match change {
            ChangeType::BreakingChange => Some(Self::new(self.major.checked_add(1)?, 0, 0)),
            ChangeType::Feature | ChangeType::LegalUpdate => {
                Some(Self::new(self.major, self.minor.checked_add(1)?, 0))
            }
            ChangeType::Bugfix => Some(Self::new(self.major, self.minor, self.patch.checked_add(1)?)),
        }
    }
}

impl fmt::Display for ClauseVersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for ClauseVersionNumber {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches(['v', 'V']);
        let parts: Vec<&str> = trimmed.split('.').collect();
        if parts.len() != 3 {
            return Err(format!("Invalid version '{}': expected major.minor.patch", s));
        }
        let mut numbers = [0u32; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| format!("Invalid version '{}': '{}' is not a number", s, part))?;
        }
        Ok(Self::new(numbers[0], numbers[1], numbers[2]))
    }
}

impl Serialize for ClauseVersionNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ClauseVersionNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Lifecycle of one clause version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VersionStatus {
    #[default]
    Draft,
    Review,
    Approved,
    Active,
    Deprecated,
    Archived,
}

impl fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VersionStatus::Draft => "DRAFT",
            VersionStatus::Review => "REVIEW",
            VersionStatus::Approved => "APPROVED",
            VersionStatus::Active => "ACTIVE",
            VersionStatus::Deprecated => "DEPRECATED",
            VersionStatus::Archived => "ARCHIVED",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for VersionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(VersionStatus::Draft),
            "review" => Ok(VersionStatus::Review),
            "approved" => Ok(VersionStatus::Approved),
            "active" => Ok(VersionStatus::Active),
            "deprecated" => Ok(VersionStatus::Deprecated),
            "archived" => Ok(VersionStatus::Archived),
            _ => Err(format!("Unknown version status: {}", s)),
        }
    }
}

/// Nature of a change, which decides the version bump
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    BreakingChange,
    Feature,
    LegalUpdate,
    Bugfix,
}

impl ChangeType {
    /// Impact recorded in the changelog for this kind of change
    pub fn impact(self) -> ImpactLevel {
        match self {
            ChangeType::BreakingChange => ImpactLevel::High,
            ChangeType::Feature | ChangeType::LegalUpdate => ImpactLevel::Medium,
            ChangeType::Bugfix => ImpactLevel::Low,
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeType::BreakingChange => "BREAKING_CHANGE",
            ChangeType::Feature => "FEATURE",
            ChangeType::LegalUpdate => "LEGAL_UPDATE",
            ChangeType::Bugfix => "BUGFIX",
        };
        write!(f, "{}", s)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImpactLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for ImpactLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ImpactLevel::Low => "LOW",
            ImpactLevel::Medium => "MEDIUM",
            ImpactLevel::High => "HIGH",
            ImpactLevel::Critical => "CRITICAL",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for ImpactLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(ImpactLevel::Low),
            "medium" => Ok(ImpactLevel::Medium),
            "high" => Ok(ImpactLevel::High),
            "critical" => Ok(ImpactLevel::Critical),
            _ => Err(format!("Unknown impact level: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Create,
    Activate,
    Deprecate,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AuditAction::Create => "CREATE",
            AuditAction::Activate => "ACTIVATE",
            AuditAction::Deprecate => "DEPRECATE",
        };
        write!(f, "{}", s)
    }
}

/// Effort of moving documents from one version to another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MigrationComplexity {
    Trivial,
    Simple,
    Moderate,
    Complex,
    Major,
}

impl fmt::Display for MigrationComplexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MigrationComplexity::Trivial => "TRIVIAL",
            MigrationComplexity::Simple => "SIMPLE",
            MigrationComplexity::Moderate => "MODERATE",
            MigrationComplexity::Complex => "COMPLEX",
            MigrationComplexity::Major => "MAJOR",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DifferenceType {
    Addition,
    Removal,
    Modification,
}

impl fmt::Display for DifferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DifferenceType::Addition => "ADDITION",
            DifferenceType::Removal => "REMOVAL",
            DifferenceType::Modification => "MODIFICATION",
        };
        write!(f, "{}", s)
    }
}
