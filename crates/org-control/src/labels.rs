//! # Pull Request Labels
//!
//! Wire spellings of the labels this tool manages. The PR type is a closed
//! set of variants; category labels are free-form strings derived from
//! reviewer teams.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Prefix shared by all category labels
pub const CATEGORY_PREFIX: &str = "category: ";

/// Type of a pull request by author affiliation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PrType {
    /// Author is outside the organization and has no affiliation signal
    External,
    /// Author is outside the organization but has an affiliated email or company
    AffiliatedExternal,
    /// Author is a member of the controlling organization
    OrgMember,
    /// More than one type label is present on the PR
    Conflict,
}

impl PrType {
    /// All variants, in a stable order
    pub const ALL: [Self; 4] = [
        Self::External,
        Self::AffiliatedExternal,
        Self::OrgMember,
        Self::Conflict,
    ];

    /// Label string as stored on GitHub
    pub const fn label(self) -> &'static str {
        match self {
            Self::External => "ExternalPR",
            Self::AffiliatedExternal => "ExternalIntelPR",
            Self::OrgMember => "OpenvinoPR",
            Self::Conflict => "BadPR",
        }
    }

    /// Map a GitHub label back to its PR type, if it is one
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.label() == label)
    }
}

impl fmt::Display for PrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PrType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s).ok_or_else(|| format!("'{s}' is not a PR type label"))
    }
}

/// Build a category label such as `category: ci`
pub fn category_label(category: &str) -> String {
    format!("{CATEGORY_PREFIX}{}", category.trim())
}
