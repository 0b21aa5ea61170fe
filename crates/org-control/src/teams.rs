//! # Reviewer Team Labels
//!
//! Maps requested reviewer teams to `category: <name>` labels, either from the
//! `<repo>-<category>-maintainers` naming convention or from an explicit
//! team → label table.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use regex::Regex;

use crate::config::{Config, GITHUB_REPO};
use crate::error::ConfigError;
use crate::labels::category_label;

/// Team names containing this marker map to the CI category
const ADMINS_MARKER: &str = "admins";

/// Category used for admin teams
const ADMINS_CATEGORY: &str = "ci";

/// Which mapping strategy derives category labels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TeamLabelStrategy {
    /// Explicit team → label table only
    #[default]
    Map,
    /// Team naming convention only
    Pattern,
    /// Table first, naming convention as fallback
    Both,
}

impl FromStr for TeamLabelStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "map" => Ok(Self::Map),
            "pattern" => Ok(Self::Pattern),
            "both" => Ok(Self::Both),
            other => Err(format!("unknown strategy '{other}', use: map, pattern, both")),
        }
    }
}

impl fmt::Display for TeamLabelStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Map => "map",
            Self::Pattern => "pattern",
            Self::Both => "both",
        })
    }
}

/// Derives category labels from reviewer team names
#[derive(Debug, Clone)]
pub struct TeamLabelMapper {
    maintainers_re: Regex,
    team_to_label: BTreeMap<String, String>,
    strategy: TeamLabelStrategy,
}

impl TeamLabelMapper {
    pub fn new(
        repo: &str,
        team_to_label: BTreeMap<String, String>,
        strategy: TeamLabelStrategy,
    ) -> Result<Self, ConfigError> {
        let maintainers_re = Regex::new(&format!(r"^{}-(.+)-maintainers", regex::escape(repo)))
            .map_err(|e| ConfigError::InvalidValue {
                name: GITHUB_REPO.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            maintainers_re,
            team_to_label,
            strategy,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Self::new(
            config.github_repo(),
            config.team_to_label().clone(),
            config.team_label_strategy(),
        )
    }

    pub fn strategy(&self) -> TeamLabelStrategy {
        self.strategy
    }

    /// Label from the team naming convention
    pub fn label_by_pattern(&self, team: &str) -> Option<String> {
        if team.contains(ADMINS_MARKER) {
            return Some(category_label(ADMINS_CATEGORY));
        }
        self.maintainers_re
            .captures(team)
            .and_then(|caps| caps.get(1))
            .map(|category| category.as_str().trim())
            .filter(|category| !category.is_empty())
            .map(category_label)
    }

    /// Label from the explicit table
    pub fn label_by_map(&self, team: &str) -> Option<String> {
        self.team_to_label
            .get(team)
            .filter(|label| !label.is_empty())
            .cloned()
    }

    /// Label for a team under the configured strategy
    pub fn label_for(&self, team: &str) -> Option<String> {
        match self.strategy {
            TeamLabelStrategy::Map => self.label_by_map(team),
            TeamLabelStrategy::Pattern => self.label_by_pattern(team),
            TeamLabelStrategy::Both => self
                .label_by_map(team)
                .or_else(|| self.label_by_pattern(team)),
        }
    }

    /// Category labels for all requested teams that the PR does not carry yet.
    ///
    /// Keeps the order of `teams` and drops duplicates.
    pub fn category_labels<'a>(
        &self,
        current: &BTreeSet<String>,
        teams: impl IntoIterator<Item = &'a String>,
    ) -> Vec<String> {
        let mut seen = BTreeSet::new();
        teams
            .into_iter()
            .filter_map(|team| self.label_for(team))
            .filter(|label| !current.contains(label))
            .filter(|label| seen.insert(label.clone()))
            .collect()
    }
}
