//! # Affiliation Classification
//!
//! Decides which PR type label a submitter deserves and compares it with the
//! type labels already on the pull request. Pure logic, no I/O.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::labels::PrType;

/// What is known about a PR author
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// GitHub login
    pub login: String,

    /// Public email, if the user exposes one
    #[serde(default)]
    pub email: Option<String>,

    /// Declared company, if any
    #[serde(default)]
    pub company: Option<String>,

    /// Member of the controlling organization
    #[serde(default)]
    pub org_member: bool,
}

impl Identity {
    pub fn new(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            email: None,
            company: None,
            org_member: false,
        }
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = Some(company.into());
        self
    }

    #[must_use]
    pub fn with_org_member(mut self, org_member: bool) -> Self {
        self.org_member = org_member;
        self
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} - {}",
            self.login,
            self.email.as_deref().unwrap_or("-"),
            self.company.as_deref().unwrap_or("-")
        )
    }
}

/// Signals that mark a non-member as affiliated with the organization
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AffiliationPolicy {
    email_domains: Vec<String>,
    companies: Vec<String>,
}

impl AffiliationPolicy {
    pub fn new(email_domains: Vec<String>, companies: Vec<String>) -> Self {
        Self {
            email_domains: email_domains
                .into_iter()
                .map(|d| d.trim_start_matches('@').to_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
            companies: companies
                .into_iter()
                .map(|c| c.trim().to_lowercase())
                .filter(|c| !c.is_empty())
                .collect(),
        }
    }

    /// Email ends with `@<domain>` for a configured domain
    pub fn is_affiliated_email(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        self.email_domains
            .iter()
            .any(|domain| email.ends_with(&format!("@{domain}")))
    }

    /// Company contains a configured name
    pub fn is_affiliated_company(&self, company: &str) -> bool {
        let company = company.to_lowercase();
        self.companies.iter().any(|c| company.contains(c.as_str()))
    }

    pub fn is_affiliated(&self, identity: &Identity) -> bool {
        identity
            .email
            .as_deref()
            .is_some_and(|e| self.is_affiliated_email(e))
            || identity
                .company
                .as_deref()
                .is_some_and(|c| self.is_affiliated_company(c))
    }
}

/// PR type labels already present on a pull request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExistingType {
    /// No type label
    Missing,
    /// Exactly one type label
    Single(PrType),
    /// Two or more type labels; left for a maintainer to fix
    Conflict(BTreeSet<PrType>),
}

impl ExistingType {
    pub fn from_labels<'a>(labels: impl IntoIterator<Item = &'a String>) -> Self {
        let found: BTreeSet<PrType> = labels
            .into_iter()
            .filter_map(|l| PrType::from_label(l))
            .collect();
        let mut iter = found.iter().copied();
        match (iter.next(), iter.next()) {
            (None, _) => Self::Missing,
            (Some(only), None) => Self::Single(only),
            _ => Self::Conflict(found),
        }
    }

    /// The effective type: `Conflict` when several are present
    pub fn pr_type(&self) -> Option<PrType> {
        match self {
            Self::Missing => None,
            Self::Single(t) => Some(*t),
            Self::Conflict(_) => Some(PrType::Conflict),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl fmt::Display for ExistingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("None"),
            Self::Single(t) => write!(f, "{t}"),
            Self::Conflict(types) => {
                let labels: Vec<_> = types.iter().map(|t| t.label()).collect();
                write!(f, "{} ({})", PrType::Conflict, labels.join(", "))
            }
        }
    }
}

/// Outcome of classifying one pull request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Type the author deserves
    pub verdict: PrType,
    /// Type labels found on the PR
    pub existing: ExistingType,
    /// Type label to add, if missing
    pub pending: Option<PrType>,
}

/// Classifies PR authors into one [`PrType`]
#[derive(Debug, Clone)]
pub struct AffiliationClassifier {
    policy: AffiliationPolicy,
    label_org_members: bool,
}

impl AffiliationClassifier {
    pub fn new(policy: AffiliationPolicy, label_org_members: bool) -> Self {
        Self {
            policy,
            label_org_members,
        }
    }

    /// Type of the author alone, ignoring labels
    pub fn verdict(&self, identity: &Identity) -> PrType {
        if identity.org_member {
            PrType::OrgMember
        } else if self.policy.is_affiliated(identity) {
            PrType::AffiliatedExternal
        } else {
            PrType::External
        }
    }

    /// Classify the author and compare against the PR's current labels
    pub fn classify(&self, identity: &Identity, labels: &BTreeSet<String>) -> Classification {
        let verdict = self.verdict(identity);
        let existing = ExistingType::from_labels(labels);
        let wanted = verdict != PrType::OrgMember || self.label_org_members;
        let pending = (wanted && !labels.contains(verdict.label())).then_some(verdict);

        Classification {
            verdict,
            existing,
            pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> AffiliationPolicy {
        AffiliationPolicy::new(vec!["intel.com".to_string()], vec!["intel".to_string()])
    }

    fn labels(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_affiliated_email_matches_domain_suffix() {
        let p = policy();
        assert!(p.is_affiliated_email("dev@intel.com"));
        assert!(p.is_affiliated_email("Dev@Intel.COM"));
        assert!(!p.is_affiliated_email("dev@notintel.com"));
        assert!(!p.is_affiliated_email("dev@intel.com.evil.org"));
    }

    #[test]
    fn test_affiliated_company_is_substring() {
        let p = policy();
        assert!(p.is_affiliated_company("Intel Corporation"));
        assert!(p.is_affiliated_company("@intel"));
        assert!(!p.is_affiliated_company("Acme"));
    }

    #[test]
    fn test_domain_with_at_sign_is_normalized() {
        let p = AffiliationPolicy::new(vec!["@example.org".to_string()], vec![]);
        assert!(p.is_affiliated_email("a@example.org"));
    }

    #[test]
    fn test_verdict_order() {
        let c = AffiliationClassifier::new(policy(), true);
        let member = Identity::new("a").with_email("a@intel.com").with_org_member(true);
        assert_eq!(c.verdict(&member), PrType::OrgMember);

        let affiliated = Identity::new("b").with_company("Intel");
        assert_eq!(c.verdict(&affiliated), PrType::AffiliatedExternal);

        let external = Identity::new("c");
        assert_eq!(c.verdict(&external), PrType::External);
    }

    #[test]
    fn test_existing_type_detection() {
        assert_eq!(ExistingType::from_labels(&labels(&["bug"])), ExistingType::Missing);
        assert_eq!(
            ExistingType::from_labels(&labels(&["ExternalPR", "bug"])),
            ExistingType::Single(PrType::External)
        );

        let conflict = ExistingType::from_labels(&labels(&["ExternalPR", "OpenvinoPR"]));
        assert!(conflict.is_conflict());
        assert_eq!(conflict.pr_type(), Some(PrType::Conflict));
    }

    #[test]
    fn test_single_conflict_label_is_not_a_conflict() {
        let existing = ExistingType::from_labels(&labels(&["BadPR"]));
        assert_eq!(existing, ExistingType::Single(PrType::Conflict));
        assert!(!existing.is_conflict());
    }

    #[test]
    fn test_pending_label_when_missing() {
        let c = AffiliationClassifier::new(policy(), true);
        let result = c.classify(&Identity::new("x"), &labels(&[]));
        assert_eq!(result.verdict, PrType::External);
        assert_eq!(result.pending, Some(PrType::External));
        assert_eq!(result.existing, ExistingType::Missing);
    }

    #[test]
    fn test_no_pending_label_when_present() {
        let c = AffiliationClassifier::new(policy(), true);
        let result = c.classify(&Identity::new("x"), &labels(&["ExternalPR"]));
        assert_eq!(result.pending, None);
    }

    #[test]
    fn test_conflict_does_not_suppress_new_label() {
        let c = AffiliationClassifier::new(policy(), true);
        let identity = Identity::new("x").with_email("x@intel.com");
        let result = c.classify(&identity, &labels(&["ExternalPR", "OpenvinoPR"]));
        assert!(result.existing.is_conflict());
        assert_eq!(result.pending, Some(PrType::AffiliatedExternal));
    }

    #[test]
    fn test_org_member_label_can_be_disabled() {
        let c = AffiliationClassifier::new(policy(), false);
        let member = Identity::new("m").with_org_member(true);
        let result = c.classify(&member, &labels(&[]));
        assert_eq!(result.verdict, PrType::OrgMember);
        assert_eq!(result.pending, None);
    }

    #[test]
    fn test_identity_display() {
        let identity = Identity::new("octo").with_email("octo@example.com");
        assert_eq!(identity.to_string(), "octo - octo@example.com - -");
    }
}
