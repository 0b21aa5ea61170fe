//! # Label Reconciliation
//!
//! Turns the desired type and category labels into the minimal set of labels
//! to add, and writes them with at most one call per pull request.

use std::collections::BTreeSet;

use anyhow::Result;
use tracing::{debug, info};

use crate::github::GithubApi;
use crate::labels::PrType;

/// Labels to add to one pull request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelPlan {
    /// Labels missing from the PR, type label first
    pub to_add: Vec<String>,
}

impl LabelPlan {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty()
    }
}

/// What happened when a plan was applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Nothing to add; no call was made
    Unchanged,
    /// Labels computed but not written because of dry-run
    DryRun,
    /// Labels written
    Applied,
}

/// Computes and applies label additions
#[derive(Debug, Clone, Copy)]
pub struct LabelReconciler {
    dry_run: bool,
}

impl LabelReconciler {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Labels from `type_label` and `categories` that `current` lacks,
    /// without duplicates.
    pub fn plan(
        &self,
        current: &BTreeSet<String>,
        type_label: Option<PrType>,
        categories: &[String],
    ) -> LabelPlan {
        let mut seen = BTreeSet::new();
        let to_add = type_label
            .map(|t| t.label().to_string())
            .into_iter()
            .chain(categories.iter().cloned())
            .filter(|label| !current.contains(label) && seen.insert(label.clone()))
            .collect();
        LabelPlan { to_add }
    }

    /// Write the plan to GitHub unless it is empty or this is a dry run
    pub async fn apply<G>(&self, api: &G, number: u64, plan: &LabelPlan) -> Result<ApplyOutcome>
    where
        G: GithubApi + ?Sized,
    {
        if plan.is_empty() {
            debug!(pr = number, "No labels to add");
            return Ok(ApplyOutcome::Unchanged);
        }
        if self.dry_run {
            info!(pr = number, labels = ?plan.to_add, "Dry run, labels not written");
            return Ok(ApplyOutcome::DryRun);
        }

        api.add_labels(number, &plan.to_add).await?;
        info!(pr = number, labels = ?plan.to_add, "Labels added");
        Ok(ApplyOutcome::Applied)
    }
}
