//! # Labeling Run
//!
//! Drives one pass over a set of pull requests: classify the author, map the
//! requested reviewer teams to category labels, add whatever is missing, and
//! collect the non-member authors for the closing summary.
//!
//! PRs are independent, so up to `WORKERS` of them are processed at once.
//! Outcomes are yielded in input order and folded into the [`RunSummary`]
//! afterwards; the summary is the only cross-PR state.

use std::collections::BTreeSet;
use std::fmt;
use std::pin::pin;

use anyhow::Result;
use chrono::{DateTime, TimeDelta, Utc};
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::classify::{AffiliationClassifier, Classification, ExistingType, Identity};
use crate::config::Config;
use crate::error::ConfigError;
use crate::github::{GithubApi, PrState, PullRequest};
use crate::labels::PrType;
use crate::reconcile::{ApplyOutcome, LabelPlan, LabelReconciler};
use crate::teams::TeamLabelMapper;

/// Which pull requests a run covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// One PR by number
    Single(u64),
    /// Every PR in a state
    State(PrState),
}

/// Oldest creation time still processed when only PRs newer than `minutes`
/// are wanted. PRs created at or before it are ignored.
pub fn created_after(now: DateTime<Utc>, minutes: u64) -> DateTime<Utc> {
    i64::try_from(minutes)
        .ok()
        .and_then(TimeDelta::try_minutes)
        .and_then(|delta| now.checked_sub_signed(delta))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Everything decided for one processed pull request
#[derive(Debug, Clone)]
pub struct PrReport {
    pub pr: PullRequest,
    pub identity: Identity,
    pub classification: Classification,
    pub plan: LabelPlan,
    pub outcome: ApplyOutcome,
}

/// Result of visiting one pull request
#[derive(Debug, Clone)]
pub enum PrOutcome {
    /// Older than the recency cutoff
    Ignored(PullRequest),
    /// Classified and reconciled
    Processed(Box<PrReport>),
    /// A GitHub call failed; the run went on without this PR
    Failed { pr: PullRequest, error: String },
}

/// Totals and non-member authors across a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub processed: usize,
    pub ignored: usize,
    /// PRs whose labels were written
    pub labeled: usize,
    /// PRs that need labels but were left alone by a dry run
    pub would_label: usize,
    pub failed: usize,
    /// PRs carrying more than one type label
    pub conflicts: Vec<u64>,
    /// Non-members with an affiliated email or company
    pub affiliated_external: BTreeSet<Identity>,
    /// Non-members without any affiliation signal
    pub external: BTreeSet<Identity>,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &PrOutcome) {
        self.total += 1;
        match outcome {
            PrOutcome::Ignored(_) => self.ignored += 1,
            PrOutcome::Failed { .. } => self.failed += 1,
            PrOutcome::Processed(report) => {
                self.processed += 1;
                match report.outcome {
                    ApplyOutcome::Applied => self.labeled += 1,
                    ApplyOutcome::DryRun => self.would_label += 1,
                    ApplyOutcome::Unchanged => {}
                }
                if report.classification.existing.is_conflict() {
                    self.conflicts.push(report.pr.number);
                }
                match report.classification.verdict {
                    PrType::AffiliatedExternal => {
                        self.affiliated_external.insert(report.identity.clone());
                    }
                    PrType::External => {
                        self.external.insert(report.identity.clone());
                    }
                    PrType::OrgMember | PrType::Conflict => {}
                }
            }
        }
    }
}

/// Runs classification and reconciliation over pull requests
pub struct Orchestrator<'a, G: ?Sized> {
    api: &'a G,
    classifier: AffiliationClassifier,
    mapper: TeamLabelMapper,
    reconciler: LabelReconciler,
    workers: usize,
}

impl<'a, G> Orchestrator<'a, G>
where
    G: GithubApi + ?Sized,
{
    pub fn new(config: &Config, api: &'a G) -> Result<Self, ConfigError> {
        Ok(Self {
            api,
            classifier: AffiliationClassifier::new(
                config.affiliation().clone(),
                config.label_org_member_prs(),
            ),
            mapper: TeamLabelMapper::from_config(config)?,
            reconciler: LabelReconciler::new(config.dry_run()),
            workers: config.workers(),
        })
    }

    /// Fetch the pull requests a selection covers
    pub async fn collect(&self, selection: Selection) -> Result<Vec<PullRequest>> {
        match selection {
            Selection::Single(number) => Ok(vec![self.api.get_pull_request(number).await?]),
            Selection::State(state) => self.api.list_pull_requests(state).await,
        }
    }

    /// Classify one PR and add its missing labels
    pub async fn process(&self, pr: PullRequest) -> Result<PrReport> {
        let login = pr.author.as_str();
        let (identity, org_member, teams) = tokio::try_join!(
            self.api.identity(login),
            self.api.is_org_member(login),
            self.api.requested_teams(&pr),
        )?;
        let identity = identity.with_org_member(org_member);

        let classification = self.classifier.classify(&identity, &pr.labels);
        if let ExistingType::Conflict(types) = &classification.existing {
            warn!(pr = pr.number, ?types, "Duplicated type labels");
        }

        let categories = self.mapper.category_labels(&pr.labels, &teams);
        let plan = self
            .reconciler
            .plan(&pr.labels, classification.pending, &categories);
        let outcome = self.reconciler.apply(self.api, pr.number, &plan).await?;

        Ok(PrReport {
            pr,
            identity,
            classification,
            plan,
            outcome,
        })
    }

    async fn visit(&self, pr: PullRequest, cutoff: Option<DateTime<Utc>>) -> PrOutcome {
        if cutoff.is_some_and(|after| pr.created_at <= after) {
            return PrOutcome::Ignored(pr);
        }
        match self.process(pr.clone()).await {
            Ok(report) => PrOutcome::Processed(Box::new(report)),
            Err(e) => {
                warn!(pr = pr.number, error = %e, "Failed to process PR");
                PrOutcome::Failed {
                    pr,
                    error: format!("{e:#}"),
                }
            }
        }
    }

    /// Process every selected PR, handing each outcome to `on_outcome` in
    /// selection order.
    ///
    /// Only a failure to fetch the selection aborts the run.
    pub async fn run<F>(
        &self,
        selection: Selection,
        cutoff: Option<DateTime<Utc>>,
        on_outcome: F,
    ) -> Result<RunSummary>
    where
        F: FnMut(&PrOutcome),
    {
        let pulls = self.collect(selection).await?;
        Ok(self.process_all(pulls, cutoff, on_outcome).await)
    }

    /// Process already fetched PRs; see [`Orchestrator::run`]
    pub async fn process_all<F>(
        &self,
        pulls: Vec<PullRequest>,
        cutoff: Option<DateTime<Utc>>,
        mut on_outcome: F,
    ) -> RunSummary
    where
        F: FnMut(&PrOutcome),
    {
        info!(count = pulls.len(), workers = self.workers, "Processing pull requests");

        let mut outcomes = pin!(stream::iter(pulls)
            .map(|pr| self.visit(pr, cutoff))
            .buffered(self.workers));

        let mut summary = RunSummary::default();
        while let Some(outcome) = outcomes.next().await {
            on_outcome(&outcome);
            summary.record(&outcome);
        }

        info!(
            total = summary.total,
            processed = summary.processed,
            labeled = summary.labeled,
            would_label = summary.would_label,
            failed = summary.failed,
            "Run complete"
        );
        summary
    }
}

fn verdict_description(verdict: PrType) -> &'static str {
    match verdict {
        PrType::OrgMember => "Org user",
        PrType::AffiliatedExternal => "Non org user with affiliated email or company",
        PrType::External | PrType::Conflict => "Non org user with NO affiliated email or company",
    }
}

fn join<'a>(items: impl IntoIterator<Item = &'a String>) -> String {
    items
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for PrOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ignored(pr) => write!(f, "IGNORE: {pr} - Created: {}", pr.created_at),
            Self::Failed { pr, error } => write!(f, "FAILED: {pr} - {error}"),
            Self::Processed(report) => {
                let PrReport {
                    pr,
                    identity,
                    classification,
                    plan,
                    outcome,
                } = report.as_ref();
                writeln!(
                    f,
                    "{pr} - Created: {} - Labels: {{{}}} - Type: {} - {}",
                    pr.created_at,
                    join(&pr.labels),
                    classification.existing,
                    verdict_description(classification.verdict)
                )?;
                if let Some(pending) = classification.pending {
                    writeln!(f, "NO \"{pending}\" label: {identity}")?;
                }
                match outcome {
                    ApplyOutcome::Unchanged => write!(f, "No labels to add"),
                    ApplyOutcome::DryRun => write!(
                        f,
                        "Labels would be added (dry run): {}",
                        join(&plan.to_add)
                    ),
                    ApplyOutcome::Applied => write!(f, "Set PR labels: {}", join(&plan.to_add)),
                }
            }
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Processed {} of {} PRs (ignored: {}, labeled: {}",
            self.processed, self.total, self.ignored, self.labeled
        )?;
        if self.would_label > 0 {
            write!(f, ", would label: {}", self.would_label)?;
        }
        writeln!(f, ", failed: {})", self.failed)?;
        if !self.conflicts.is_empty() {
            let numbers: Vec<_> = self.conflicts.iter().map(|n| format!("#{n}")).collect();
            writeln!(f, "PRs with duplicated type labels: {}", numbers.join(", "))?;
        }
        writeln!(f, "\nNon org user with affiliated email or company:")?;
        for identity in &self.affiliated_external {
            writeln!(f, "  {identity}")?;
        }
        writeln!(f, "\nNon org user with NO affiliated email or company:")?;
        for identity in &self.external {
            writeln!(f, "  {identity}")?;
        }
        Ok(())
    }
}
