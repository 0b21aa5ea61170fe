//! # org-control
//!
//! Keeps pull request provenance and routing labels accurate on a GitHub
//! repository.
//!
//! For every pull request the run:
//!
//! - **Classifies** the author as an organization member, an affiliated
//!   external contributor, or an external contributor, and adds the matching
//!   type label if it is missing
//! - **Maps** requested reviewer teams to `category: <name>` labels
//! - **Reports** PRs carrying more than one type label without touching them
//!
//! ## Quick Start
//!
//! ```no_run
//! use org_control::{config, GhClient, Orchestrator, PrState, Selection};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = config::init("config.json", &[])?;
//! let client = GhClient::from_config(config);
//! let orchestrator = Orchestrator::new(config, &client)?;
//!
//! let summary = orchestrator
//!     .run(Selection::State(PrState::Open), None, |outcome| println!("{outcome}"))
//!     .await?;
//! println!("{summary}");
//! # Ok(())
//! # }
//! ```
//!
//! All GitHub access goes through the [`GithubApi`] trait; [`GhClient`]
//! implements it with the `gh` CLI.

pub mod classify;
pub mod config;
pub mod error;
pub mod github;
pub mod labels;
pub mod orchestrator;
pub mod reconcile;
pub mod teams;

pub use classify::{AffiliationClassifier, AffiliationPolicy, Classification, ExistingType, Identity};
pub use config::Config;
pub use error::ConfigError;
pub use github::{GhClient, GithubApi, PrState, PullRequest};
pub use labels::{category_label, PrType, CATEGORY_PREFIX};
pub use orchestrator::{created_after, Orchestrator, PrOutcome, PrReport, RunSummary, Selection};
pub use reconcile::{ApplyOutcome, LabelPlan, LabelReconciler};
pub use teams::{TeamLabelMapper, TeamLabelStrategy};
