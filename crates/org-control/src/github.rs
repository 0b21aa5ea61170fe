//! # GitHub Access
//!
//! The [`GithubApi`] trait is everything the labeling run needs from GitHub.
//! [`GhClient`] implements it on top of the `gh` CLI, so authentication and
//! proxy handling are whatever `gh` is configured with.
//!
//! ## Example
//!
//! ```no_run
//! use org_control::{GhClient, GithubApi, PrState};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = GhClient::new("openvinotoolkit", "openvino");
//! let pulls = client.list_pull_requests(PrState::Open).await?;
//! println!("{} open PRs", pulls.len());
//! # Ok(())
//! # }
//! ```

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::process::{Output, Stdio};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

use crate::classify::Identity;
use crate::config::Config;

/// Deadline for a single `gh api` call
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Attempts per call, first try included
const MAX_ATTEMPTS: u32 = 3;

/// Backoff unit; attempt `n` waits `n * RETRY_BACKOFF`
const RETRY_BACKOFF: Duration = Duration::from_secs(2);

/// Pull request state filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PrState {
    #[default]
    Open,
    Closed,
}

impl PrState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for PrState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pull request as seen at listing time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    /// PR number
    pub number: u64,

    /// Title
    #[serde(default)]
    pub title: String,

    /// Author login
    pub author: String,

    /// When the PR was opened
    pub created_at: DateTime<Utc>,

    /// Current labels
    #[serde(default)]
    pub labels: BTreeSet<String>,

    /// Requested reviewer teams, by name
    #[serde(default)]
    pub requested_teams: BTreeSet<String>,
}

impl fmt::Display for PullRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PR #{} \"{}\"", self.number, self.title)
    }
}

/// Operations the labeling run performs against GitHub
#[async_trait]
pub trait GithubApi: Send + Sync {
    /// All PRs in the given state
    async fn list_pull_requests(&self, state: PrState) -> Result<Vec<PullRequest>>;

    /// A single PR by number
    async fn get_pull_request(&self, number: u64) -> Result<PullRequest>;

    /// Names of the reviewer teams currently requested on a PR
    async fn requested_teams(&self, pr: &PullRequest) -> Result<BTreeSet<String>>;

    /// Add labels to a PR, keeping the ones it already has
    async fn add_labels(&self, number: u64, labels: &[String]) -> Result<()>;

    /// Whether `login` belongs to the controlling organization
    async fn is_org_member(&self, login: &str) -> Result<bool>;

    /// Profile data (email, company) for `login`
    async fn identity(&self, login: &str) -> Result<Identity>;
}

/// [`GithubApi`] backed by `gh api`
#[derive(Debug)]
pub struct GhClient {
    owner: String,
    repo: String,
    identities: Mutex<HashMap<String, Identity>>,
}

impl GhClient {
    /// Create a new client for `owner/repo`
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            identities: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.github_organization(), config.github_repo())
    }

    fn repo_path(&self) -> String {
        format!("repos/{}/{}", self.owner, self.repo)
    }

    /// Run `gh api <args>` with a deadline, retrying transient failures.
    ///
    /// Returns the output of the last attempt whether or not it succeeded.
    async fn api(&self, args: &[String]) -> Result<Output> {
        let mut attempt = 1;
        loop {
            let mut command = Command::new("gh");
            command
                .arg("api")
                .args(args)
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);

            let retry_reason = match timeout(REQUEST_TIMEOUT, command.output()).await {
                Ok(output) => {
                    let output = output.context("Failed to execute gh api")?;
                    if output.status.success() {
                        return Ok(output);
                    }
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    if !should_retry(attempt, &stderr) {
                        return Ok(output);
                    }
                    stderr.trim().to_string()
                }
                Err(_) if attempt < MAX_ATTEMPTS => "request timed out".to_string(),
                Err(_) => anyhow::bail!(
                    "gh api {} timed out after {}s",
                    args.first().map_or("", String::as_str),
                    REQUEST_TIMEOUT.as_secs()
                ),
            };

            warn!(attempt, reason = %retry_reason, "Transient gh api failure, retrying");
            sleep(RETRY_BACKOFF * attempt).await;
            attempt += 1;
        }
    }

    async fn api_json<T: DeserializeOwned>(&self, args: &[String]) -> Result<T> {
        let output = self.api(args).await?;
        ensure_success(&output, args)?;
        serde_json::from_slice(&output.stdout).context("Failed to parse gh api response")
    }

    /// Fetch every page of a list endpoint.
    ///
    /// `gh --paginate` prints one JSON array per page back to back.
    async fn api_paginated<T: DeserializeOwned>(&self, endpoint: String) -> Result<Vec<T>> {
        let args = vec![endpoint, "--paginate".to_string()];
        let output = self.api(&args).await?;
        ensure_success(&output, &args)?;

        let mut items = Vec::new();
        for page in serde_json::Deserializer::from_slice(&output.stdout).into_iter::<Vec<T>>() {
            items.extend(page.context("Failed to parse paginated gh api response")?);
        }
        Ok(items)
    }
}

#[async_trait]
impl GithubApi for GhClient {
    async fn list_pull_requests(&self, state: PrState) -> Result<Vec<PullRequest>> {
        info!(state = %state, "Listing pull requests");
        let raw: Vec<RawPull> = self
            .api_paginated(format!(
                "{}/pulls?state={}&per_page=100",
                self.repo_path(),
                state
            ))
            .await?;
        let pulls: Vec<PullRequest> = raw.into_iter().map(PullRequest::from).collect();
        info!(state = %state, count = pulls.len(), "Pull requests listed");
        Ok(pulls)
    }

    async fn get_pull_request(&self, number: u64) -> Result<PullRequest> {
        let raw: RawPull = self
            .api_json(&[format!("{}/pulls/{number}", self.repo_path())])
            .await
            .with_context(|| format!("Failed to fetch PR #{number}"))?;
        Ok(raw.into())
    }

    async fn requested_teams(&self, pr: &PullRequest) -> Result<BTreeSet<String>> {
        let raw: RawReviewRequests = self
            .api_json(&[format!(
                "{}/pulls/{}/requested_reviewers",
                self.repo_path(),
                pr.number
            )])
            .await
            .with_context(|| format!("Failed to fetch review requests for PR #{}", pr.number))?;
        Ok(raw.teams.into_iter().map(|t| t.name).collect())
    }

    async fn add_labels(&self, number: u64, labels: &[String]) -> Result<()> {
        let mut args = vec![
            format!("{}/issues/{number}/labels", self.repo_path()),
            "--method".to_string(),
            "POST".to_string(),
        ];
        for label in labels {
            args.push("-f".to_string());
            args.push(format!("labels[]={label}"));
        }

        let output = self.api(&args).await?;
        ensure_success(&output, &args)
            .with_context(|| format!("Failed to add labels to PR #{number}"))?;
        debug!(pr = number, ?labels, "Labels added");
        Ok(())
    }

    async fn is_org_member(&self, login: &str) -> Result<bool> {
        let args = vec![
            format!("orgs/{}/members/{login}", self.owner),
            "--silent".to_string(),
        ];
        let output = self.api(&args).await?;
        membership_from(&output)
            .with_context(|| format!("Failed to check organization membership of {login}"))
    }

    async fn identity(&self, login: &str) -> Result<Identity> {
        if let Some(identity) = self.identities.lock().await.get(login) {
            return Ok(identity.clone());
        }

        let raw: RawUser = self
            .api_json(&[format!("users/{login}")])
            .await
            .with_context(|| format!("Failed to fetch user {login}"))?;
        let identity = Identity {
            login: raw.login,
            email: raw.email.filter(|e| !e.is_empty()),
            company: raw.company.filter(|c| !c.is_empty()),
            org_member: false,
        };

        self.identities
            .lock()
            .await
            .insert(login.to_string(), identity.clone());
        Ok(identity)
    }
}

fn ensure_success(output: &Output, args: &[String]) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    anyhow::bail!(
        "gh api {} failed: {}",
        args.first().map_or("", String::as_str),
        stderr.trim()
    )
}

/// Membership endpoint answers 204 for members and 404 for everyone else
fn membership_from(output: &Output) -> Result<bool> {
    if output.status.success() {
        return Ok(true);
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    if stderr.contains("HTTP 404") {
        return Ok(false);
    }
    anyhow::bail!("gh api failed: {}", stderr.trim())
}

fn should_retry(attempt: u32, stderr: &str) -> bool {
    attempt < MAX_ATTEMPTS && is_transient(stderr)
}

/// Failures worth another attempt: server errors, throttling, network resets
fn is_transient(stderr: &str) -> bool {
    const MARKERS: &[&str] = &[
        "HTTP 500",
        "HTTP 502",
        "HTTP 503",
        "HTTP 504",
        "secondary rate limit",
        "connection reset",
        "timeout",
        "timed out",
    ];
    let stderr = stderr.to_lowercase();
    MARKERS.iter().any(|m| stderr.contains(&m.to_lowercase()))
}

/// Raw pull request from the REST API
#[derive(Debug, Deserialize)]
struct RawPull {
    number: u64,
    #[serde(default)]
    title: String,
    user: RawLogin,
    created_at: DateTime<Utc>,
    #[serde(default)]
    labels: Vec<RawName>,
    #[serde(default)]
    requested_teams: Vec<RawName>,
}

impl From<RawPull> for PullRequest {
    fn from(raw: RawPull) -> Self {
        Self {
            number: raw.number,
            title: raw.title,
            author: raw.user.login,
            created_at: raw.created_at,
            labels: raw.labels.into_iter().map(|l| l.name).collect(),
            requested_teams: raw.requested_teams.into_iter().map(|t| t.name).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawLogin {
    login: String,
}

#[derive(Debug, Deserialize)]
struct RawName {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawReviewRequests {
    #[serde(default)]
    teams: Vec<RawName>,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    login: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    company: Option<String>,
}
