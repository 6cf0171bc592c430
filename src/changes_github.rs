//! GitHub REST API change sources.
//!
//! Lists the files touched by a single commit
//! (`GET /repos/{owner}/{repo}/commits/{sha}`) or by a pull request
//! (`GET /repos/{owner}/{repo}/pulls/{number}/files`).
//!
//! # Authentication
//!
//! Requests carry `Authorization: Bearer <token>` with the token scoped to
//! the repository (the workflow's `GITHUB_TOKEN` is enough).
//!
//! # Pagination
//!
//! Both endpoints page their file lists. Pages of [`PER_PAGE`] entries are
//! requested until a short page comes back, capped at [`MAX_PAGES`] (GitHub
//! never lists more than 3000 files for either endpoint).
//!
//! Works against GitHub Enterprise by pointing `GITHUB_API_URL` at
//! `https://<host>/api/v3`.

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, info};

use crate::changes::ChangeSource;
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};

pub const PER_PAGE: usize = 100;
pub const MAX_PAGES: usize = 30;

#[derive(Debug, Deserialize)]
struct ChangedFile {
    #[serde(default)]
    filename: String,
    /// Old path of a renamed file.
    #[serde(default)]
    previous_filename: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    #[serde(default)]
    files: Vec<ChangedFile>,
}

/// Repository-scoped GitHub API client.
pub struct GithubClient {
    api_url: Url,
    owner: String,
    repo: String,
    token: String,
    client: Client,
}

impl GithubClient {
    pub fn new(api_url: &str, owner: &str, repo: &str, token: &str) -> Result<Self> {
        let api_url = Url::parse(api_url).map_err(|e| {
            SyncError::config(format!("invalid GitHub API URL '{}': {}", api_url, e))
        })?;
        let client = Client::builder()
            .user_agent(concat!("rag-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SyncError::network("failed to build HTTP client", e))?;

        Ok(Self {
            api_url,
            owner: owner.to_string(),
            repo: repo.to_string(),
            token: token.to_string(),
            client,
        })
    }

    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        let token = config
            .token
            .as_deref()
            .ok_or_else(|| SyncError::config("token is required"))?;
        let owner = config
            .repo_owner
            .as_deref()
            .ok_or_else(|| SyncError::config("GITHUB_REPOSITORY_OWNER is required"))?;
        let repo = config
            .repo_name
            .as_deref()
            .ok_or_else(|| SyncError::config("GITHUB_REPOSITORY is required"))?;
        Self::new(&config.github_api_url, owner, repo, token)
    }

    fn endpoint(&self, tail: &[&str]) -> Result<Url> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| SyncError::config(format!("invalid GitHub API URL: {}", self.api_url)))?
            .pop_if_empty()
            .extend(["repos", self.owner.as_str(), self.repo.as_str()])
            .extend(tail);
        Ok(url)
    }

    /// GET one page and return the raw body.
    fn get_page(&self, url: &Url, page: usize, context: &str) -> Result<String> {
        let response = self
            .client
            .get(url.clone())
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .query(&[("per_page", PER_PAGE), ("page", page)])
            .send()
            .map_err(|e| SyncError::network(context, e))?;

        if response.status() != StatusCode::OK {
            return Err(SyncError::RemoteStatus {
                context: context.to_string(),
                status: response.status().to_string(),
            });
        }
        response.text().map_err(|e| SyncError::network(context, e))
    }

    /// Collect file names across pages; `extract` decodes one page body.
    fn collect_files<F>(&self, url: Url, context: &str, extract: F) -> Result<Vec<String>>
    where
        F: Fn(&str) -> std::result::Result<Vec<ChangedFile>, serde_json::Error>,
    {
        let mut files = Vec::new();
        for page in 1..=MAX_PAGES {
            let body = self.get_page(&url, page, context)?;
            let batch = extract(&body).map_err(|e| SyncError::decode(context, e))?;
            let batch_len = batch.len();
            debug!(page, count = batch_len, "fetched file page");

            // A rename lists the new path, then the old one, so the old
            // document is seen as deleted.
            files.extend(
                batch
                    .into_iter()
                    .flat_map(|f| std::iter::once(f.filename).chain(f.previous_filename))
                    .filter(|name| !name.is_empty()),
            );
            if batch_len < PER_PAGE {
                break;
            }
        }
        Ok(files)
    }

    /// Files touched by a single commit.
    pub fn commit_files(&self, sha: &str) -> Result<Vec<String>> {
        let url = self.endpoint(&["commits", sha])?;
        self.collect_files(url, "failed to get commit files", |body| {
            serde_json::from_str::<CommitResponse>(body).map(|c| c.files)
        })
    }

    /// Files touched by a pull request, across all of its commits.
    pub fn pull_request_files(&self, number: u64) -> Result<Vec<String>> {
        let number = number.to_string();
        let url = self.endpoint(&["pulls", number.as_str(), "files"])?;
        self.collect_files(url, "failed to get pull request files", |body| {
            serde_json::from_str::<Vec<ChangedFile>>(body)
        })
    }
}

pub struct GithubCommitSource {
    client: GithubClient,
    sha: String,
}

impl GithubCommitSource {
    pub fn new(client: GithubClient, sha: String) -> Self {
        Self { client, sha }
    }
}

impl ChangeSource for GithubCommitSource {
    fn name(&self) -> &str {
        "github-commit"
    }

    fn changed_files(&self) -> Result<Vec<String>> {
        let files = self.client.commit_files(&self.sha)?;
        info!(sha = self.sha.as_str(), files = ?files, "commit files");
        Ok(files)
    }
}

pub struct GithubPullRequestSource {
    client: GithubClient,
    number: u64,
}

impl GithubPullRequestSource {
    pub fn new(client: GithubClient, number: u64) -> Self {
        Self { client, number }
    }
}

impl ChangeSource for GithubPullRequestSource {
    fn name(&self) -> &str {
        "github-pr"
    }

    fn changed_files(&self) -> Result<Vec<String>> {
        let files = self.client.pull_request_files(self.number)?;
        info!(pull_request = self.number, files = ?files, "pull request files");
        Ok(files)
    }
}
