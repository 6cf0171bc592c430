//! Run configuration.
//!
//! A [`SyncConfig`] is resolved once at startup from three layers, later
//! layers winning:
//!
//! 1. an optional TOML file (`--config`),
//! 2. the CI environment (action inputs as `INPUT_*`, repository coordinates
//!    as `GITHUB_*`),
//! 3. command-line flags.
//!
//! Validation happens here, before any remote work, so a missing input
//! fails the run with [`SyncError::Config`] and nothing else.
//!
//! ```toml
//! [rag]
//! host = "rag.internal"
//! port = 8080
//! branch = "main"
//!
//! [github]
//! owner = "acme"
//! repo = "payments"
//!
//! [changes]
//! source = "git-diff"
//! base_ref = "HEAD~1"
//!
//! [corpus]
//! root = "."
//! exclude_globs = ["vendor/**"]
//!
//! [[corpus.languages]]
//! extension = "go"
//! language = "go"
//! ```

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Result, SyncError};

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
const DEFAULT_BASE_REF: &str = "HEAD~1";
const DEFAULT_HEAD_REF: &str = "HEAD";
const DEFAULT_SPLIT_TYPE: &str = "code";

/// Fully resolved configuration passed into the engine.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub rag_host: String,
    pub rag_port: u16,
    /// Branch name; also the name of the remote index.
    pub branch: String,
    pub token: Option<String>,
    pub repo_owner: Option<String>,
    pub repo_name: Option<String>,
    pub commit_sha: Option<String>,
    pub github_api_url: String,
    pub change_source: ChangeSourceKind,
    pub corpus: CorpusConfig,
}

/// Which strategy resolves the change set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeSourceKind {
    /// Files touched by `commit_sha`, via the GitHub API.
    GithubCommit,
    /// Files touched by a pull request, via the GitHub API.
    GithubPullRequest { number: u64 },
    /// `git diff --name-only <base_ref> <head_ref>` in the corpus root.
    GitDiff { base_ref: String, head_ref: String },
}

impl ChangeSourceKind {
    pub fn label(&self) -> &'static str {
        match self {
            ChangeSourceKind::GithubCommit => "github-commit",
            ChangeSourceKind::GithubPullRequest { .. } => "github-pr",
            ChangeSourceKind::GitDiff { .. } => "git-diff",
        }
    }

    pub fn needs_github(&self) -> bool {
        !matches!(self, ChangeSourceKind::GitDiff { .. })
    }
}

#[derive(Debug, Clone)]
pub struct CorpusConfig {
    /// Working tree root; change-set paths are relative to it.
    pub root: PathBuf,
    pub languages: Vec<LanguageRule>,
    pub exclude_globs: Vec<String>,
    /// `split_type` metadata hint attached to every document.
    pub split_type: String,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            languages: default_languages(),
            exclude_globs: Vec::new(),
            split_type: DEFAULT_SPLIT_TYPE.to_string(),
        }
    }
}

/// Maps a file extension (without the dot) to a `language` metadata hint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LanguageRule {
    pub extension: String,
    pub language: String,
}

fn default_languages() -> Vec<LanguageRule> {
    vec![LanguageRule {
        extension: "go".to_string(),
        language: "go".to_string(),
    }]
}

// ============ File layer ============

#[derive(Debug, Deserialize, Clone, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub rag: RagSection,
    #[serde(default)]
    pub github: GithubSection,
    #[serde(default)]
    pub changes: ChangesSection,
    #[serde(default)]
    pub corpus: CorpusSection,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RagSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub branch: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct GithubSection {
    pub token: Option<String>,
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub sha: Option<String>,
    pub api_url: Option<String>,
    pub pull_request: Option<u64>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ChangesSection {
    pub source: Option<String>,
    pub base_ref: Option<String>,
    pub head_ref: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CorpusSection {
    pub root: Option<PathBuf>,
    pub languages: Option<Vec<LanguageRule>>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    pub split_type: Option<String>,
}

pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        SyncError::config(format!(
            "failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;
    toml::from_str(&content)
        .map_err(|e| SyncError::config(format!("failed to parse config file: {}", e)))
}

// ============ CLI layer ============

/// Values given on the command line. Every field overrides the other layers.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<String>,
    pub branch: Option<String>,
    pub source: Option<String>,
    pub root: Option<PathBuf>,
}

// ============ Resolution ============

/// Snapshot of the process environment, keyed by variable name.
pub type Env = HashMap<String, String>;

pub fn env_snapshot() -> Env {
    std::env::vars().collect()
}

fn env_value(env: &Env, key: &str) -> Option<String> {
    env.get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Merge the layers and validate the result.
pub fn resolve(file: FileConfig, env: &Env, overrides: &Overrides) -> Result<SyncConfig> {
    let rag_host = non_empty(overrides.host.clone())
        .or_else(|| env_value(env, "INPUT_RAGHOST"))
        .or_else(|| non_empty(file.rag.host.clone()))
        .ok_or_else(|| SyncError::config("ragHost is required"))?;

    let rag_port = match non_empty(overrides.port.clone())
        .or_else(|| env_value(env, "INPUT_RAGPORT"))
    {
        Some(raw) => raw
            .parse::<u16>()
            .map_err(|_| SyncError::config(format!("ragPort must be a port number, got '{}'", raw)))?,
        None => file
            .rag
            .port
            .ok_or_else(|| SyncError::config("ragPort is required"))?,
    };

    let branch = non_empty(overrides.branch.clone())
        .or_else(|| env_value(env, "INPUT_BRANCH"))
        .or_else(|| non_empty(file.rag.branch.clone()))
        .ok_or_else(|| SyncError::config("branch is required"))?;

    let token =
        env_value(env, "INPUT_TOKEN").or_else(|| non_empty(file.github.token.clone()));

    let repository = env_value(env, "GITHUB_REPOSITORY");
    let repo_owner = env_value(env, "GITHUB_REPOSITORY_OWNER")
        .or_else(|| {
            repository
                .as_deref()
                .and_then(|r| r.split_once('/'))
                .map(|(owner, _)| owner.to_string())
        })
        .or_else(|| non_empty(file.github.owner.clone()));
    let repo_name = match (&repository, &repo_owner) {
        (Some(repository), Some(owner)) => Some(
            repository
                .strip_prefix(&format!("{}/", owner))
                .unwrap_or(repository)
                .to_string(),
        ),
        (Some(repository), None) => Some(repository.clone()),
        (None, _) => non_empty(file.github.repo.clone()),
    };
    let commit_sha = env_value(env, "GITHUB_SHA").or_else(|| non_empty(file.github.sha.clone()));
    let github_api_url = env_value(env, "GITHUB_API_URL")
        .or_else(|| non_empty(file.github.api_url.clone()))
        .unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string());

    let source_name = non_empty(overrides.source.clone())
        .or_else(|| env_value(env, "INPUT_CHANGESOURCE"))
        .or_else(|| non_empty(file.changes.source.clone()))
        .unwrap_or_else(|| "github-commit".to_string());

    let change_source = match source_name.to_ascii_lowercase().as_str() {
        "github-commit" => ChangeSourceKind::GithubCommit,
        "github-pr" => {
            let number = match env_value(env, "INPUT_PULLREQUEST") {
                Some(raw) => Some(raw.parse::<u64>().map_err(|_| {
                    SyncError::config(format!("pullRequest must be a number, got '{}'", raw))
                })?),
                None => file
                    .github
                    .pull_request
                    .or_else(|| env_value(env, "GITHUB_REF").and_then(|r| pull_number_from_ref(&r))),
            };
            let number = number.ok_or_else(|| {
                SyncError::config("pullRequest is required for the github-pr change source")
            })?;
            ChangeSourceKind::GithubPullRequest { number }
        }
        "git-diff" => ChangeSourceKind::GitDiff {
            base_ref: non_empty(file.changes.base_ref.clone())
                .unwrap_or_else(|| DEFAULT_BASE_REF.to_string()),
            head_ref: non_empty(file.changes.head_ref.clone())
                .unwrap_or_else(|| DEFAULT_HEAD_REF.to_string()),
        },
        other => {
            return Err(SyncError::config(format!(
                "unknown change source '{}'. Must be github-commit, github-pr, or git-diff",
                other
            )))
        }
    };

    if change_source.needs_github() {
        if token.is_none() {
            return Err(SyncError::config("token is required"));
        }
        if repo_name.is_none() {
            return Err(SyncError::config("GITHUB_REPOSITORY is required"));
        }
        if repo_owner.is_none() {
            return Err(SyncError::config("GITHUB_REPOSITORY_OWNER is required"));
        }
    }
    if change_source == ChangeSourceKind::GithubCommit && commit_sha.is_none() {
        return Err(SyncError::config("GITHUB_SHA is required"));
    }

    let mut corpus = CorpusConfig::default();
    if let Some(root) = overrides.root.clone().or(file.corpus.root) {
        corpus.root = root;
    }
    if let Some(languages) = file.corpus.languages {
        if languages.is_empty() {
            return Err(SyncError::config("corpus.languages must not be empty"));
        }
        corpus.languages = languages
            .into_iter()
            .map(|rule| LanguageRule {
                extension: rule.extension.trim_start_matches('.').to_string(),
                language: rule.language,
            })
            .collect();
    }
    corpus.exclude_globs = file.corpus.exclude_globs;
    if let Some(split_type) = non_empty(file.corpus.split_type) {
        corpus.split_type = split_type;
    }

    Ok(SyncConfig {
        rag_host,
        rag_port,
        branch,
        token,
        repo_owner,
        repo_name,
        commit_sha,
        github_api_url,
        change_source,
        corpus,
    })
}

/// `refs/pull/42/merge` → `42`.
fn pull_number_from_ref(git_ref: &str) -> Option<u64> {
    git_ref
        .strip_prefix("refs/pull/")?
        .split('/')
        .next()?
        .parse()
        .ok()
}
