//! Change sources: where the list of changed files comes from.
//!
//! A [`ChangeSource`] resolves the change set for the current CI run. Three
//! strategies exist and exactly one is chosen at construction time from
//! [`ChangeSourceKind`]:
//!
//! | Kind | Implementation | Origin |
//! |------|----------------|--------|
//! | `github-commit` | [`GithubCommitSource`] | files touched by `GITHUB_SHA` |
//! | `github-pr` | [`GithubPullRequestSource`] | files touched by a pull request |
//! | `git-diff` | [`GitDiffSource`] | `git diff --name-only --no-renames --relative HEAD~1 HEAD` |
//!
//! Sources report paths exactly as the origin lists them: order preserved,
//! no deduplication, no extension filtering. Filtering belongs to the
//! engine. A rename is reported as both its new and its old path. GitHub
//! sources report paths from the repository top level; `git-diff` reports
//! them relative to the corpus root. Every source fails closed; an API or subprocess error aborts the
//! run.

use crate::changes_git::GitDiffSource;
use crate::changes_github::{GithubClient, GithubCommitSource, GithubPullRequestSource};
use crate::config::{ChangeSourceKind, SyncConfig};
use crate::error::{Result, SyncError};

pub trait ChangeSource {
    /// Short label for logs (e.g. `"github-commit"`).
    fn name(&self) -> &str;

    /// Paths changed in this run, relative to the repository root.
    fn changed_files(&self) -> Result<Vec<String>>;
}

/// Build the change source selected by the configuration.
pub fn build_source(config: &SyncConfig) -> Result<Box<dyn ChangeSource>> {
    match &config.change_source {
        ChangeSourceKind::GithubCommit => {
            let sha = config
                .commit_sha
                .clone()
                .ok_or_else(|| SyncError::config("GITHUB_SHA is required"))?;
            let client = GithubClient::from_config(config)?;
            Ok(Box::new(GithubCommitSource::new(client, sha)))
        }
        ChangeSourceKind::GithubPullRequest { number } => {
            let client = GithubClient::from_config(config)?;
            Ok(Box::new(GithubPullRequestSource::new(client, *number)))
        }
        ChangeSourceKind::GitDiff { base_ref, head_ref } => Ok(Box::new(GitDiffSource::new(
            config.corpus.root.clone(),
            base_ref.clone(),
            head_ref.clone(),
        ))),
    }
}
