//! Local `git diff` change source.
//!
//! Shells out to `git diff --name-only --no-renames --relative <base> <head>`
//! in the working tree. With the defaults this compares the checked-out
//! commit against its immediate parent, so the workflow checkout needs
//! `fetch-depth: 2` or more.
//!
//! `--no-renames` makes a rename show up as a deletion of the old path plus
//! an addition of the new one, so the old document gets deleted.
//! `--relative` restricts the diff to the corpus root and reports paths
//! relative to it, which matters when the root is a repository
//! subdirectory.

use std::path::PathBuf;
use std::process::Command;
use tracing::info;

use crate::changes::ChangeSource;
use crate::error::{Result, SyncError};

pub struct GitDiffSource {
    repo_dir: PathBuf,
    base_ref: String,
    head_ref: String,
}

impl GitDiffSource {
    pub fn new(repo_dir: PathBuf, base_ref: String, head_ref: String) -> Self {
        Self {
            repo_dir,
            base_ref,
            head_ref,
        }
    }
}

impl ChangeSource for GitDiffSource {
    fn name(&self) -> &str {
        "git-diff"
    }

    fn changed_files(&self) -> Result<Vec<String>> {
        let command = format!(
            "git diff --name-only --no-renames --relative {} {}",
            self.base_ref, self.head_ref
        );
        let output = Command::new("git")
            .args([
                "diff",
                "--name-only",
                "--no-renames",
                "--relative",
                &self.base_ref,
                &self.head_ref,
            ])
            .current_dir(&self.repo_dir)
            .output()
            .map_err(|e| SyncError::Subprocess {
                command: command.clone(),
                message: format!("failed to execute git ({}). Is git installed?", e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SyncError::Subprocess {
                command,
                message: stderr.trim().to_string(),
            });
        }

        let files = parse_name_only(&String::from_utf8_lossy(&output.stdout));
        info!(
            base = self.base_ref.as_str(),
            head = self.head_ref.as_str(),
            files = ?files,
            "diff files"
        );
        Ok(files)
    }
}

/// One path per line, trimmed; blank lines (including the trailing one) are
/// dropped.
pub fn parse_name_only(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
