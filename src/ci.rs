//! GitHub Actions integration: error annotations and the job step summary.
//!
//! Both are plain text protocols. Annotations are workflow commands written
//! to stdout; the step summary is Markdown appended to the file named by
//! `GITHUB_STEP_SUMMARY`.

use std::io::Write;
use std::path::Path;

use crate::config::Env;
use crate::reconcile::SyncReport;

pub fn running_in_actions(env: &Env) -> bool {
    env.get("GITHUB_ACTIONS").map(String::as_str) == Some("true")
}

/// `::error::<message>` with the workflow-command escaping applied.
pub fn error_annotation(message: &str) -> String {
    let escaped = message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A");
    format!("::error::{}", escaped)
}

/// Markdown table describing a finished run.
pub fn step_summary(branch: &str, report: &SyncReport) -> String {
    let mut rows: Vec<(&str, String)> = Vec::new();
    let mode = match report {
        SyncReport::Bootstrapped { created } => {
            rows.push(("created", created.to_string()));
            "bootstrap"
        }
        SyncReport::NoChanges => "no changes",
        SyncReport::Reconciled(summary) => {
            rows.push(("created", summary.created.to_string()));
            rows.push(("updated", summary.updated.to_string()));
            rows.push(("unchanged", summary.unchanged.to_string()));
            rows.push(("update not found", summary.update_not_found.to_string()));
            rows.push(("deleted", summary.deleted.to_string()));
            rows.push(("delete not found", summary.delete_not_found.to_string()));
            "incremental"
        }
        SyncReport::Planned {
            bootstrap,
            create,
            update,
            delete,
        } => {
            rows.push(("would create", create.to_string()));
            rows.push(("would update", update.to_string()));
            rows.push(("would delete", delete.to_string()));
            if *bootstrap {
                "dry run (bootstrap)"
            } else {
                "dry run (incremental)"
            }
        }
    };

    let mut out = format!("### RAG index sync: `{}`\n\nMode: {}\n\n", branch, mode);
    if !rows.is_empty() {
        out.push_str("| Documents | Count |\n|-----------|-------|\n");
        for (label, count) in rows {
            out.push_str(&format!("| {} | {} |\n", label, count));
        }
    }
    out
}

pub fn append_step_summary(path: &Path, content: &str) -> std::io::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    file.write_all(content.as_bytes())
}
