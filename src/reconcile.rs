//! Index reconciliation engine.
//!
//! Decides, per changed path, whether the branch index needs a new
//! document, an updated one, or a deletion, then drives the remote calls.
//!
//! # Flow
//!
//! ```text
//! index_exists(branch)?
//!   ├── no  → bootstrap: scan working tree → create_index (one call)
//!   └── yes → incremental:
//!             changed_files → filter → query existing → classify
//!             → update_documents → create_index → delete_documents
//! ```
//!
//! # Classification
//!
//! | Existing document for path | File on disk | Batch |
//! |----------------------------|--------------|-------|
//! | none | (read, fatal if unreadable) | create |
//! | yes | present | update (text replaced) |
//! | yes | missing | delete (never read) |
//!
//! Existing documents match a path by exact `file_path` equality; the first
//! match wins. Each remote call is its own unit of work: an update failure
//! aborts before create and delete are attempted, and nothing is rolled
//! back. Empty batches are not sent.
//!
//! The engine holds no state between runs. Two runs racing on the same
//! branch index are not coordinated.

use tracing::{debug, info};

use crate::changes::ChangeSource;
use crate::corpus::{file_name, Corpus};
use crate::error::{Result, StepContext};
use crate::index::DocumentIndex;
use crate::models::Document;

/// Documents to send, grouped by action.
#[derive(Debug, Default, Clone)]
pub struct ReconcilePlan {
    pub create: Vec<Document>,
    pub update: Vec<Document>,
    pub delete: Vec<Document>,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }
}

/// Counts reported by the remote service after an incremental run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub update_not_found: usize,
    pub deleted: usize,
    pub delete_not_found: usize,
}

/// What a run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncReport {
    /// The index did not exist and was created from the whole tree.
    Bootstrapped { created: usize },
    /// The filtered change set was empty; no remote mutation happened.
    NoChanges,
    Reconciled(ReconcileSummary),
    /// Dry run: what would have been sent.
    Planned {
        bootstrap: bool,
        create: usize,
        update: usize,
        delete: usize,
    },
}

/// Distinct base names of `paths`, in first-seen order.
pub fn query_file_names(paths: &[String]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for path in paths {
        let name = file_name(path);
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Sort each changed path into exactly one batch.
///
/// `paths` must already be filtered to indexable, distinct paths.
pub fn classify(
    corpus: &Corpus,
    paths: &[String],
    existing: &[Document],
) -> Result<ReconcilePlan> {
    let mut plan = ReconcilePlan::default();

    for path in paths {
        info!(file = path.as_str(), "processing file");
        let current = existing
            .iter()
            .find(|doc| doc.file_path() == Some(path.as_str()));

        match current {
            None => {
                info!(file = path.as_str(), "document not in index, creating");
                plan.create.push(corpus.build_document(path)?);
            }
            Some(doc) if !corpus.exists(path) => {
                info!(
                    file = path.as_str(),
                    doc_id = doc.document_id.as_str(),
                    "file removed, deleting document"
                );
                plan.delete.push(doc.clone());
            }
            Some(doc) => {
                info!(
                    file = path.as_str(),
                    doc_id = doc.document_id.as_str(),
                    "document in index, updating"
                );
                let mut updated = doc.clone();
                updated.text = corpus.read(path)?;
                plan.update.push(updated);
            }
        }
    }

    Ok(plan)
}

/// Send the plan: update, then create, then delete.
pub fn apply(
    index: &dyn DocumentIndex,
    branch: &str,
    plan: ReconcilePlan,
) -> Result<ReconcileSummary> {
    let mut summary = ReconcileSummary::default();

    if !plan.update.is_empty() {
        let outcome = index
            .update_documents(branch, plan.update)
            .step("failed to update index")?;
        summary.updated = outcome.updated.len();
        summary.unchanged = outcome.unchanged.len();
        summary.update_not_found = outcome.not_found.len();
        debug!(
            updated = ?doc_ids(&outcome.updated),
            unchanged = ?doc_ids(&outcome.unchanged),
            not_found = ?doc_ids(&outcome.not_found),
            "update response"
        );
    }

    if !plan.create.is_empty() {
        let created = index
            .create_index(branch, plan.create)
            .step("failed to create new documents")?;
        summary.created = created.len();
        debug!(created = ?doc_ids(&created), "create response");
    }

    if !plan.delete.is_empty() {
        let outcome = index
            .delete_documents(branch, &plan.delete)
            .step("failed to delete documents from index")?;
        summary.deleted = outcome.deleted_ids.len();
        summary.delete_not_found = outcome.not_found_ids.len();
        debug!(
            deleted = ?outcome.deleted_ids,
            not_found = ?outcome.not_found_ids,
            "delete response"
        );
    }

    Ok(summary)
}

fn doc_ids(documents: &[Document]) -> Vec<&str> {
    documents.iter().map(|d| d.document_id.as_str()).collect()
}

/// Runs one reconciliation of a branch index against the working tree.
pub struct Reconciler<'a> {
    index: &'a dyn DocumentIndex,
    corpus: &'a Corpus,
    branch: &'a str,
    dry_run: bool,
}

impl<'a> Reconciler<'a> {
    pub fn new(index: &'a dyn DocumentIndex, corpus: &'a Corpus, branch: &'a str) -> Self {
        Self {
            index,
            corpus,
            branch,
            dry_run: false,
        }
    }

    /// Resolve and classify, but send no mutation.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn run(&self, source: &dyn ChangeSource) -> Result<SyncReport> {
        let exists = self
            .index
            .index_exists(self.branch)
            .step("failed to check if index exists")?;

        if exists {
            info!(branch = self.branch, "index exists, updating index");
            self.incremental(source)
        } else {
            info!(branch = self.branch, "index does not exist, creating index");
            self.bootstrap()
        }
    }

    /// Index the whole working tree in a single create call.
    pub fn bootstrap(&self) -> Result<SyncReport> {
        let documents = self
            .corpus
            .scan()
            .step("failed to create documents for index create")?;

        if self.dry_run {
            return Ok(SyncReport::Planned {
                bootstrap: true,
                create: documents.len(),
                update: 0,
                delete: 0,
            });
        }

        let created = self
            .index
            .create_index(self.branch, documents)
            .step("failed to create index")?;
        info!(branch = self.branch, created = created.len(), "index created");
        Ok(SyncReport::Bootstrapped {
            created: created.len(),
        })
    }

    /// Reconcile only the paths the change source reports.
    pub fn incremental(&self, source: &dyn ChangeSource) -> Result<SyncReport> {
        let changed = source
            .changed_files()
            .step("failed to get updated files")?;
        let paths = self.corpus.filter_paths(&changed);
        info!(
            source = source.name(),
            reported = changed.len(),
            indexable = paths.len(),
            "change set resolved"
        );

        if paths.is_empty() {
            info!("no updated files found");
            return Ok(SyncReport::NoChanges);
        }

        let existing = self
            .index
            .query_documents_by_file_name(self.branch, &query_file_names(&paths))
            .step("failed to get indexed documents")?;
        debug!(count = existing.len(), "current documents");

        let plan = classify(self.corpus, &paths, &existing).step("failed to prepare documents")?;

        if self.dry_run {
            return Ok(SyncReport::Planned {
                bootstrap: false,
                create: plan.create.len(),
                update: plan.update.len(),
                delete: plan.delete.len(),
            });
        }

        let summary = apply(self.index, self.branch, plan)?;
        info!(
            created = summary.created,
            updated = summary.updated,
            unchanged = summary.unchanged,
            update_not_found = summary.update_not_found,
            deleted = summary.deleted,
            delete_not_found = summary.delete_not_found,
            "index updated successfully"
        );
        Ok(SyncReport::Reconciled(summary))
    }
}
