//! Remote document index abstraction.
//!
//! The [`DocumentIndex`] trait defines every operation the reconciliation
//! engine needs from the RAG service, so the engine can run against the HTTP
//! client or the in-memory double alike.
//!
//! | Method | Remote call |
//! |--------|-------------|
//! | [`list_indexes`](DocumentIndex::list_indexes) | `GET /indexes` |
//! | [`create_index`](DocumentIndex::create_index) | `POST /index` |
//! | [`query_documents_by_file_name`](DocumentIndex::query_documents_by_file_name) | `GET /indexes/{branch}/documents` (one per name) |
//! | [`update_documents`](DocumentIndex::update_documents) | `POST /indexes/{branch}/documents` |
//! | [`delete_documents`](DocumentIndex::delete_documents) | `DELETE /indexes/{branch}/documents` |
//!
//! Implementations must stamp `metadata["branch"]` on every document they
//! send in `create_index` and `update_documents` (see
//! [`stamp_branch`](crate::models::stamp_branch)).

pub mod http;
pub mod memory;

pub use http::RagClient;
pub use memory::MemoryIndex;

use crate::error::Result;
use crate::models::{DeleteOutcome, Document, UpdateOutcome};

/// Index names compare case-insensitively.
pub fn name_matches(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

pub trait DocumentIndex {
    /// Names of every index the service holds.
    fn list_indexes(&self) -> Result<Vec<String>>;

    /// Whether an index named `name` exists, ignoring case.
    ///
    /// Always asks the service; nothing is cached.
    fn index_exists(&self, name: &str) -> Result<bool> {
        Ok(self
            .list_indexes()?
            .iter()
            .any(|index| name_matches(index, name)))
    }

    /// Create (or extend) the `branch` index with `documents` in one call.
    fn create_index(&self, branch: &str, documents: Vec<Document>) -> Result<Vec<Document>>;

    /// Fetch the documents whose `file_name` metadata matches any of
    /// `file_names`, accumulated in request order.
    fn query_documents_by_file_name(
        &self,
        branch: &str,
        file_names: &[String],
    ) -> Result<Vec<Document>>;

    fn update_documents(&self, branch: &str, documents: Vec<Document>) -> Result<UpdateOutcome>;

    fn delete_documents(&self, branch: &str, documents: &[Document]) -> Result<DeleteOutcome>;
}
