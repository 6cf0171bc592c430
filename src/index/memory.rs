//! In-memory [`DocumentIndex`] for tests and local experiments.
//!
//! Mimics the RAG service contract closely enough to exercise the engine:
//! documents get a UUID on create, a SHA-256 `hash_value` of their text, and
//! `is_truncated` when the text exceeds the configured limit. Updates with
//! an unchanged hash are reported as unchanged, unknown ids as not found.
//!
//! Every call is recorded so tests can assert which remote operations a run
//! performed. A single operation can be made to fail to test abort paths.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::DocumentIndex;
use crate::error::{Result, SyncError};
use crate::models::{
    stamp_branch, DeleteOutcome, Document, UpdateOutcome, META_BRANCH, META_FILE_NAME,
};

const DEFAULT_MAX_TEXT_LEN: usize = 1 << 20;

/// Which operation a recorded call was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ListIndexes,
    CreateIndex,
    QueryDocuments,
    UpdateDocuments,
    DeleteDocuments,
}

impl Operation {
    pub fn is_mutation(self) -> bool {
        matches!(
            self,
            Operation::CreateIndex | Operation::UpdateDocuments | Operation::DeleteDocuments
        )
    }
}

/// A recorded call: the operation and the documents (or names) it carried.
#[derive(Debug, Clone)]
pub struct Call {
    pub operation: Operation,
    pub branch: String,
    pub documents: Vec<Document>,
    pub file_names: Vec<String>,
}

/// In-memory index store keyed by index name, then document id.
pub struct MemoryIndex {
    indexes: Mutex<BTreeMap<String, BTreeMap<String, Document>>>,
    calls: Mutex<Vec<Call>>,
    fail_on: Mutex<Option<Operation>>,
    max_text_len: usize,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self {
            indexes: Mutex::new(BTreeMap::new()),
            calls: Mutex::new(Vec::new()),
            fail_on: Mutex::new(None),
            max_text_len: DEFAULT_MAX_TEXT_LEN,
        }
    }

    pub fn with_max_text_len(mut self, max_text_len: usize) -> Self {
        self.max_text_len = max_text_len;
        self
    }

    /// Make every future call of `operation` fail with a 500 status.
    pub fn fail_on(&self, operation: Operation) {
        *self.fail_on.lock().unwrap() = Some(operation);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_of(&self, operation: Operation) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.operation == operation)
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Snapshot of every document stored under `index`.
    pub fn documents(&self, index: &str) -> Vec<Document> {
        self.indexes
            .lock()
            .unwrap()
            .get(index)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default()
    }

    fn record(
        &self,
        operation: Operation,
        branch: &str,
        documents: &[Document],
        file_names: &[String],
    ) -> Result<()> {
        self.calls.lock().unwrap().push(Call {
            operation,
            branch: branch.to_string(),
            documents: documents.to_vec(),
            file_names: file_names.to_vec(),
        });

        if *self.fail_on.lock().unwrap() == Some(operation) {
            return Err(SyncError::RemoteStatus {
                context: format!("{:?} failed", operation),
                status: "500 Internal Server Error".to_string(),
            });
        }
        Ok(())
    }

    fn persist(&self, mut doc: Document) -> Document {
        doc.hash_value = content_hash(&doc.text);
        doc.is_truncated = doc.text.len() > self.max_text_len;
        doc
    }
}

impl Default for MemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn matches_filter(doc: &Document, filter: &HashMap<&str, &str>) -> bool {
    filter
        .iter()
        .all(|(key, value)| doc.metadata.get(*key).map(String::as_str) == Some(*value))
}

impl DocumentIndex for MemoryIndex {
    fn list_indexes(&self) -> Result<Vec<String>> {
        self.record(Operation::ListIndexes, "", &[], &[])?;
        Ok(self.indexes.lock().unwrap().keys().cloned().collect())
    }

    fn create_index(&self, branch: &str, mut documents: Vec<Document>) -> Result<Vec<Document>> {
        stamp_branch(&mut documents, branch);
        self.record(Operation::CreateIndex, branch, &documents, &[])?;

        let mut indexes = self.indexes.lock().unwrap();
        let index = indexes.entry(branch.to_string()).or_default();
        let mut created = Vec::with_capacity(documents.len());
        for mut doc in documents {
            doc.document_id = Uuid::new_v4().to_string();
            let doc = self.persist(doc);
            index.insert(doc.document_id.clone(), doc.clone());
            created.push(doc);
        }
        Ok(created)
    }

    fn query_documents_by_file_name(
        &self,
        branch: &str,
        file_names: &[String],
    ) -> Result<Vec<Document>> {
        if file_names.is_empty() {
            return Ok(Vec::new());
        }
        self.record(Operation::QueryDocuments, branch, &[], file_names)?;

        let indexes = self.indexes.lock().unwrap();
        let Some(index) = indexes.get(branch) else {
            return Ok(Vec::new());
        };

        let mut found = Vec::new();
        for file_name in file_names {
            let filter =
                HashMap::from([(META_BRANCH, branch), (META_FILE_NAME, file_name.as_str())]);
            found.extend(
                index
                    .values()
                    .filter(|doc| matches_filter(doc, &filter))
                    .cloned(),
            );
        }
        Ok(found)
    }

    fn update_documents(&self, branch: &str, mut documents: Vec<Document>) -> Result<UpdateOutcome> {
        stamp_branch(&mut documents, branch);
        self.record(Operation::UpdateDocuments, branch, &documents, &[])?;

        let mut indexes = self.indexes.lock().unwrap();
        let index = indexes.entry(branch.to_string()).or_default();
        let mut outcome = UpdateOutcome::default();
        for doc in documents {
            match index.get_mut(&doc.document_id) {
                None => outcome.not_found.push(doc),
                Some(stored) if stored.hash_value == content_hash(&doc.text) => {
                    outcome.unchanged.push(stored.clone());
                }
                Some(stored) => {
                    *stored = self.persist(doc);
                    outcome.updated.push(stored.clone());
                }
            }
        }
        Ok(outcome)
    }

    fn delete_documents(&self, branch: &str, documents: &[Document]) -> Result<DeleteOutcome> {
        self.record(Operation::DeleteDocuments, branch, documents, &[])?;

        let mut indexes = self.indexes.lock().unwrap();
        let mut outcome = DeleteOutcome::default();
        let index = indexes.get_mut(branch);
        let Some(index) = index else {
            outcome.not_found_ids = documents.iter().map(|d| d.document_id.clone()).collect();
            return Ok(outcome);
        };
        for doc in documents {
            match index.remove(&doc.document_id) {
                Some(_) => outcome.deleted_ids.push(doc.document_id.clone()),
                None => outcome.not_found_ids.push(doc.document_id.clone()),
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::META_FILE_PATH;

    fn doc(path: &str, text: &str) -> Document {
        let name = path.rsplit('/').next().unwrap();
        Document::new(
            text.to_string(),
            HashMap::from([
                (META_FILE_PATH.to_string(), path.to_string()),
                (META_FILE_NAME.to_string(), name.to_string()),
            ]),
        )
    }

    #[test]
    fn test_create_assigns_server_fields() {
        let index = MemoryIndex::new().with_max_text_len(4);
        let created = index
            .create_index("main", vec![doc("a.go", "package a")])
            .unwrap();
        assert_eq!(created.len(), 1);
        assert!(!created[0].document_id.is_empty());
        assert_eq!(created[0].hash_value.len(), 64);
        assert!(created[0].is_truncated);
        assert_eq!(created[0].metadata[META_BRANCH], "main");
    }

    #[test]
    fn test_index_exists_ignores_case() {
        let index = MemoryIndex::new();
        assert!(!index.index_exists("Main").unwrap());
        index.create_index("main", vec![doc("a.go", "x")]).unwrap();
        assert!(index.index_exists("Main").unwrap());
        assert!(index.index_exists("main").unwrap());
        assert!(!index.index_exists("mai").unwrap());
    }

    #[test]
    fn test_update_unchanged_and_not_found() {
        let index = MemoryIndex::new();
        let created = index
            .create_index("main", vec![doc("a.go", "one"), doc("b.go", "two")])
            .unwrap();

        let mut changed = created[0].clone();
        changed.text = "one, revised".to_string();
        let same = created[1].clone();
        let mut missing = doc("c.go", "three");
        missing.document_id = "nope".to_string();

        let outcome = index
            .update_documents("main", vec![changed, same, missing])
            .unwrap();
        assert_eq!(outcome.updated.len(), 1);
        assert_eq!(outcome.updated[0].text, "one, revised");
        assert_eq!(outcome.unchanged.len(), 1);
        assert_eq!(outcome.not_found.len(), 1);
    }

    #[test]
    fn test_query_filters_by_file_name_and_branch() {
        let index = MemoryIndex::new();
        index
            .create_index("main", vec![doc("pkg/a.go", "x"), doc("cmd/a.go", "y")])
            .unwrap();
        index.create_index("dev", vec![doc("pkg/a.go", "z")]).unwrap();

        let found = index
            .query_documents_by_file_name("main", &["a.go".to_string()])
            .unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|d| d.metadata[META_BRANCH] == "main"));
    }

    #[test]
    fn test_delete_reports_not_found() {
        let index = MemoryIndex::new();
        let created = index.create_index("main", vec![doc("a.go", "x")]).unwrap();
        let mut ghost = doc("b.go", "y");
        ghost.document_id = "ghost".to_string();

        let outcome = index
            .delete_documents("main", &[created[0].clone(), ghost])
            .unwrap();
        assert_eq!(outcome.deleted_ids, vec![created[0].document_id.clone()]);
        assert_eq!(outcome.not_found_ids, vec!["ghost".to_string()]);
        assert!(index.documents("main").is_empty());
    }

    #[test]
    fn test_fail_on_records_then_fails() {
        let index = MemoryIndex::new();
        index.fail_on(Operation::UpdateDocuments);
        let err = index.update_documents("main", vec![]).unwrap_err();
        assert!(matches!(err, SyncError::RemoteStatus { .. }));
        assert_eq!(index.calls_of(Operation::UpdateDocuments).len(), 1);
    }
}
