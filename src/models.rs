//! Wire types exchanged with the RAG index service.
//!
//! Documents are built transiently per run from file content; nothing here
//! outlives the process except what the remote index stores.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Metadata key holding the repository-relative path of the source file.
pub const META_FILE_PATH: &str = "file_path";
/// Metadata key holding the base name of the source file.
pub const META_FILE_NAME: &str = "file_name";
pub const META_BRANCH: &str = "branch";
pub const META_SPLIT_TYPE: &str = "split_type";
pub const META_LANGUAGE: &str = "language";

/// A single indexed document, one per source file.
///
/// `doc_id`, `hash_value` and `is_truncated` are owned by the remote
/// service. The client never computes them and forwards whatever the service
/// last returned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "doc_id", default)]
    pub document_id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub hash_value: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub is_truncated: bool,
}

impl Document {
    /// A new, not yet persisted document for a file.
    pub fn new(text: String, metadata: HashMap<String, String>) -> Self {
        Self {
            text,
            metadata,
            ..Default::default()
        }
    }

    pub fn file_path(&self) -> Option<&str> {
        self.metadata.get(META_FILE_PATH).map(String::as_str)
    }

    pub fn file_name(&self) -> Option<&str> {
        self.metadata.get(META_FILE_NAME).map(String::as_str)
    }
}

/// Overwrite the `branch` metadata of every document.
///
/// Every [`DocumentIndex`](crate::index::DocumentIndex) implementation calls
/// this before a create or update leaves the process.
pub fn stamp_branch(documents: &mut [Document], branch: &str) {
    for doc in documents {
        doc.metadata
            .insert(META_BRANCH.to_string(), branch.to_string());
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateIndexRequest {
    pub index_name: String,
    pub documents: Vec<Document>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListDocumentsResponse {
    #[serde(default)]
    pub documents: Vec<Document>,
    #[serde(default)]
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateDocumentsRequest {
    pub documents: Vec<Document>,
}

/// Per-document outcome of a bulk update, as decided by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOutcome {
    #[serde(rename = "updated_documents", default)]
    pub updated: Vec<Document>,
    #[serde(rename = "unchanged_documents", default)]
    pub unchanged: Vec<Document>,
    #[serde(rename = "not_found_documents", default)]
    pub not_found: Vec<Document>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteDocumentsRequest {
    pub doc_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOutcome {
    #[serde(rename = "deleted_doc_ids", default)]
    pub deleted_ids: Vec<String>,
    #[serde(rename = "not_found_doc_ids", default)]
    pub not_found_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_wire_shape() {
        let json = r#"{
            "doc_id": "d-1",
            "text": "package main",
            "hash_value": "abc",
            "metadata": {"file_path": "cmd/main.go", "file_name": "main.go"},
            "is_truncated": true
        }"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        assert_eq!(doc.document_id, "d-1");
        assert_eq!(doc.file_path(), Some("cmd/main.go"));
        assert!(doc.is_truncated);

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["doc_id"], "d-1");
        assert_eq!(value["metadata"]["file_name"], "main.go");
    }

    #[test]
    fn test_missing_fields_default() {
        let doc: Document = serde_json::from_str(r#"{"text": "x"}"#).unwrap();
        assert!(doc.document_id.is_empty());
        assert!(doc.metadata.is_empty());
        assert!(!doc.is_truncated);

        let outcome: UpdateOutcome = serde_json::from_str("{}").unwrap();
        assert_eq!(outcome, UpdateOutcome::default());
    }

    #[test]
    fn test_stamp_branch_overwrites() {
        let mut docs = vec![Document::new(
            "x".to_string(),
            HashMap::from([(META_BRANCH.to_string(), "stale".to_string())]),
        )];
        stamp_branch(&mut docs, "main");
        assert_eq!(docs[0].metadata[META_BRANCH], "main");
    }
}
