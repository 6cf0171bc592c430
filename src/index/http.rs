//! HTTP client for the RAG index service.
//!
//! Talks plain JSON over `http://{host}:{port}` with a blocking `reqwest`
//! client. Every logical action is exactly one request, except
//! [`query_documents_by_file_name`](DocumentIndex::query_documents_by_file_name),
//! which issues one request per file name.
//!
//! Only HTTP 200 counts as success; any other status becomes
//! [`SyncError::RemoteStatus`] carrying the status line.

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::DocumentIndex;
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::models::{
    stamp_branch, CreateIndexRequest, DeleteDocumentsRequest, DeleteOutcome, Document,
    ListDocumentsResponse, UpdateDocumentsRequest, UpdateOutcome, META_BRANCH, META_FILE_NAME,
};

pub struct RagClient {
    base_url: Url,
    client: Client,
}

impl RagClient {
    pub fn new(host: &str, port: u16) -> Result<Self> {
        let base_url = Url::parse(&format!("http://{}:{}/", host, port))
            .map_err(|e| SyncError::config(format!("invalid RAG host '{}': {}", host, e)))?;

        let client = Client::builder()
            .user_agent(concat!("rag-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SyncError::network("failed to build HTTP client", e))?;

        Ok(Self { base_url, client })
    }

    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        Self::new(&config.rag_host, config.rag_port)
    }

    /// Build `base_url/seg/seg/...`, percent-encoding each segment so branch
    /// names containing `/` stay a single path segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SyncError::config(format!("invalid RAG base URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn send(&self, request: RequestBuilder, context: &str) -> Result<Response> {
        let response = request
            .send()
            .map_err(|e| SyncError::network(context, e))?;

        if response.status() != StatusCode::OK {
            return Err(SyncError::RemoteStatus {
                context: context.to_string(),
                status: response.status().to_string(),
            });
        }
        Ok(response)
    }

    fn decode<T: DeserializeOwned>(response: Response, context: &str) -> Result<T> {
        let body = response
            .text()
            .map_err(|e| SyncError::network(context, e))?;
        debug!(bytes = body.len(), "{}: response received", context);
        serde_json::from_str(&body).map_err(|e| SyncError::decode(context, e))
    }
}

impl DocumentIndex for RagClient {
    fn list_indexes(&self) -> Result<Vec<String>> {
        let context = "failed to list indexes";
        let url = self.endpoint(&["indexes"])?;
        let response = self.send(self.client.get(url), context)?;
        Self::decode(response, context)
    }

    fn create_index(&self, branch: &str, mut documents: Vec<Document>) -> Result<Vec<Document>> {
        let context = "failed to create index";
        stamp_branch(&mut documents, branch);

        let request = CreateIndexRequest {
            index_name: branch.to_string(),
            documents,
        };
        let url = self.endpoint(&["index"])?;
        info!(
            branch,
            documents = request.documents.len(),
            "sending create index request"
        );
        let response = self.send(self.client.post(url).json(&request), context)?;
        Self::decode(response, context)
    }

    fn query_documents_by_file_name(
        &self,
        branch: &str,
        file_names: &[String],
    ) -> Result<Vec<Document>> {
        if file_names.is_empty() {
            return Ok(Vec::new());
        }

        let context = "failed to query indexed documents";
        let url = self.endpoint(&["indexes", branch, "documents"])?;
        let mut found = Vec::new();

        for file_name in file_names {
            let filter =
                BTreeMap::from([(META_BRANCH, branch), (META_FILE_NAME, file_name.as_str())]);
            let filter_json =
                serde_json::to_string(&filter).map_err(|e| SyncError::decode(context, e))?;

            let request = self
                .client
                .get(url.clone())
                .query(&[("metadata_filter", filter_json)]);
            let response = self.send(request, context)?;
            let listed: ListDocumentsResponse = Self::decode(response, context)?;

            info!(
                file_name = file_name.as_str(),
                count = listed.documents.len(),
                "documents found for file"
            );
            found.extend(listed.documents);
        }

        Ok(found)
    }

    fn update_documents(&self, branch: &str, mut documents: Vec<Document>) -> Result<UpdateOutcome> {
        let context = "failed to update documents";
        stamp_branch(&mut documents, branch);

        let request = UpdateDocumentsRequest { documents };
        let url = self.endpoint(&["indexes", branch, "documents"])?;
        let response = self.send(self.client.post(url).json(&request), context)?;
        Self::decode(response, context)
    }

    fn delete_documents(&self, branch: &str, documents: &[Document]) -> Result<DeleteOutcome> {
        let context = "failed to delete documents";
        let request = DeleteDocumentsRequest {
            doc_ids: documents.iter().map(|d| d.document_id.clone()).collect(),
        };
        let url = self.endpoint(&["indexes", branch, "documents"])?;
        let response = self.send(self.client.delete(url).json(&request), context)?;
        Self::decode(response, context)
    }
}
