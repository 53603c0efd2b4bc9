//! Typed client for the document backend.
//!
//! The backend is a separate service the viewer talks to over REST; every
//! call here is independent of the render lifecycle and safe to fire from an
//! enhancement task. JSON contracts mirror the server schema.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

const DEFAULT_API_URL: &str = "http://localhost:8000";
const API_PREFIX: &str = "/api/v1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub year: i32,
    pub source: String,
    #[serde(rename = "abstract", skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, Value>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentList {
    pub documents: Vec<Document>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub has_more: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentSection {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentContent {
    pub document_id: String,
    pub full_text: String,
    pub sections: Vec<DocumentSection>,
    pub metadata: HashMap<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentUploadResponse {
    pub document_id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub year: i32,
    pub source: String,
    pub message: String,
    pub indexed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    Semantic,
    Keyword,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_min: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_max: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_type: Option<SearchType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<SearchFilters>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResult {
    pub document_id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub year: i32,
    pub source: String,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub score: f64,
    pub highlights: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResults {
    pub query: String,
    pub search_type: SearchType,
    pub results: Vec<SearchResult>,
    pub total_found: u64,
    pub search_time_ms: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentSummary {
    pub document_id: String,
    pub summary: String,
    pub generated_at: String,
    pub max_length: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SystemStats {
    pub total_documents: u64,
    pub indexed_documents: u64,
    pub total_size_mb: f64,
    pub uptime_seconds: f64,
    pub environment: String,
}

/// Optional metadata sent alongside an upload.
#[derive(Debug, Clone, Default)]
pub struct UploadMetadata {
    pub title: Option<String>,
    pub authors: Option<Vec<String>>,
    pub year: Option<i32>,
    pub source: Option<String>,
}

/// Client over the backend's versioned REST surface.
pub struct ApiClient {
    http: reqwest::Client,
    base: String,
}

impl ApiClient {
    /// Base URL comes from `VISTAXR_API_URL` when set.
    pub fn from_env() -> Self {
        let base = std::env::var("VISTAXR_API_URL")
            .ok()
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        Self::new(&base)
    }

    pub fn new(base: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: base.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base, API_PREFIX, path)
    }

    /// Reachability probe against the unversioned health endpoint. Network
    /// failure means "not reachable", never an error.
    pub async fn health_check(&self) -> bool {
        match self.http.get(format!("{}/health", self.base)).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                log::warn!("backend health check failed: {e}");
                false
            }
        }
    }

    pub async fn list_documents(&self, page: Option<u32>, page_size: Option<u32>) -> Result<DocumentList> {
        let mut request = self.http.get(self.url("/documents"));
        if let Some(page) = page {
            request = request.query(&[("page", page)]);
        }
        if let Some(page_size) = page_size {
            request = request.query(&[("page_size", page_size)]);
        }
        let response = request.send().await.context("listing documents")?;
        Ok(response.error_for_status()?.json().await?)
    }

    pub async fn get_document(&self, document_id: &str) -> Result<Document> {
        let response = self
            .http
            .get(self.url(&format!("/documents/{document_id}")))
            .send()
            .await
            .with_context(|| format!("fetching document {document_id}"))?;
        Ok(response.error_for_status()?.json().await?)
    }

    pub async fn get_content(&self, document_id: &str) -> Result<DocumentContent> {
        let response = self
            .http
            .get(self.url(&format!("/documents/{document_id}/content")))
            .send()
            .await
            .with_context(|| format!("fetching content of {document_id}"))?;
        Ok(response.error_for_status()?.json().await?)
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResults> {
        let response = self
            .http
            .post(self.url("/documents/search"))
            .json(request)
            .send()
            .await
            .context("searching documents")?;
        Ok(response.error_for_status()?.json().await?)
    }

    pub async fn upload(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        metadata: UploadMetadata,
    ) -> Result<DocumentUploadResponse> {
        let mut form = reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string()),
        );
        if let Some(title) = metadata.title {
            form = form.text("title", title);
        }
        if let Some(authors) = metadata.authors {
            form = form.text("authors", serde_json::to_string(&authors)?);
        }
        if let Some(year) = metadata.year {
            form = form.text("year", year.to_string());
        }
        if let Some(source) = metadata.source {
            form = form.text("source", source);
        }
        let response = self
            .http
            .post(self.url("/documents"))
            .multipart(form)
            .send()
            .await
            .context("uploading document")?;
        Ok(response.error_for_status()?.json().await?)
    }

    pub async fn delete_document(&self, document_id: &str) -> Result<()> {
        self.http
            .delete(self.url(&format!("/documents/{document_id}")))
            .send()
            .await
            .with_context(|| format!("deleting document {document_id}"))?
            .error_for_status()?;
        Ok(())
    }

    pub async fn get_summary(
        &self,
        document_id: &str,
        max_length: Option<u32>,
    ) -> Result<DocumentSummary> {
        let mut request = self
            .http
            .get(self.url(&format!("/documents/{document_id}/summary")));
        if let Some(max_length) = max_length {
            request = request.query(&[("max_length", max_length)]);
        }
        let response = request
            .send()
            .await
            .with_context(|| format!("summarizing document {document_id}"))?;
        Ok(response.error_for_status()?.json().await?)
    }

    pub async fn stats(&self) -> Result<SystemStats> {
        let response = self
            .http
            .get(self.url("/stats"))
            .send()
            .await
            .context("fetching system stats")?;
        Ok(response.error_for_status()?.json().await?)
    }
}
