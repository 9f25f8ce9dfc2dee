//! Knowledge API HTTP client.
//!
//! All configuration (endpoint, credential, retry policy, page size) is
//! carried by [`ClientOptions`] and handed to the constructor; nothing is
//! process-global.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::clock::{Clock, TokioClock};
use crate::document::{
    Dataset, DocumentUpdate, NewDataset, NewDocument, RemoteDocument,
};
use crate::models::{
    CreateDatasetBody, CreateDocumentBody, DatasetPayload, DocMetadataBody, DocumentEnvelope,
    DocumentPayload, Page, UpdateDocumentBody,
};
use crate::store::KnowledgeStore;
use crate::{Error, Result};

/// Connection and retry settings for [`KnowledgeClient`].
#[derive(Clone)]
pub struct ClientOptions {
    /// API base URL; a trailing `/` or `/v1` is stripped.
    pub base_url: String,
    /// Bearer credential, passed through opaquely.
    pub api_key: String,
    /// Total attempts per request, including the first.
    pub max_attempts: u32,
    /// Base delay; attempt `n` waits `n * retry_delay` before retrying.
    pub retry_delay: Duration,
    /// Items requested per listing page.
    pub page_size: u32,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Ignore proxy settings from the environment.
    pub no_proxy: bool,
}

impl ClientOptions {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
    pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);
    pub const DEFAULT_PAGE_SIZE: u32 = 100;

    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            retry_delay: Self::DEFAULT_RETRY_DELAY,
            page_size: Self::DEFAULT_PAGE_SIZE,
            request_timeout: Duration::from_secs(60),
            no_proxy: false,
        }
    }

    pub fn with_retry(mut self, max_attempts: u32, retry_delay: Duration) -> Self {
        self.max_attempts = max_attempts;
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_no_proxy(mut self) -> Self {
        self.no_proxy = true;
        self
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("max_attempts", &self.max_attempts)
            .field("retry_delay", &self.retry_delay)
            .field("page_size", &self.page_size)
            .field("request_timeout", &self.request_timeout)
            .field("no_proxy", &self.no_proxy)
            .finish()
    }
}

/// Strip a trailing `/` and `/v1`; every request path adds `/v1` itself.
pub fn normalize_base_url(base_url: &str) -> String {
    let trimmed = base_url.trim().trim_end_matches('/');
    trimmed
        .strip_suffix("/v1")
        .unwrap_or(trimmed)
        .trim_end_matches('/')
        .to_string()
}

/// Knowledge API HTTP client.
pub struct KnowledgeClient {
    http: reqwest::Client,
    base: String,
    max_attempts: u32,
    retry_delay: Duration,
    page_size: u32,
    clock: Arc<dyn Clock>,
}

impl KnowledgeClient {
    /// Creates a client that sleeps on the tokio timer between retries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the URL or key is empty, or the
    /// HTTP client cannot be built.
    pub fn new(options: ClientOptions) -> Result<Self> {
        Self::with_clock(options, Arc::new(TokioClock))
    }

    /// Creates a client with an explicit clock for retry sleeps.
    ///
    /// # Errors
    ///
    /// Same as [`KnowledgeClient::new`].
    pub fn with_clock(options: ClientOptions, clock: Arc<dyn Clock>) -> Result<Self> {
        if options.base_url.trim().is_empty() {
            return Err(Error::InvalidConfig {
                message: "base_url must not be empty".to_string(),
            });
        }
        if options.api_key.trim().is_empty() {
            return Err(Error::InvalidConfig {
                message: "api_key must not be empty".to_string(),
            });
        }
        if options.max_attempts == 0 {
            return Err(Error::InvalidConfig {
                message: "max_attempts must be at least 1".to_string(),
            });
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", options.api_key)).map_err(|e| {
                Error::InvalidConfig {
                    message: format!("invalid api_key: {e}"),
                }
            })?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(options.request_timeout);
        if options.no_proxy {
            builder = builder.no_proxy();
        }
        let http = builder.build().map_err(|e| Error::InvalidConfig {
            message: format!("failed to build HTTP client: {e}"),
        })?;

        Ok(Self {
            http,
            base: normalize_base_url(&options.base_url),
            max_attempts: options.max_attempts,
            retry_delay: options.retry_delay,
            page_size: options.page_size.max(1),
            clock,
        })
    }

    /// Normalized base URL (without `/v1`).
    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1{path}", self.base)
    }

    /// Fetch every page of a listing endpoint.
    async fn list_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let mut out = Vec::new();
        let mut page = 1u32;

        loop {
            let request = self
                .http
                .get(self.url(path))
                .query(&[("page", page), ("limit", self.page_size)]);
            let p: Page<T> = self.get_json(request).await?;
            let fetched = p.data.len();
            out.extend(p.data);

            if !p.has_more || fetched == 0 {
                break;
            }
            page += 1;
        }

        Ok(out)
    }

    /// Execute a request with retries and deserialize the JSON response.
    async fn get_json<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let text = self.execute(request).await?;
        serde_json::from_str(&text).map_err(|e| Error::invalid_payload(format!("deserialization: {e}")))
    }

    /// Execute a request, retrying transient failures with linear backoff.
    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<String> {
        let mut attempt = 1u32;

        loop {
            let rq = request
                .try_clone()
                .ok_or_else(|| Error::Transport {
                    message: "failed to clone request".to_string(),
                })?
                .build()?;

            match self.execute_once(rq).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    let delay = self.retry_delay * attempt;
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient knowledge API failure, retrying"
                    );
                    self.clock.sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One HTTP round trip; non-2xx becomes [`Error::Api`].
    async fn execute_once(&self, rq: reqwest::Request) -> Result<String> {
        let start = Instant::now();
        debug!(method = %rq.method(), url = %rq.url(), "knowledge request");

        let resp = self.http.execute(rq).await?;
        let status = resp.status();
        let text = resp.text().await?;

        debug!(
            status = status.as_u16(),
            ms = start.elapsed().as_millis() as u64,
            bytes = text.len(),
            "knowledge response"
        );

        if tracing::enabled!(tracing::Level::TRACE) {
            let n = 4096usize.min(text.len());
            let n = (0..=n).rev().find(|i| text.is_char_boundary(*i)).unwrap_or(0);
            trace!(status = status.as_u16(), body = %&text[..n], "knowledge response body");
        }

        if status.is_success() {
            return Ok(text);
        }

        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Err(Error::Api {
            status: status.as_u16(),
            message: format!(
                "API error: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("")
            )
            .trim_end()
            .to_string(),
            body,
        })
    }
}

fn metadata(fingerprint: &str) -> DocMetadataBody {
    DocMetadataBody {
        source_hash: fingerprint.to_string(),
        synced_at: chrono::Utc::now().to_rfc3339(),
    }
}

#[async_trait]
impl KnowledgeStore for KnowledgeClient {
    async fn list_datasets(&self) -> Result<Vec<Dataset>> {
        let payloads: Vec<DatasetPayload> = self.list_all("/datasets").await?;
        payloads.into_iter().map(Dataset::try_from).collect()
    }

    async fn create_dataset(&self, request: &NewDataset) -> Result<Dataset> {
        let body = CreateDatasetBody {
            name: request.name.clone(),
            description: request.description.clone(),
            indexing_technique: request.technique,
            permission: request.permission.clone(),
        };
        let payload: DatasetPayload = self
            .get_json(self.http.post(self.url("/datasets")).json(&body))
            .await?;
        Dataset::try_from(payload)
    }

    async fn list_documents(&self, dataset_id: &str) -> Result<Vec<RemoteDocument>> {
        let payloads: Vec<DocumentPayload> = self
            .list_all(&format!("/datasets/{dataset_id}/documents"))
            .await?;
        payloads.into_iter().map(RemoteDocument::try_from).collect()
    }

    async fn create_document(
        &self,
        dataset_id: &str,
        request: &NewDocument,
    ) -> Result<RemoteDocument> {
        let body = CreateDocumentBody {
            name: request.name.clone(),
            text: request.text.clone(),
            indexing_technique: request.options.technique,
            process_rule: request.options.process_rule,
            doc_metadata: metadata(&request.fingerprint),
        };
        let envelope: DocumentEnvelope = self
            .get_json(
                self.http
                    .post(self.url(&format!("/datasets/{dataset_id}/document/create_by_text")))
                    .json(&body),
            )
            .await?;
        RemoteDocument::try_from(envelope.document)
    }

    async fn update_document(
        &self,
        dataset_id: &str,
        document_id: &str,
        request: &DocumentUpdate,
    ) -> Result<RemoteDocument> {
        let body = UpdateDocumentBody {
            name: request.name.clone(),
            text: request.text.clone(),
            doc_metadata: metadata(&request.fingerprint),
        };
        let envelope: DocumentEnvelope = self
            .get_json(
                self.http
                    .post(self.url(&format!(
                        "/datasets/{dataset_id}/documents/{document_id}/update_by_text"
                    )))
                    .json(&body),
            )
            .await?;
        RemoteDocument::try_from(envelope.document)
    }

    async fn delete_document(&self, dataset_id: &str, document_id: &str) -> Result<()> {
        self.execute(
            self.http
                .delete(self.url(&format!("/datasets/{dataset_id}/documents/{document_id}"))),
        )
        .await
        .map(|_| ())
    }
}

impl fmt::Debug for KnowledgeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KnowledgeClient")
            .field("base", &self.base)
            .field("max_attempts", &self.max_attempts)
            .field("retry_delay", &self.retry_delay)
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}
