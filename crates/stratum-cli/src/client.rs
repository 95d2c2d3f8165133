//! HTTP client for the catalog service.
//!
//! Implements the [`CatalogBackend`] contract against a REST catalog.
//! The merge travels as a structured request body; identifiers are never
//! spliced into query text. HTTP failures are mapped onto the engine's
//! error taxonomy so the job controller can report retryability.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use stratum_core::catalog::{CatalogBackend, ReferenceHandle};
use stratum_core::{Error, ExecutionFailure, MergeSpec, RefName, Result, SourceName, TableName};

use crate::Config;

/// REST implementation of the catalog contract.
pub struct RestCatalog {
    client: Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReferenceInfo {
    hash: String,
}

#[derive(Debug, Serialize)]
struct MergeRequest<'a> {
    reference: &'a str,
    reference_hash: &'a str,
    target: String,
    source: &'a str,
    spec: &'a MergeSpec,
}

impl RestCatalog {
    /// Creates a catalog client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an execution error if the HTTP client cannot be
    /// constructed.
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| {
                Error::execution_with_source(
                    ExecutionFailure::Connectivity,
                    "failed to construct HTTP client",
                    e,
                )
            })?;

        Ok(Self {
            client,
            base_url: config.catalog_url.trim_end_matches('/').to_string(),
            token: config.catalog_token.clone(),
        })
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl CatalogBackend for RestCatalog {
    async fn resolve_reference(&self, name: &RefName) -> Result<ReferenceHandle> {
        let url = format!("{}/api/v1/trees/{name}", self.base_url);
        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            status if status.is_success() => {
                let info: ReferenceInfo = response.json().await.map_err(|e| {
                    Error::execution_with_source(
                        ExecutionFailure::Connectivity,
                        "failed to parse reference response",
                        e,
                    )
                })?;
                Ok(ReferenceHandle::new(name.clone(), info.hash))
            }
            StatusCode::NOT_FOUND => Err(Error::reference(name.as_str(), "reference not found")),
            status => Err(status_error(status, &body_text(response).await)),
        }
    }

    async fn merge_into(
        &self,
        reference: &ReferenceHandle,
        target: &TableName,
        source: &SourceName,
        spec: &MergeSpec,
    ) -> Result<()> {
        let url = format!("{}/api/v1/merge", self.base_url);
        let request = MergeRequest {
            reference: reference.name().as_str(),
            reference_hash: reference.token(),
            target: target.qualified(),
            source: source.as_str(),
            spec,
        };

        let response = self
            .authorized(self.client.post(&url).json(&request))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(status_error(status, &body_text(response).await))
        }
    }

    async fn close(&self) -> Result<()> {
        // HTTP sessions are stateless; nothing to release.
        tracing::debug!("catalog client closed");
        Ok(())
    }
}

async fn body_text(response: reqwest::Response) -> String {
    response.text().await.unwrap_or_default()
}

fn transport_error(error: reqwest::Error) -> Error {
    let kind = if error.is_timeout() {
        ExecutionFailure::Timeout
    } else {
        ExecutionFailure::Connectivity
    };
    Error::execution_with_source(kind, "catalog request failed", error)
}

fn status_error(status: StatusCode, body: &str) -> Error {
    match status {
        StatusCode::CONFLICT => Error::execution(
            ExecutionFailure::Conflict,
            format!("concurrent write on the reference: {body}"),
        ),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => Error::execution(
            ExecutionFailure::Timeout,
            format!("catalog timed out the merge: {body}"),
        ),
        StatusCode::UNPROCESSABLE_ENTITY => {
            Error::schema(format!("catalog rejected the source rows: {body}"))
        }
        StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST => Error::execution(
            ExecutionFailure::Constraint,
            format!("catalog rejected the merge ({status}): {body}"),
        ),
        status => Error::execution(
            ExecutionFailure::Connectivity,
            format!("catalog error ({status}): {body}"),
        ),
    }
}
