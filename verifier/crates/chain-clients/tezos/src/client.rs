use std::future::Future;
use std::time::Duration;

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;
use verifier_chain_client_interface::ChainClientError;

use crate::error::{api_error, from_reqwest_error, parse_error};

/// Thin JSON-over-HTTP wrapper shared by the node RPC and the indexer.
/// Every request is bounded by the client timeout and retried a fixed number
/// of times when the failure is transient.
#[derive(Debug, Clone)]
pub struct HttpJsonClient {
    client: reqwest::Client,
    base_url: Url,
    max_retries: u32,
    retry_delay: Duration,
}

impl HttpJsonClient {
    pub fn new(
        base_url: Url,
        timeout: Duration,
        max_retries: u32,
        retry_delay: Duration,
    ) -> Result<Self, ChainClientError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| from_reqwest_error("build_client", e))?;
        Ok(Self { client, base_url, max_retries, retry_delay })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Builds `<base>/<segments...>`, keeping any path prefix the base already has.
    pub fn endpoint(&self, operation: &str, segments: &[&str]) -> Result<Url, ChainClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ChainClientError::UrlError {
                operation: operation.to_string(),
                message: format!("{} cannot be a base", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GET `url` and decode the body. A 404 is reported as `Ok(None)`.
    pub async fn get_json<T>(&self, operation: &str, url: Url) -> Result<Option<T>, ChainClientError>
    where
        T: DeserializeOwned,
    {
        let client = &self.client;
        let url = &url;
        self.with_retry(operation, || async move {
            debug!(operation, url = %url, "Sending chain request");
            let response = client.get(url.clone()).send().await.map_err(|e| from_reqwest_error(operation, e))?;
            Self::decode(operation, response).await
        })
        .await
    }

    async fn decode<T: DeserializeOwned>(operation: &str, response: Response) -> Result<Option<T>, ChainClientError> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(operation, status, body));
        }
        let bytes = response.bytes().await.map_err(|e| from_reqwest_error(operation, e))?;
        serde_json::from_slice(&bytes).map(Some).map_err(|e| parse_error(operation, e.to_string()))
    }

    async fn with_retry<T, F, Fut>(&self, operation: &str, mut request: F) -> Result<T, ChainClientError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ChainClientError>>,
    {
        let mut attempt = 0;
        loop {
            match request().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(operation, attempt, max_retries = self.max_retries, error = %e, "Chain request failed, retrying");
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
