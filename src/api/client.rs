use async_trait::async_trait;
use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

use super::types::{Page, PageRequest};
use crate::util::{validate_base_url, UrlValidationError};

const MAX_RESPONSE_SIZE: usize = 5 * 1024 * 1024; // 5MB

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request timed out")]
    Timeout,
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    #[error("Invalid UTF-8 in response")]
    InvalidUtf8,
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("Insecure base URL: HTTPS required (except localhost for testing)")]
    InsecureBaseUrl,
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Network(err)
        }
    }
}

impl From<UrlValidationError> for ApiError {
    fn from(err: UrlValidationError) -> Self {
        match err {
            UrlValidationError::Insecure => ApiError::InsecureBaseUrl,
            other => ApiError::InvalidBaseUrl(other.to_string()),
        }
    }
}

/// The remote Articles API.
///
/// Implemented over HTTP by [`HttpArticlesApi`]; tests substitute scripted
/// doubles. Requests with the same cursor are assumed idempotent.
#[async_trait]
pub trait ArticlesApi: Send + Sync {
    async fn fetch_articles(&self, request: &PageRequest) -> Result<Page, ApiError>;
}

/// reqwest-backed client for `GET {base}/articles`.
pub struct HttpArticlesApi {
    client: reqwest::Client,
    endpoint: Url,
    token: Option<SecretString>,
}

impl HttpArticlesApi {
    /// Build a client against `base_url`.
    ///
    /// The base URL must be HTTPS unless it points at a loopback host.
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        token: Option<SecretString>,
    ) -> Result<Self, ApiError> {
        let mut endpoint = validate_base_url(base_url)?;
        endpoint
            .path_segments_mut()
            .map_err(|_| ApiError::InvalidBaseUrl(base_url.to_string()))?
            .pop_if_empty()
            .push("articles");
        tracing::debug!(endpoint = %endpoint, "Articles API endpoint configured");
        Ok(Self {
            client,
            endpoint,
            token,
        })
    }

    fn request_url(&self, request: &PageRequest) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("limit", &request.limit.to_string());
            if let Some(cursor) = &request.cursor {
                pairs.append_pair("cursor", cursor);
            }
            if let Some(q) = &request.q {
                pairs.append_pair("q", q);
            }
        }
        url
    }
}

#[async_trait]
impl ArticlesApi for HttpArticlesApi {
    async fn fetch_articles(&self, request: &PageRequest) -> Result<Page, ApiError> {
        let url = self.request_url(request);
        let mut builder = self.client.get(url.as_str());
        if let Some(token) = &self.token {
            tracing::trace!("Articles API authentication configured");
            builder = builder.header("Authorization", format!("Bearer {}", token.expose_secret()));
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            return Err(ApiError::HttpStatus(response.status().as_u16()));
        }

        let body = read_limited_text(response, MAX_RESPONSE_SIZE).await?;
        let page: Page = serde_json::from_str(&body)?;
        Ok(page)
    }
}

async fn read_limited_text(response: reqwest::Response, limit: usize) -> Result<String, ApiError> {
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(ApiError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(ApiError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    String::from_utf8(bytes).map_err(|_| ApiError::InvalidUtf8)
}
