// src/http.rs

use crate::error::AzAuthError;
use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error};
use url::Url;

/// HTTP methods supported by the fetch collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A single outbound request.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: Url,
    pub method: Method,
    /// JSON body, only sent with `POST`.
    pub body: Option<serde_json::Value>,
    pub headers: Vec<(String, String)>,
}

impl FetchRequest {
    /// A plain `GET` with no body and no extra headers.
    pub fn get(url: Url) -> Self {
        Self {
            url,
            method: Method::Get,
            body: None,
            headers: Vec::new(),
        }
    }
}

/// A successful (status < 400) response.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub url: Url,
    pub status: u16,
    pub body: Bytes,
}

impl FetchResponse {
    /// Deserializes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, AzAuthError> {
        serde_json::from_slice(&self.body).map_err(|e| AzAuthError::InvalidDocument {
            url: self.url.clone(),
            reason: e.to_string(),
        })
    }
}

/// Executes HTTP requests on behalf of the discovery loader.
///
/// Implementations must turn any status of 400 or above into
/// [`AzAuthError::HttpStatus`]; callers do not inspect the status further.
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, AzAuthError>;
}

/// [`HttpFetcher`] backed by a pooled `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestFetcher {
    http_client: reqwest::Client,
}

impl ReqwestFetcher {
    /// Creates a fetcher whose requests are bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, AzAuthError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AzAuthError::InvalidConfiguration(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { http_client })
    }

    /// Wraps an already configured client.
    pub fn with_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, AzAuthError> {
        let FetchRequest { url, method, body, headers } = request;

        let mut builder = match method {
            Method::Get => self.http_client.get(url.clone()),
            Method::Post => {
                let builder = self.http_client.post(url.clone());
                match &body {
                    Some(json) => builder.json(json),
                    None => builder,
                }
            }
        };
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(|source| {
            error!("Error sending request to {}: {}", url, source);
            AzAuthError::HttpError { url: url.clone(), source }
        })?;

        let status = response.status().as_u16();
        if status > 399 {
            // Azure AD explains failures in the body; keep it for the log only.
            let body = response.text().await.unwrap_or_default();
            error!("Request to <<{}>> returned <<{}>> Body: {}", url, status, body);
            return Err(AzAuthError::HttpStatus { url, status });
        }
        debug!("Request to <{}> - status code: <{}>", url, status);

        let body = response
            .bytes()
            .await
            .map_err(|source| AzAuthError::HttpError { url: url.clone(), source })?;

        Ok(FetchResponse { url, status, body })
    }
}
