// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Thin authenticated JSON transport shared by the API clients

use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

use super::auth::TokenProvider;
use super::error::{ApiError, Code};

/// Timeout for establishing a connection
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for a whole request/response exchange
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const USER_AGENT: &str = concat!("apphub-assembler/", env!("CARGO_PKG_VERSION"));

/// Google's JSON error body: `{"error": {"code": 404, "message": "...", "status": "NOT_FOUND"}}`
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    tokens: Arc<TokenProvider>,
    quota_project: Option<String>,
}

impl RestClient {
    pub fn new(tokens: Arc<TokenProvider>, quota_project: Option<String>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            http,
            tokens,
            quota_project,
        })
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let request = self.request(Method::GET, url).await?.query(query);
        Self::send(request, url).await
    }

    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        body: &B,
    ) -> Result<T, ApiError> {
        let request = self.request(Method::POST, url).await?.query(query).json(body);
        Self::send(request, url).await
    }

    pub async fn delete_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let request = self.request(Method::DELETE, url).await?;
        Self::send(request, url).await
    }

    async fn request(&self, method: Method, url: &str) -> Result<RequestBuilder, ApiError> {
        let token = self.tokens.token().await?;
        let mut request = self.http.request(method, url).bearer_auth(token);
        if let Some(ref project) = self.quota_project {
            request = request.header("x-goog-user-project", project);
        }
        Ok(request)
    }

    async fn send<T: DeserializeOwned>(request: RequestBuilder, url: &str) -> Result<T, ApiError> {
        trace!(url = %url, "Sending request");
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let err = error_from_response(response).await;
            debug!(url = %url, status = status.as_u16(), error = %err, "Request failed");
            return Err(err);
        }
        let body = response.bytes().await?;
        // DELETE-style endpoints may answer with an empty body
        let body: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
            b"{}"
        } else {
            &body
        };
        serde_json::from_slice(body).map_err(|e| {
            ApiError::new(
                Code::Internal,
                format!("failed to decode response from {}: {}", url, e),
            )
        })
    }
}

/// Map a non-2xx response onto an `ApiError`, preferring the canonical
/// status name from the body over the bare HTTP status
async fn error_from_response(response: Response) -> ApiError {
    let status = response.status();
    let fallback = Code::from_http_status(status.as_u16());
    let text = response.text().await.unwrap_or_default();
    parse_error_body(&text, fallback, status.as_u16())
}

fn parse_error_body(text: &str, fallback: Code, status: u16) -> ApiError {
    match serde_json::from_str::<ErrorEnvelope>(text) {
        Ok(envelope) => {
            let code = Code::from_status_name(&envelope.error.status).unwrap_or(fallback);
            ApiError::new(code, envelope.error.message)
        }
        Err(_) => {
            let message = if text.trim().is_empty() {
                format!("HTTP {}", status)
            } else {
                text.trim().to_string()
            };
            ApiError::new(fallback, message)
        }
    }
}
