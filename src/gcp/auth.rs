// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! OAuth access tokens for the REST clients
//!
//! A token is taken from the environment when one is exported, otherwise it
//! is minted by the gcloud CLI. Tokens are cached and refreshed well before
//! their one hour lifetime runs out.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::sync::RwLock;
use tracing::debug;

use super::error::{ApiError, Code};

/// How long a token is reused before asking for a new one
const TOKEN_TTL: Duration = Duration::from_secs(45 * 60);

/// Environment variables checked for a ready-made token, in order
const TOKEN_ENV_VARS: &[&str] = &["CLOUDSDK_AUTH_ACCESS_TOKEN", "GOOGLE_OAUTH_ACCESS_TOKEN"];

struct CachedToken {
    token: String,
    fetched_at: Instant,
}

impl CachedToken {
    fn new(token: String) -> Self {
        Self {
            token,
            fetched_at: Instant::now(),
        }
    }

    fn is_expired(&self) -> bool {
        self.fetched_at.elapsed() > TOKEN_TTL
    }
}

enum TokenSource {
    Static(String),
    Gcloud,
}

/// Hands out bearer tokens, shared by every client of one run
pub struct TokenProvider {
    source: TokenSource,
    cached: Arc<RwLock<Option<CachedToken>>>,
}

impl TokenProvider {
    /// Use an exported token when present, gcloud otherwise
    pub fn from_env() -> Self {
        let token = TOKEN_ENV_VARS
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|value| !value.trim().is_empty());
        match token {
            Some(token) => {
                debug!("Using access token from environment");
                Self::fixed(token.trim())
            }
            None => Self {
                source: TokenSource::Gcloud,
                cached: Arc::new(RwLock::new(None)),
            },
        }
    }

    /// Always return the same token
    pub fn fixed(token: impl Into<String>) -> Self {
        Self {
            source: TokenSource::Static(token.into()),
            cached: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn token(&self) -> Result<String, ApiError> {
        match &self.source {
            TokenSource::Static(token) => Ok(token.clone()),
            TokenSource::Gcloud => {
                {
                    let cached = self.cached.read().await;
                    if let Some(ref entry) = *cached
                        && !entry.is_expired()
                    {
                        return Ok(entry.token.clone());
                    }
                }

                let mut cached = self.cached.write().await;
                // Another task may have refreshed while we waited for the lock
                if let Some(ref entry) = *cached
                    && !entry.is_expired()
                {
                    return Ok(entry.token.clone());
                }
                let token = fetch_gcloud_token().await?;
                *cached = Some(CachedToken::new(token.clone()));
                Ok(token)
            }
        }
    }
}

async fn fetch_gcloud_token() -> Result<String, ApiError> {
    debug!("Fetching access token from gcloud");
    let output = Command::new("gcloud")
        .args(["auth", "print-access-token"])
        .output()
        .await
        .map_err(|e| {
            ApiError::new(
                Code::Unauthenticated,
                format!("failed to run gcloud for an access token: {}", e),
            )
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ApiError::new(
            Code::Unauthenticated,
            format!("gcloud auth print-access-token failed: {}", stderr.trim()),
        ));
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
        return Err(ApiError::new(
            Code::Unauthenticated,
            "gcloud returned an empty access token",
        ));
    }
    Ok(token)
}
