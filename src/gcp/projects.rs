// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Resource Manager project lookups

use async_trait::async_trait;
use serde::Deserialize;

use super::error::ApiError;
use super::provider::ProjectDirectory;
use super::rest::RestClient;

pub const DEFAULT_ENDPOINT: &str = "https://cloudresourcemanager.googleapis.com";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Project {
    project_id: String,
}

pub struct ProjectsClient {
    rest: RestClient,
    endpoint: String,
}

impl ProjectsClient {
    pub fn new(rest: RestClient) -> Self {
        Self::with_endpoint(rest, DEFAULT_ENDPOINT)
    }

    pub fn with_endpoint(rest: RestClient, endpoint: impl Into<String>) -> Self {
        Self {
            rest,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ProjectDirectory for ProjectsClient {
    async fn project_id(&self, project: &str) -> Result<String, ApiError> {
        let url = format!("{}/v3/{}", self.endpoint, project);
        let found: Project = self.rest.get_json(&url, &[]).await?;
        Ok(found.project_id)
    }
}
