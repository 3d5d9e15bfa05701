// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Cloud Asset Inventory resource search

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::error::ApiError;
use super::model::ResourceRecord;
use super::provider::{ResourceSearch, SearchRequest};
use super::rest::RestClient;

pub const DEFAULT_ENDPOINT: &str = "https://cloudasset.googleapis.com";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SearchPage {
    results: Vec<ResourceRecord>,
    next_page_token: String,
}

pub struct AssetClient {
    rest: RestClient,
    endpoint: String,
}

impl AssetClient {
    pub fn new(rest: RestClient) -> Self {
        Self::with_endpoint(rest, DEFAULT_ENDPOINT)
    }

    pub fn with_endpoint(rest: RestClient, endpoint: impl Into<String>) -> Self {
        Self {
            rest,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        }
    }

    fn page_params(request: &SearchRequest, page_token: Option<&str>) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("query", request.query.clone()),
            ("pageSize", request.page_size.to_string()),
            ("readMask", "*".to_string()),
        ];
        params.extend(
            request
                .asset_types
                .iter()
                .map(|asset_type| ("assetTypes", asset_type.clone())),
        );
        if let Some(ref order_by) = request.order_by {
            params.push(("orderBy", order_by.clone()));
        }
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }
        params
    }
}

#[async_trait]
impl ResourceSearch for AssetClient {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<ResourceRecord>, ApiError> {
        let url = format!("{}/v1/{}:searchAllResources", self.endpoint, request.scope);
        let mut records = Vec::new();
        let mut page_token: Option<String> = None;
        let mut page_count = 0u32;

        loop {
            let params = Self::page_params(request, page_token.as_deref());
            let page: SearchPage = self.rest.get_json(&url, &params).await?;
            let items_count = page.results.len();
            records.extend(page.results);
            page_count += 1;

            if page.next_page_token.is_empty() {
                break;
            }
            debug!(
                scope = %request.scope,
                page = page_count,
                items_this_page = items_count,
                total_so_far = records.len(),
                "Fetched page, continuing"
            );
            page_token = Some(page.next_page_token);
        }

        debug!(
            scope = %request.scope,
            pages = page_count,
            total_items = records.len(),
            "Search complete"
        );
        Ok(records)
    }
}
