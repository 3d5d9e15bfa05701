// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Discovery adapter
//!
//! Turns filter criteria into one or more searches against Cloud Asset
//! Inventory, or a log query for log-label mode, and returns the matched
//! resources as one uniform list in discovery order.

use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info};

use super::classify::Classification;
use super::criteria::{FilterCriteria, FilterMode};
use super::error::PipelineError;
use super::query::QueryBuilder;
use crate::gcp::model::ResourceRecord;
use crate::gcp::provider::{LogQuery, ResourceSearch, SearchRequest};
use crate::progress::ProgressHandle;

/// Key prefix searched in labels and tags by auto-detect
const AUTO_DETECT_KEY: &str = "app*";

/// Tunables for discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoverySettings {
    pub page_size: u32,
    /// Process a resource matched by several auto-detect searches only once
    pub dedupe_auto_detect: bool,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            page_size: 1000,
            dedupe_auto_detect: false,
        }
    }
}

pub struct Discovery<'a> {
    search: &'a dyn ResourceSearch,
    logs: &'a dyn LogQuery,
    classification: &'a Classification,
    settings: DiscoverySettings,
    progress: ProgressHandle,
}

impl<'a> Discovery<'a> {
    pub fn new(
        search: &'a dyn ResourceSearch,
        logs: &'a dyn LogQuery,
        classification: &'a Classification,
        settings: DiscoverySettings,
        progress: ProgressHandle,
    ) -> Self {
        Self {
            search,
            logs,
            classification,
            settings,
            progress,
        }
    }

    /// Find every resource in `scope` matching `criteria`.
    /// Zero matches is an error.
    pub async fn discover(
        &self,
        scope: &str,
        criteria: &FilterCriteria,
    ) -> Result<Vec<ResourceRecord>, PipelineError> {
        let started = Instant::now();
        self.progress.searching(scope, &criteria.mode.to_string());

        let records = match &criteria.mode {
            FilterMode::LogLabel { key, value } => {
                self.discover_from_logs(scope, key, value, &criteria.locations)
                    .await?
            }
            FilterMode::AutoDetect => self.auto_detect(scope, criteria).await?,
            mode => self.search_mode(scope, mode, criteria).await?,
        };

        info!(
            scope = %scope,
            mode = %criteria.mode,
            resources = records.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Discovery complete"
        );
        self.progress
            .discovery_complete(records.len(), started.elapsed().as_millis() as u64);

        if records.is_empty() {
            return Err(PipelineError::NoResourcesMatched {
                scope: scope.to_string(),
            });
        }
        Ok(records)
    }

    /// Auto-detect: app-like labels, app-like tags and a Kubernetes namespace
    /// scan, concatenated in that order
    async fn auto_detect(
        &self,
        scope: &str,
        criteria: &FilterCriteria,
    ) -> Result<Vec<ResourceRecord>, PipelineError> {
        let modes = [
            FilterMode::Label {
                key: AUTO_DETECT_KEY.to_string(),
                value: None,
            },
            FilterMode::Tag {
                key: AUTO_DETECT_KEY.to_string(),
                value: None,
            },
            FilterMode::KubernetesNamespace,
        ];

        let mut records = Vec::new();
        for mode in &modes {
            let found = self.search_mode(scope, mode, criteria).await?;
            debug!(mode = %mode, resources = found.len(), "Auto-detect search finished");
            records.extend(found);
        }

        if self.settings.dedupe_auto_detect {
            let before = records.len();
            let mut seen = HashSet::new();
            records.retain(|r| seen.insert(r.name.clone()));
            debug!(
                before = before,
                after = records.len(),
                "De-duplicated auto-detect results"
            );
        }
        Ok(records)
    }

    async fn search_mode(
        &self,
        scope: &str,
        mode: &FilterMode,
        criteria: &FilterCriteria,
    ) -> Result<Vec<ResourceRecord>, PipelineError> {
        let request = self.search_request(scope, mode, criteria)?;
        info!(scope = %scope, query = %request.query, "Searching scope with query");
        debug!(asset_types = ?request.asset_types, "Searching asset types");
        self.search
            .search(&request)
            .await
            .map_err(|source| PipelineError::Discovery {
                scope: scope.to_string(),
                source,
            })
    }

    fn search_request(
        &self,
        scope: &str,
        mode: &FilterMode,
        criteria: &FilterCriteria,
    ) -> Result<SearchRequest, PipelineError> {
        let query = QueryBuilder::new(self.classification)
            .search_query(mode, &criteria.locations)
            .ok_or_else(|| {
                PipelineError::InvalidCriteria(format!("{} cannot be searched directly", mode))
            })?;

        let kubernetes = matches!(
            mode,
            FilterMode::KubernetesNamespace | FilterMode::KubernetesAppLabel
        );
        let asset_types = if kubernetes {
            self.classification.kubernetes_asset_types.clone()
        } else {
            self.classification
                .asset_types_or_default(criteria.asset_types.as_deref())
        };
        let order_by = matches!(mode, FilterMode::KubernetesNamespace)
            .then(|| "parentFullResourceName".to_string());

        Ok(SearchRequest {
            scope: scope.to_string(),
            query,
            asset_types,
            page_size: self.settings.page_size,
            order_by,
        })
    }

    async fn discover_from_logs(
        &self,
        scope: &str,
        key: &str,
        value: &str,
        locations: &[String],
    ) -> Result<Vec<ResourceRecord>, PipelineError> {
        let project_id = scope.strip_prefix("projects/").ok_or_else(|| {
            PipelineError::InvalidCriteria(format!(
                "log label discovery needs a project scope, got {}",
                scope
            ))
        })?;
        let filter = QueryBuilder::new(self.classification).log_filter(key, value, locations);
        info!(project = %project_id, filter = %filter, "Searching logs with query");

        let resources = self
            .logs
            .query_logs(project_id, &filter)
            .await
            .map_err(|source| PipelineError::Discovery {
                scope: scope.to_string(),
                source,
            })?;
        Ok(resources.into_values().collect())
    }
}
