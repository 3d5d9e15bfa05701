// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Cloud Logging based discovery
//!
//! Resources that never carried labels can still be found through the labels
//! on the log entries they emit. Each matching entry is mapped back to the
//! full resource name of the resource that wrote it.

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, trace};

use super::error::ApiError;
use super::model::ResourceRecord;
use super::provider::LogQuery;
use super::rest::RestClient;

pub const DEFAULT_ENDPOINT: &str = "https://logging.googleapis.com";

/// Entries requested per page
const PAGE_SIZE: u32 = 1000;

/// Entry label naming the kind of the pod's top-level controller
pub const CONTROLLER_TYPE_LABEL: &str = "logging.gke.io/top_level_controller_type";

/// Entry label naming the pod's top-level controller
pub const CONTROLLER_NAME_LABEL: &str = "logging.gke.io/top_level_controller_name";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListEntriesRequest<'a> {
    resource_names: Vec<String>,
    filter: &'a str,
    page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ListEntriesResponse {
    entries: Vec<LogEntry>,
    next_page_token: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MonitoredResource {
    #[serde(rename = "type")]
    pub kind: String,
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogEntry {
    pub resource: MonitoredResource,
    pub labels: BTreeMap<String, String>,
}

/// Map a log entry to the resource that emitted it.
/// Entries from unsupported monitored resource types yield `None`.
pub fn resource_from_entry(entry: &LogEntry) -> Option<ResourceRecord> {
    let labels = &entry.resource.labels;
    let label = |key: &str| labels.get(key).map(String::as_str).unwrap_or_default();
    let project = label("project_id");
    let location = label("location");

    let (name, asset_type) = match entry.resource.kind.as_str() {
        "cloud_run_revision" => (
            format!(
                "//run.googleapis.com/projects/{}/locations/{}/services/{}",
                project,
                location,
                label("service_name")
            ),
            "run.googleapis.com/Service",
        ),
        "k8s_pod" => {
            let controller_type = entry.labels.get(CONTROLLER_TYPE_LABEL)?;
            if controller_type != "Deployment" {
                return None;
            }
            let deployment = entry.labels.get(CONTROLLER_NAME_LABEL)?;
            (
                format!(
                    "//container.googleapis.com/projects/{}/locations/{}/clusters/{}/k8s/namespaces/{}/apps/deployments/{}",
                    project,
                    location,
                    label("cluster_name"),
                    label("namespace_name"),
                    deployment
                ),
                "apps.k8s.io/Deployment",
            )
        }
        "gce_instance_group" => {
            let collection = if is_zone(location) { "zones" } else { "regions" };
            (
                format!(
                    "//compute.googleapis.com/projects/{}/{}/{}/instanceGroups/{}",
                    project,
                    collection,
                    location,
                    label("instance_group_name")
                ),
                "compute.googleapis.com/InstanceGroup",
            )
        }
        _ => return None,
    };

    Some(ResourceRecord {
        display_name: name.rsplit('/').next().unwrap_or_default().to_string(),
        name,
        asset_type: asset_type.to_string(),
        project: format!("projects/{}", project),
        location: location.to_string(),
        labels: entry.labels.clone(),
        ..Default::default()
    })
}

/// `us-central1-a` is a zone, `us-central1` is a region
fn is_zone(location: &str) -> bool {
    location.matches('-').count() >= 2
}

pub struct LoggingClient {
    rest: RestClient,
    endpoint: String,
}

impl LoggingClient {
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
impl LogQuery for LoggingClient {
    async fn query_logs(
        &self,
        project_id: &str,
        filter: &str,
    ) -> Result<IndexMap<String, ResourceRecord>, ApiError> {
        let url = format!("{}/v2/entries:list", self.endpoint);
        let mut resources = IndexMap::new();
        let mut page_token = None;
        let mut entry_count = 0usize;

        loop {
            let request = ListEntriesRequest {
                resource_names: vec![format!("projects/{}", project_id)],
                filter,
                page_size: PAGE_SIZE,
                page_token: page_token.take(),
            };
            let page: ListEntriesResponse = self.rest.post_json(&url, &[], &request).await?;
            entry_count += page.entries.len();

            for entry in &page.entries {
                match resource_from_entry(entry) {
                    Some(record) => {
                        resources.insert(record.name.clone(), record);
                    }
                    None => trace!(resource_type = %entry.resource.kind, "Ignoring log entry"),
                }
            }

            if page.next_page_token.is_empty() {
                break;
            }
            page_token = Some(page.next_page_token);
        }

        debug!(
            project = %project_id,
            entries = entry_count,
            resources = resources.len(),
            "Log query complete"
        );
        Ok(resources)
    }
}
