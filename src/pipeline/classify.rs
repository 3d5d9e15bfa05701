// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Static classification tables
//!
//! Which asset types are workloads, which locations App Hub accepts, which
//! Kubernetes namespaces are system namespaces and how resource URIs must be
//! rewritten before lookup. The tables are plain data: the built-in defaults
//! can be replaced from the config file and are passed into every component
//! that needs them.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::gcp::model::AppHubType;

/// Well-known Kubernetes label naming the application
pub const K8S_APP_LABEL: &str = "app.kubernetes.io/name";

/// Location bucket used for multi-region and global resources
pub const GLOBAL_LOCATION: &str = "global";

/// Marker of a Kubernetes Gateway API resource URI
const GATEWAY_API_GROUP: &str = "gateway.networking.k8s.io";

/// `//{host}/projects/{project}/...`
static PROJECT_SEGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(//[^/]+/projects/)([^/]+)(/)").expect("valid regex"));

/// Asset types searched when no allowlist is supplied
const DEFAULT_ASSET_TYPES: &[&str] = &[
    // runtimes
    "run.googleapis.com/Service",
    "run.googleapis.com/Job",
    "apps.k8s.io/Deployment",
    "apps.k8s.io/DaemonSet",
    "apps.k8s.io/StatefulSet",
    "compute.googleapis.com/InstanceGroup",
    "aiplatform.googleapis.com/ReasoningEngine",
    // networking
    "compute.googleapis.com/ForwardingRule",
    "compute.googleapis.com/BackendService",
    // storage and messaging
    "storage.googleapis.com/Bucket",
    "pubsub.googleapis.com/Topic",
    "pubsub.googleapis.com/Subscription",
    // databases
    "alloydb.googleapis.com/Instance",
    "spanner.googleapis.com/Instance",
    "sqladmin.googleapis.com/Instance",
    "redis.googleapis.com/Instance",
    // config
    "secretmanager.googleapis.com/Secret",
];

const KUBERNETES_ASSET_TYPES: &[&str] = &[
    "apps.k8s.io/Deployment",
    "apps.k8s.io/DaemonSet",
    "apps.k8s.io/StatefulSet",
    "k8s.io/Service",
    "gateway.networking.k8s.io/Gateway",
];

/// Asset types registered as workloads; everything else is a service
const WORKLOAD_ASSET_TYPES: &[&str] = &[
    "apps.k8s.io/Deployment",
    "apps.k8s.io/DaemonSet",
    "apps.k8s.io/StatefulSet",
    "run.googleapis.com/Job",
    "compute.googleapis.com/InstanceGroup",
    "aiplatform.googleapis.com/ReasoningEngine",
];

const EXCLUDED_NAMESPACES: &[&str] = &[
    "kube-system",
    "gmp-system",
    "gke-managed-cim",
    "gmp-public",
    "gke-managed-system",
    "gke-managed-volumepopulator",
    "kube-node-lease",
    "kube-public",
];

/// Regions where App Hub can hold regional applications
const REGIONAL_LOCATIONS: &[&str] = &[
    "africa-south1",
    "asia-east1",
    "asia-east2",
    "asia-northeast1",
    "asia-northeast2",
    "asia-northeast3",
    "asia-south1",
    "asia-south2",
    "asia-southeast1",
    "asia-southeast2",
    "australia-southeast1",
    "australia-southeast2",
    "europe-central2",
    "europe-north1",
    "europe-north2",
    "europe-southwest1",
    "europe-west1",
    "europe-west2",
    "europe-west3",
    "europe-west4",
    "europe-west6",
    "europe-west8",
    "europe-west9",
    "europe-west10",
    "europe-west12",
    "me-central1",
    "me-central2",
    "me-west1",
    "northamerica-northeast1",
    "northamerica-northeast2",
    "northamerica-south1",
    "southamerica-east1",
    "southamerica-west1",
    "us-central1",
    "us-east1",
    "us-east4",
    "us-east5",
    "us-south1",
    "us-west1",
    "us-west2",
    "us-west3",
    "us-west4",
];

/// Locations that fold into the global bucket
const GLOBAL_LOCATIONS: &[&str] = &[
    "global", "us", "eu", "asia", "nam4", "eur4", "eur5", "asia1", "nam-eur-asia1",
];

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// A URI rewrite applied before looking up resources of `asset_type`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UriRewrite {
    pub asset_type: String,
    pub from_host: String,
    pub to_host: String,
    /// Replace the project id segment with the owning project's number
    #[serde(default)]
    pub use_project_number: bool,
}

fn default_uri_rewrites() -> Vec<UriRewrite> {
    vec![UriRewrite {
        asset_type: "sqladmin.googleapis.com/Instance".to_string(),
        from_host: "cloudsql.googleapis.com".to_string(),
        to_host: "sqladmin.googleapis.com".to_string(),
        use_project_number: true,
    }]
}

/// Where a resource lives from App Hub's point of view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    Regional(String),
    Global,
}

impl Placement {
    pub fn location(&self) -> &str {
        match self {
            Placement::Regional(region) => region,
            Placement::Global => GLOBAL_LOCATION,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Classification {
    pub workload_asset_types: Vec<String>,
    pub regional_locations: Vec<String>,
    pub global_locations: Vec<String>,
    pub excluded_namespaces: Vec<String>,
    pub default_asset_types: Vec<String>,
    pub kubernetes_asset_types: Vec<String>,
    pub uri_rewrites: Vec<UriRewrite>,
}

impl Default for Classification {
    fn default() -> Self {
        Self {
            workload_asset_types: strings(WORKLOAD_ASSET_TYPES),
            regional_locations: strings(REGIONAL_LOCATIONS),
            global_locations: strings(GLOBAL_LOCATIONS),
            excluded_namespaces: strings(EXCLUDED_NAMESPACES),
            default_asset_types: strings(DEFAULT_ASSET_TYPES),
            kubernetes_asset_types: strings(KUBERNETES_ASSET_TYPES),
            uri_rewrites: default_uri_rewrites(),
        }
    }
}

impl Classification {
    pub fn app_hub_type(&self, asset_type: &str) -> AppHubType {
        if self.workload_asset_types.iter().any(|t| t == asset_type) {
            AppHubType::Workload
        } else {
            AppHubType::Service
        }
    }

    /// Map a resource location onto a supported region or the global bucket.
    /// Zones normalize to their region.
    pub fn normalize_location(&self, location: &str) -> Option<Placement> {
        let location = location.to_ascii_lowercase();
        if self.global_locations.contains(&location) {
            return Some(Placement::Global);
        }
        if self.regional_locations.contains(&location) {
            return Some(Placement::Regional(location));
        }
        let (region, zone) = location.rsplit_once('-')?;
        let is_zone_suffix = zone.len() == 1 && zone.chars().all(|c| c.is_ascii_lowercase());
        if is_zone_suffix && self.regional_locations.iter().any(|r| r == region) {
            return Some(Placement::Regional(region.to_string()));
        }
        None
    }

    /// Rewrite a resource URI into the form App Hub indexes it under.
    /// `project` is the owning project reference, `projects/{number}`.
    pub fn rewrite_uri(&self, asset_type: &str, uri: &str, project: &str) -> String {
        let Some(rule) = self.uri_rewrites.iter().find(|r| r.asset_type == asset_type) else {
            return uri.to_string();
        };
        let rewritten = uri.replacen(&rule.from_host, &rule.to_host, 1);
        if !rule.use_project_number {
            return rewritten;
        }
        let number = project.strip_prefix("projects/").unwrap_or(project);
        if number.is_empty() {
            return rewritten;
        }
        PROJECT_SEGMENT_RE
            .replace(&rewritten, |caps: &regex::Captures| {
                format!("{}{}{}", &caps[1], number, &caps[3])
            })
            .into_owned()
    }

    /// Asset types to search: the supplied allowlist or the built-in default
    pub fn asset_types_or_default(&self, allowlist: Option<&[String]>) -> Vec<String> {
        match allowlist {
            Some(types) if !types.is_empty() => types.to_vec(),
            _ => self.default_asset_types.clone(),
        }
    }
}

pub fn is_gateway_uri(uri: &str) -> bool {
    uri.contains(GATEWAY_API_GROUP)
}

/// Parse a comma-separated asset-type allowlist, dropping blank entries
pub fn parse_asset_types(data: &str) -> Vec<String> {
    data.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
