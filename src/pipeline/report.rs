// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Accumulated report of generated applications
//!
//! Each application maps to a flat list that grows by three entries per
//! resource: discovered id, App Hub type and resource name.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::gcp::model::AppHubType;

/// Entries added per resource
pub const FIELDS_PER_RESOURCE: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeneratedApplications {
    applications: IndexMap<String, Vec<String>>,
}

/// One resource row of the report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow<'a> {
    pub application: &'a str,
    pub discovered_id: &'a str,
    pub app_hub_type: &'a str,
    pub resource: &'a str,
}

impl GeneratedApplications {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        application: &str,
        discovered_id: &str,
        app_hub_type: AppHubType,
        resource: &str,
    ) {
        self.applications
            .entry(application.to_string())
            .or_default()
            .extend([
                discovered_id.to_string(),
                app_hub_type.as_str().to_string(),
                resource.to_string(),
            ]);
    }

    pub fn get(&self, application: &str) -> Option<&[String]> {
        self.applications.get(application).map(Vec::as_slice)
    }

    /// Application names in first-seen order
    pub fn applications(&self) -> impl Iterator<Item = &str> {
        self.applications.keys().map(String::as_str)
    }

    /// Number of applications
    pub fn len(&self) -> usize {
        self.applications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.applications.is_empty()
    }

    /// Number of recorded resources across all applications
    pub fn resource_count(&self) -> usize {
        self.applications
            .values()
            .map(|entries| entries.len() / FIELDS_PER_RESOURCE)
            .sum()
    }

    /// One row per recorded resource
    pub fn rows(&self) -> impl Iterator<Item = ReportRow<'_>> {
        self.applications.iter().flat_map(|(application, entries)| {
            entries
                .chunks_exact(FIELDS_PER_RESOURCE)
                .map(move |chunk| ReportRow {
                    application,
                    discovered_id: &chunk[0],
                    app_hub_type: &chunk[1],
                    resource: &chunk[2],
                })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_list_per_application() {
        let mut report = GeneratedApplications::new();
        report.record("checkout", "svc-1", AppHubType::Service, "checkout-api");
        report.record("orders", "wl-2", AppHubType::Workload, "orders-worker");
        report.record("checkout", "svc-3", AppHubType::Service, "checkout-db");

        assert_eq!(report.len(), 2);
        assert_eq!(report.resource_count(), 3);
        assert_eq!(
            report.get("checkout").unwrap(),
            &[
                "svc-1",
                "discoveredService",
                "checkout-api",
                "svc-3",
                "discoveredService",
                "checkout-db"
            ]
        );
        let apps: Vec<_> = report.applications().collect();
        assert_eq!(apps, vec!["checkout", "orders"]);
    }

    #[test]
    fn test_rows() {
        let mut report = GeneratedApplications::new();
        report.record("checkout", "svc-1", AppHubType::Service, "checkout-api");
        report.record("checkout", "wl-2", AppHubType::Workload, "checkout-job");

        let rows: Vec<_> = report.rows().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].application, "checkout");
        assert_eq!(rows[1].discovered_id, "wl-2");
        assert_eq!(rows[1].app_hub_type, "discoveredWorkload");
        assert_eq!(rows[1].resource, "checkout-job");
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let mut report = GeneratedApplications::new();
        report.record("checkout", "svc-1", AppHubType::Service, "checkout-api");
        let json = serde_json::to_string(&report).unwrap();
        assert_eq!(
            json,
            r#"{"checkout":["svc-1","discoveredService","checkout-api"]}"#
        );
        assert!(GeneratedApplications::new().is_empty());
    }
}
