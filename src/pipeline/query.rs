// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Filter expressions for Cloud Asset search and Cloud Logging
//!
//! Pure string construction. A search query is the conjunction of a location
//! clause, the predicate block of the active mode and, for tag and Kubernetes
//! oriented modes, exclusions for the system namespaces.

use super::classify::{Classification, K8S_APP_LABEL};
use super::criteria::FilterMode;
use crate::gcp::logging::CONTROLLER_TYPE_LABEL;

/// Monitored resource types that log-based discovery understands
const LOG_RESOURCE_TYPES: &[&str] = &["cloud_run_revision", "k8s_pod", "gce_instance_group"];

pub struct QueryBuilder<'a> {
    classification: &'a Classification,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(classification: &'a Classification) -> Self {
        Self { classification }
    }

    /// Asset search query for `mode`, or `None` for modes that do not map to a
    /// single search (log labels, auto-detect)
    pub fn search_query(&self, mode: &FilterMode, locations: &[String]) -> Option<String> {
        let mut parts = vec![location_clause(locations)];

        match mode {
            FilterMode::Label { key, value } => parts.push(match value {
                Some(value) => format!("labels.{}:{}", key, value),
                None => format!("labels:{}", key),
            }),
            FilterMode::Tag { key, value } => {
                parts.push(match value {
                    Some(value) => format!(
                        "((tagKeys:{k} AND tagValues:{v}) OR (effectiveTagKeys:{k} AND effectiveTagValues:{v}))",
                        k = key,
                        v = value
                    ),
                    None => format!("(tagKeys:{k} OR effectiveTagKeys:{k})", k = key),
                });
                parts.extend(
                    self.classification
                        .excluded_namespaces
                        .iter()
                        .map(|ns| format!("NOT parentFullResourceName : \"{}\"", ns)),
                );
            }
            FilterMode::NameContains(substring) => parts.push(format!("name:{}", substring)),
            FilterMode::KubernetesNamespace => parts.extend(self.namespace_exclusion()),
            FilterMode::KubernetesAppLabel => {
                parts.push(format!("labels.\"{}\":*", K8S_APP_LABEL));
                parts.extend(self.namespace_exclusion());
            }
            FilterMode::Projects { project_ids, .. } => {
                parts.extend(self.namespace_exclusion());
                // A single project is already the search scope
                if project_ids.len() > 1 {
                    parts.push(disjunction(
                        project_ids.iter().map(|p| format!("projects/{}", p)),
                    ));
                }
            }
            FilterMode::LogLabel { .. } | FilterMode::AutoDetect => return None,
        }

        Some(parts.join(" AND "))
    }

    /// `NOT (parentFullResourceName : "a" OR ...)`
    fn namespace_exclusion(&self) -> Option<String> {
        if self.classification.excluded_namespaces.is_empty() {
            return None;
        }
        let clauses: Vec<String> = self
            .classification
            .excluded_namespaces
            .iter()
            .map(|ns| format!("parentFullResourceName : \"{}\"", ns))
            .collect();
        Some(format!("NOT ({})", clauses.join(" OR ")))
    }

    /// Cloud Logging filter selecting entries labelled `key=value` from the
    /// supported monitored resource types in `locations`
    pub fn log_filter(&self, key: &str, value: &str, locations: &[String]) -> String {
        let locations = locations
            .iter()
            .map(|l| format!("resource.labels.location=\"{}\"", l))
            .collect::<Vec<_>>()
            .join(" OR ");
        let resource_types = LOG_RESOURCE_TYPES
            .iter()
            .map(|t| match *t {
                "k8s_pod" => format!(
                    "(resource.type=\"{}\" AND labels.\"{}\"=\"Deployment\")",
                    t, CONTROLLER_TYPE_LABEL
                ),
                _ => format!("resource.type=\"{}\"", t),
            })
            .collect::<Vec<_>>()
            .join(" OR ");
        format!(
            "({}) AND (labels.{}=\"{}\") AND ({})",
            locations, key, value, resource_types
        )
    }
}

/// `location:a` for one location, `location:(a OR b)` for several
fn location_clause(locations: &[String]) -> String {
    match locations {
        [single] => format!("location:{}", single),
        many => format!("location:({})", many.join(" OR ")),
    }
}

/// `a` for one term, `(a OR b)` for several
fn disjunction(terms: impl Iterator<Item = String>) -> String {
    let terms: Vec<String> = terms.collect();
    match terms.as_slice() {
        [single] => single.clone(),
        many => format!("({})", many.join(" OR ")),
    }
}
