// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Group-key resolution: which application a resource belongs to

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::classify::K8S_APP_LABEL;
use super::criteria::FilterMode;
use crate::gcp::model::{ResourceRecord, Tag, last_segment};
use crate::gcp::provider::ProjectDirectory;

/// Group key used when a resource does not carry the requested label or tag
pub const UNKNOWN_GROUP: &str = "unknown";

/// Substring that marks a label or tag key as naming the application
const APP_KEY_MARKER: &str = "app";

/// First 7 hex characters of the SHA-256 of `input`
pub fn short_hash(input: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(input.as_bytes()));
    digest[..7].to_string()
}

/// A group key must start with a lowercase letter to be a usable application id
fn is_valid_key(value: &str) -> bool {
    value.starts_with(|c: char| c.is_ascii_lowercase())
}

/// Path segment following `marker` in a slash-separated path
fn segment_after<'p>(path: &'p str, marker: &str) -> Option<&'p str> {
    let mut segments = path.split('/');
    segments.find(|s| *s == marker)?;
    segments.next().filter(|s| !s.is_empty())
}

/// `{namespace}-{hash(cluster)}-{hash(project)}` from a Kubernetes parent path like
/// `//container.googleapis.com/projects/p/locations/l/clusters/c/k8s/namespaces/ns`
pub fn namespace_key(parent: &str) -> Option<String> {
    let project = segment_after(parent, "projects")?;
    let cluster = segment_after(parent, "clusters")?;
    let namespace = segment_after(parent, "namespaces")?;
    Some(format!(
        "{}-{}-{}",
        namespace,
        short_hash(cluster),
        short_hash(project)
    ))
}

/// Direct tags first, then inherited ones
fn all_tags(record: &ResourceRecord) -> impl Iterator<Item = &Tag> {
    record.tags.iter().chain(record.inherited_tags())
}

pub struct GroupKeyResolver<'a> {
    projects: &'a dyn ProjectDirectory,
}

impl<'a> GroupKeyResolver<'a> {
    pub fn new(projects: &'a dyn ProjectDirectory) -> Self {
        Self { projects }
    }

    /// Application name for `record` under `mode`.
    ///
    /// Explicit values (label/tag value, substring, log label value, project
    /// app name) are used as is. Key-only label and tag modes read the
    /// resource's value for that key; a resource without it groups under
    /// `"unknown"`, as does a Kubernetes resource outside any namespace or
    /// without the app label.
    pub async fn resolve(&self, record: &ResourceRecord, mode: &FilterMode) -> String {
        match mode {
            FilterMode::Label {
                value: Some(value), ..
            }
            | FilterMode::Tag {
                value: Some(value), ..
            }
            | FilterMode::LogLabel { value, .. } => value.clone(),
            FilterMode::Label { key, value: None } => record
                .labels
                .get(key)
                .cloned()
                .unwrap_or_else(|| UNKNOWN_GROUP.to_string()),
            FilterMode::Tag { key, value: None } => {
                let wanted = last_segment(key);
                all_tags(record)
                    .find(|tag| last_segment(&tag.tag_key) == wanted)
                    .map(|tag| last_segment(&tag.tag_value).to_string())
                    .unwrap_or_else(|| UNKNOWN_GROUP.to_string())
            }
            FilterMode::NameContains(substring) => substring.clone(),
            FilterMode::KubernetesNamespace => namespace_key(&record.parent_full_resource_name)
                .unwrap_or_else(|| {
                    warn!(
                        resource = %record.name,
                        parent = %record.parent_full_resource_name,
                        "Resource is not inside a Kubernetes namespace"
                    );
                    UNKNOWN_GROUP.to_string()
                }),
            FilterMode::KubernetesAppLabel => record
                .labels
                .get(K8S_APP_LABEL)
                .cloned()
                .unwrap_or_else(|| UNKNOWN_GROUP.to_string()),
            FilterMode::AutoDetect => self.auto_detect(record).await,
            FilterMode::Projects { app_name, .. } => app_name.clone(),
        }
    }

    async fn auto_detect(&self, record: &ResourceRecord) -> String {
        match Self::detect_from_metadata(record) {
            Some(key) => key,
            None => self.project_fallback(&record.project).await,
        }
    }

    /// First app-like label or tag with a usable value
    fn detect_from_metadata(record: &ResourceRecord) -> Option<String> {
        let from_k8s_label = record.labels.get(K8S_APP_LABEL).into_iter();
        let from_labels = record
            .labels
            .iter()
            .filter(|(key, _)| key.contains(APP_KEY_MARKER))
            .map(|(_, value)| value);
        let from_labels = from_k8s_label
            .chain(from_labels)
            .map(String::as_str);
        let from_tags = all_tags(record)
            .filter(|tag| last_segment(&tag.tag_key).contains(APP_KEY_MARKER))
            .map(|tag| last_segment(&tag.tag_value));

        from_labels
            .chain(from_tags)
            .find(|value| is_valid_key(value))
            .map(String::from)
    }

    /// Human-readable project id, or the raw project reference when it cannot be resolved
    async fn project_fallback(&self, project: &str) -> String {
        let is_number_ref = project
            .strip_prefix("projects/")
            .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()));
        if !is_number_ref {
            return project.to_string();
        }
        match self.projects.project_id(project).await {
            Ok(id) if !id.is_empty() => id,
            Ok(_) => project.to_string(),
            Err(e) => {
                debug!(project = %project, error = %e, "Project id lookup failed");
                project.to_string()
            }
        }
    }
}
