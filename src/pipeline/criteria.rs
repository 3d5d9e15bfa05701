// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! User-level selection of the resources to group

use std::fmt;

use super::classify::GLOBAL_LOCATION;
use super::error::PipelineError;
use crate::gcp::model::ScopeType;

/// The grouping mode. Exactly one is active per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterMode {
    /// Resources carrying label `key` (optionally with `value`)
    Label { key: String, value: Option<String> },
    /// Resources carrying tag `key` (optionally with `value`), directly or inherited
    Tag { key: String, value: Option<String> },
    /// Resources whose name contains the substring
    NameContains(String),
    /// Resources whose log entries carry label `key=value`
    LogLabel { key: String, value: String },
    /// One application per Kubernetes namespace
    KubernetesNamespace,
    /// One application per `app.kubernetes.io/name` value
    KubernetesAppLabel,
    /// Guess the application from app-like labels and tags
    AutoDetect,
    /// Everything in the listed projects goes into one application
    Projects {
        project_ids: Vec<String>,
        app_name: String,
    },
}

impl FilterMode {
    fn validate(&self) -> Result<(), String> {
        fn non_empty(what: &str, value: &str) -> Result<(), String> {
            if value.trim().is_empty() {
                Err(format!("{} must not be empty", what))
            } else {
                Ok(())
            }
        }
        match self {
            FilterMode::Label { key, .. } => non_empty("label key", key),
            FilterMode::Tag { key, .. } => non_empty("tag key", key),
            FilterMode::NameContains(substring) => non_empty("name filter", substring),
            FilterMode::LogLabel { key, value } => {
                non_empty("log label key", key)?;
                non_empty("log label value", value)
            }
            FilterMode::KubernetesNamespace
            | FilterMode::KubernetesAppLabel
            | FilterMode::AutoDetect => Ok(()),
            FilterMode::Projects {
                project_ids,
                app_name,
            } => {
                if project_ids.iter().all(|p| p.trim().is_empty()) {
                    return Err("at least one project id is required".to_string());
                }
                if !app_name.starts_with(|c: char| c.is_ascii_lowercase()) {
                    return Err(format!(
                        "application name '{}' must start with a lowercase letter",
                        app_name
                    ));
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterMode::Label { key, value: None } => write!(f, "label {}", key),
            FilterMode::Label {
                key,
                value: Some(v),
            } => write!(f, "label {}={}", key, v),
            FilterMode::Tag { key, value: None } => write!(f, "tag {}", key),
            FilterMode::Tag {
                key,
                value: Some(v),
            } => write!(f, "tag {}={}", key, v),
            FilterMode::NameContains(s) => write!(f, "name contains {}", s),
            FilterMode::LogLabel { key, value } => write!(f, "log label {}={}", key, value),
            FilterMode::KubernetesNamespace => f.write_str("kubernetes namespace"),
            FilterMode::KubernetesAppLabel => f.write_str("kubernetes app label"),
            FilterMode::AutoDetect => f.write_str("auto-detect"),
            FilterMode::Projects { app_name, .. } => write!(f, "projects as {}", app_name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriteria {
    pub mode: FilterMode,
    pub locations: Vec<String>,
    /// Asset types to search; `None` uses the built-in list
    pub asset_types: Option<Vec<String>>,
}

impl FilterCriteria {
    /// Build criteria, rejecting empty or inconsistent input
    pub fn new(
        mode: FilterMode,
        locations: Vec<String>,
        asset_types: Option<Vec<String>>,
    ) -> Result<Self, PipelineError> {
        let locations: Vec<String> = locations
            .into_iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
        if locations.is_empty() {
            return Err(PipelineError::InvalidCriteria(
                "at least one location is required".to_string(),
            ));
        }
        mode.validate().map_err(PipelineError::InvalidCriteria)?;
        // Empty values mean "key only"
        let mode = match mode {
            FilterMode::Label { key, value } => FilterMode::Label {
                key,
                value: value.filter(|v| !v.is_empty()),
            },
            FilterMode::Tag { key, value } => FilterMode::Tag {
                key,
                value: value.filter(|v| !v.is_empty()),
            },
            other => other,
        };
        Ok(Self {
            mode,
            locations,
            asset_types,
        })
    }

    /// GLOBAL when more than one location is targeted or the only one is global
    pub fn app_scope(&self) -> ScopeType {
        match self.locations.as_slice() {
            [single] if single != GLOBAL_LOCATION => ScopeType::Regional,
            _ => ScopeType::Global,
        }
    }

    /// Location the applications are created in
    pub fn application_location(&self) -> &str {
        match self.app_scope() {
            ScopeType::Regional => &self.locations[0],
            _ => GLOBAL_LOCATION,
        }
    }
}
