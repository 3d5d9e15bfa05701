// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Failures that abort a pipeline run
//!
//! Per-resource soft failures (no discovered twin, unsupported region) never
//! become a `PipelineError`; they are logged and the resource is skipped.

use thiserror::Error;

use crate::gcp::error::ApiError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid filter criteria: {0}")]
    InvalidCriteria(String),

    #[error("no resources matched the filter in {scope}")]
    NoResourcesMatched { scope: String },

    #[error("resource discovery in {scope} failed")]
    Discovery {
        scope: String,
        #[source]
        source: ApiError,
    },

    #[error(
        "permission denied looking up {uri}: the caller needs '{permission}' on project {project}"
    )]
    PermissionDenied {
        permission: &'static str,
        project: String,
        uri: String,
        #[source]
        source: ApiError,
    },

    #[error("failed to look up application {application}")]
    ApplicationLookup {
        application: String,
        #[source]
        source: ApiError,
    },

    #[error("failed to create application {application}")]
    ApplicationCreate {
        application: String,
        #[source]
        source: ApiError,
    },

    #[error("failed to register {resource} with application {application}")]
    Registration {
        application: String,
        resource: String,
        #[source]
        source: ApiError,
    },

    #[error("unexpected discovered resource name '{0}'")]
    InvalidDiscoveredName(String),

    #[error("failed to {action} {name}")]
    Teardown {
        action: &'static str,
        name: String,
        #[source]
        source: ApiError,
    },
}

impl PipelineError {
    /// The remote error underneath, if any
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            PipelineError::Discovery { source, .. }
            | PipelineError::PermissionDenied { source, .. }
            | PipelineError::ApplicationLookup { source, .. }
            | PipelineError::ApplicationCreate { source, .. }
            | PipelineError::Registration { source, .. }
            | PipelineError::Teardown { source, .. } => Some(source),
            PipelineError::InvalidCriteria(_)
            | PipelineError::NoResourcesMatched { .. }
            | PipelineError::InvalidDiscoveredName(_) => None,
        }
    }
}
