// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Capability traits for the remote services the pipeline talks to
//!
//! Each trait covers one concern so tests can swap in a fake for exactly the
//! behavior under test. The REST clients in this module tree implement them
//! against the real APIs.

use async_trait::async_trait;
use indexmap::IndexMap;

use super::error::ApiError;
use super::model::{AppHubType, Application, DiscoveredTwin, ResourceRecord, Service, Workload};
use super::operation::PendingOperation;

/// One resource search against Cloud Asset Inventory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchRequest {
    /// `projects/{id}`, `folders/{id}` or `organizations/{id}`
    pub scope: String,
    pub query: String,
    pub asset_types: Vec<String>,
    pub page_size: u32,
    pub order_by: Option<String>,
}

#[async_trait]
pub trait ResourceSearch: Send + Sync {
    /// Return every matching record, following pagination to the end
    async fn search(&self, request: &SearchRequest) -> Result<Vec<ResourceRecord>, ApiError>;
}

#[async_trait]
pub trait LogQuery: Send + Sync {
    /// Resources derived from log entries matching `filter`, keyed by resource URI
    async fn query_logs(
        &self,
        project_id: &str,
        filter: &str,
    ) -> Result<IndexMap<String, ResourceRecord>, ApiError>;
}

#[async_trait]
pub trait ProjectDirectory: Send + Sync {
    /// Resolve `projects/{number}` to the human-readable project id
    async fn project_id(&self, project: &str) -> Result<String, ApiError>;
}

#[async_trait]
pub trait DiscoveredLookup: Send + Sync {
    /// Find App Hub's discovered service/workload for a resource URI.
    /// `parent` is `projects/{p}/locations/{l}`.
    async fn lookup_discovered(
        &self,
        kind: AppHubType,
        parent: &str,
        uri: &str,
    ) -> Result<Option<DiscoveredTwin>, ApiError>;
}

#[async_trait]
pub trait ApplicationStore: Send + Sync {
    /// `name` is the full resource name `projects/{p}/locations/{l}/applications/{id}`
    async fn get_application(&self, name: &str) -> Result<Application, ApiError>;

    async fn create_application(
        &self,
        parent: &str,
        application_id: &str,
        application: Application,
    ) -> Result<PendingOperation<Application>, ApiError>;

    async fn list_applications(&self, parent: &str) -> Result<Vec<Application>, ApiError>;

    async fn delete_application(&self, name: &str) -> Result<PendingOperation<()>, ApiError>;
}

#[async_trait]
pub trait ServiceStore: Send + Sync {
    async fn create_service(
        &self,
        application: &str,
        service_id: &str,
        service: Service,
    ) -> Result<PendingOperation<Service>, ApiError>;

    async fn list_services(&self, application: &str) -> Result<Vec<Service>, ApiError>;

    async fn delete_service(&self, name: &str) -> Result<PendingOperation<()>, ApiError>;
}

#[async_trait]
pub trait WorkloadStore: Send + Sync {
    async fn create_workload(
        &self,
        application: &str,
        workload_id: &str,
        workload: Workload,
    ) -> Result<PendingOperation<Workload>, ApiError>;

    async fn list_workloads(&self, application: &str) -> Result<Vec<Workload>, ApiError>;

    async fn delete_workload(&self, name: &str) -> Result<PendingOperation<()>, ApiError>;
}

/// Everything App Hub offers the pipeline
pub trait Catalog: DiscoveredLookup + ApplicationStore + ServiceStore + WorkloadStore {}

impl<T> Catalog for T where T: DiscoveredLookup + ApplicationStore + ServiceStore + WorkloadStore {}
