// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! App Hub REST client
//!
//! Mutations come back as long-running operations. The returned
//! [`PendingOperation`] polls `GET v1/{operation}` until the operation is
//! done and then yields either the embedded response or the embedded error.

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, trace};

use super::error::{ApiError, Code};
use super::model::{AppHubType, Application, DiscoveredTwin, Service, Workload};
use super::operation::PendingOperation;
use super::provider::{ApplicationStore, DiscoveredLookup, ServiceStore, WorkloadStore};
use super::rest::RestClient;

pub const DEFAULT_ENDPOINT: &str = "https://apphub.googleapis.com";

/// Default delay between operation polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Operation {
    name: String,
    done: bool,
    error: Option<OperationError>,
    response: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OperationError {
    code: i32,
    message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct LookupResponse {
    discovered_service: Option<DiscoveredTwin>,
    discovered_workload: Option<DiscoveredTwin>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ListApplications {
    applications: Vec<Application>,
    next_page_token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ListServices {
    services: Vec<Service>,
    next_page_token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ListWorkloads {
    workloads: Vec<Workload>,
    next_page_token: String,
}

/// A list response page
trait Page: DeserializeOwned {
    type Item;
    fn into_parts(self) -> (Vec<Self::Item>, String);
}

impl Page for ListApplications {
    type Item = Application;
    fn into_parts(self) -> (Vec<Application>, String) {
        (self.applications, self.next_page_token)
    }
}

impl Page for ListServices {
    type Item = Service;
    fn into_parts(self) -> (Vec<Service>, String) {
        (self.services, self.next_page_token)
    }
}

impl Page for ListWorkloads {
    type Item = Workload;
    fn into_parts(self) -> (Vec<Workload>, String) {
        (self.workloads, self.next_page_token)
    }
}

#[derive(Clone)]
pub struct AppHubClient {
    rest: RestClient,
    endpoint: String,
    poll_interval: Duration,
}

impl AppHubClient {
    pub fn new(rest: RestClient, poll_interval: Duration) -> Self {
        Self::with_endpoint(rest, DEFAULT_ENDPOINT, poll_interval)
    }

    pub fn with_endpoint(
        rest: RestClient,
        endpoint: impl Into<String>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            rest,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            poll_interval,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.endpoint, path)
    }

    async fn list_all<P: Page>(&self, path: &str) -> Result<Vec<P::Item>, ApiError> {
        let url = self.url(path);
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let params: Vec<(&str, String)> = page_token
                .take()
                .map(|token| vec![("pageToken", token)])
                .unwrap_or_default();
            let page: P = self.rest.get_json(&url, &params).await?;
            let (page_items, next) = page.into_parts();
            items.extend(page_items);
            if next.is_empty() {
                break;
            }
            page_token = Some(next);
        }
        Ok(items)
    }

    /// Wrap a submitted operation so that `wait` polls it to completion
    fn pending<T, F>(&self, operation: Operation, extract: F) -> PendingOperation<T>
    where
        T: Send + 'static,
        F: FnOnce(Option<Value>) -> Result<T, ApiError> + Send + 'static,
    {
        let name = operation.name.clone();
        let client = self.clone();
        PendingOperation::new(name, async move {
            let response = client.poll(operation).await?;
            extract(response)
        })
    }

    async fn poll(&self, mut operation: Operation) -> Result<Option<Value>, ApiError> {
        while !operation.done {
            trace!(operation = %operation.name, "Operation still running");
            tokio::time::sleep(self.poll_interval).await;
            operation = self.rest.get_json(&self.url(&operation.name), &[]).await?;
        }
        debug!(operation = %operation.name, "Operation finished");
        match operation.error {
            Some(err) => Err(ApiError::new(Code::from_rpc(err.code), err.message)),
            None => Ok(operation.response),
        }
    }
}

fn decode_response<T: DeserializeOwned>(response: Option<Value>) -> Result<T, ApiError> {
    serde_json::from_value(response.unwrap_or(Value::Null)).map_err(|e| {
        ApiError::new(
            Code::Internal,
            format!("failed to decode operation response: {}", e),
        )
    })
}

#[async_trait]
impl DiscoveredLookup for AppHubClient {
    async fn lookup_discovered(
        &self,
        kind: AppHubType,
        parent: &str,
        uri: &str,
    ) -> Result<Option<DiscoveredTwin>, ApiError> {
        let collection = match kind {
            AppHubType::Service => "discoveredServices",
            AppHubType::Workload => "discoveredWorkloads",
        };
        let url = self.url(&format!("{}/{}:lookup", parent, collection));
        let found: LookupResponse = self.rest.get_json(&url, &[("uri", uri.to_string())]).await?;
        Ok(match kind {
            AppHubType::Service => found.discovered_service,
            AppHubType::Workload => found.discovered_workload,
        })
    }
}

#[async_trait]
impl ApplicationStore for AppHubClient {
    async fn get_application(&self, name: &str) -> Result<Application, ApiError> {
        self.rest.get_json(&self.url(name), &[]).await
    }

    async fn create_application(
        &self,
        parent: &str,
        application_id: &str,
        application: Application,
    ) -> Result<PendingOperation<Application>, ApiError> {
        let url = self.url(&format!("{}/applications", parent));
        let operation: Operation = self
            .rest
            .post_json(
                &url,
                &[("applicationId", application_id.to_string())],
                &application,
            )
            .await?;
        Ok(self.pending(operation, decode_response))
    }

    async fn list_applications(&self, parent: &str) -> Result<Vec<Application>, ApiError> {
        self.list_all::<ListApplications>(&format!("{}/applications", parent))
            .await
    }

    async fn delete_application(&self, name: &str) -> Result<PendingOperation<()>, ApiError> {
        let operation: Operation = self.rest.delete_json(&self.url(name)).await?;
        Ok(self.pending(operation, |_| Ok(())))
    }
}

#[async_trait]
impl ServiceStore for AppHubClient {
    async fn create_service(
        &self,
        application: &str,
        service_id: &str,
        service: Service,
    ) -> Result<PendingOperation<Service>, ApiError> {
        let url = self.url(&format!("{}/services", application));
        let operation: Operation = self
            .rest
            .post_json(&url, &[("serviceId", service_id.to_string())], &service)
            .await?;
        Ok(self.pending(operation, decode_response))
    }

    async fn list_services(&self, application: &str) -> Result<Vec<Service>, ApiError> {
        self.list_all::<ListServices>(&format!("{}/services", application))
            .await
    }

    async fn delete_service(&self, name: &str) -> Result<PendingOperation<()>, ApiError> {
        let operation: Operation = self.rest.delete_json(&self.url(name)).await?;
        Ok(self.pending(operation, |_| Ok(())))
    }
}

#[async_trait]
impl WorkloadStore for AppHubClient {
    async fn create_workload(
        &self,
        application: &str,
        workload_id: &str,
        workload: Workload,
    ) -> Result<PendingOperation<Workload>, ApiError> {
        let url = self.url(&format!("{}/workloads", application));
        let operation: Operation = self
            .rest
            .post_json(&url, &[("workloadId", workload_id.to_string())], &workload)
            .await?;
        Ok(self.pending(operation, decode_response))
    }

    async fn list_workloads(&self, application: &str) -> Result<Vec<Workload>, ApiError> {
        self.list_all::<ListWorkloads>(&format!("{}/workloads", application))
            .await
    }

    async fn delete_workload(&self, name: &str) -> Result<PendingOperation<()>, ApiError> {
        let operation: Operation = self.rest.delete_json(&self.url(name)).await?;
        Ok(self.pending(operation, |_| Ok(())))
    }
}
