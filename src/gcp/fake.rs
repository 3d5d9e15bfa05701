// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! In-memory stand-ins for the remote services, used by the pipeline tests

use async_trait::async_trait;
use indexmap::IndexMap;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::error::{ApiError, Code};
use super::model::{AppHubType, Application, DiscoveredTwin, ResourceRecord, Service, Workload};
use super::operation::PendingOperation;
use super::provider::{
    ApplicationStore, DiscoveredLookup, LogQuery, ProjectDirectory, ResourceSearch,
    SearchRequest, ServiceStore, WorkloadStore,
};

/// Number of calls made against each catalog operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Calls {
    pub lookups: usize,
    pub get_application: usize,
    pub create_application: usize,
    pub create_service: usize,
    pub create_workload: usize,
    pub delete_application: usize,
    pub delete_service: usize,
    pub delete_workload: usize,
}

impl Calls {
    pub fn mutations(&self) -> usize {
        self.create_application
            + self.create_service
            + self.create_workload
            + self.delete_application
            + self.delete_service
            + self.delete_workload
    }
}

#[derive(Default)]
struct State {
    twins: HashMap<(AppHubType, String, String), DiscoveredTwin>,
    lookup_errors: HashMap<(String, String), ApiError>,
    applications: BTreeMap<String, Application>,
    services: BTreeMap<String, Service>,
    workloads: BTreeMap<String, Workload>,
    /// Keyed by the requested id (application/service/workload id)
    create_errors: HashMap<String, ApiError>,
    /// Keyed by full resource name
    delete_errors: HashMap<String, ApiError>,
    get_errors: HashMap<String, ApiError>,
    delete_delay: Duration,
    in_flight: usize,
    max_in_flight: usize,
    calls: Calls,
}

/// Decrements the in-flight deletion count when the deletion finishes or is dropped
struct InFlight(Arc<Mutex<State>>);

impl InFlight {
    fn start(state: &Arc<Mutex<State>>) -> Self {
        let mut guard = lock(state);
        guard.in_flight += 1;
        guard.max_in_flight = guard.max_in_flight.max(guard.in_flight);
        drop(guard);
        Self(state.clone())
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        lock(&self.0).in_flight -= 1;
    }
}

fn lock(state: &Arc<Mutex<State>>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A fake App Hub backed by maps
#[derive(Clone, Default)]
pub struct FakeCatalog {
    state: Arc<Mutex<State>>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        lock(&self.state)
    }

    /// Make `uri` discoverable under `parent`, returning the twin's name
    pub fn add_twin(&self, kind: AppHubType, parent: &str, uri: &str, id: &str) -> String {
        let collection = match kind {
            AppHubType::Service => "discoveredServices",
            AppHubType::Workload => "discoveredWorkloads",
        };
        let name = format!("{}/{}/{}", parent, collection, id);
        self.state().twins.insert(
            (kind, parent.to_string(), uri.to_string()),
            DiscoveredTwin { name: name.clone() },
        );
        name
    }

    pub fn fail_lookup(&self, parent: &str, uri: &str, err: ApiError) {
        self.state()
            .lookup_errors
            .insert((parent.to_string(), uri.to_string()), err);
    }

    pub fn fail_get(&self, name: &str, err: ApiError) {
        self.state().get_errors.insert(name.to_string(), err);
    }

    pub fn fail_create(&self, id: &str, err: ApiError) {
        self.state().create_errors.insert(id.to_string(), err);
    }

    pub fn fail_delete(&self, name: &str, err: ApiError) {
        self.state().delete_errors.insert(name.to_string(), err);
    }

    pub fn set_delete_delay(&self, delay: Duration) {
        self.state().delete_delay = delay;
    }

    pub fn insert_application(&self, name: &str) {
        self.state().applications.insert(
            name.to_string(),
            Application {
                name: name.to_string(),
                state: "ACTIVE".to_string(),
                ..Default::default()
            },
        );
    }

    pub fn insert_service(&self, application: &str, id: &str, discovered: &str) {
        let name = format!("{}/services/{}", application, id);
        self.state().services.insert(
            name.clone(),
            Service {
                name,
                discovered_service: discovered.to_string(),
                ..Default::default()
            },
        );
    }

    pub fn insert_workload(&self, application: &str, id: &str, discovered: &str) {
        let name = format!("{}/workloads/{}", application, id);
        self.state().workloads.insert(
            name.clone(),
            Workload {
                name,
                discovered_workload: discovered.to_string(),
                ..Default::default()
            },
        );
    }

    pub fn application(&self, name: &str) -> Option<Application> {
        self.state().applications.get(name).cloned()
    }

    pub fn application_names(&self) -> Vec<String> {
        self.state().applications.keys().cloned().collect()
    }

    pub fn services(&self) -> Vec<Service> {
        self.state().services.values().cloned().collect()
    }

    pub fn workloads(&self) -> Vec<Workload> {
        self.state().workloads.values().cloned().collect()
    }

    pub fn calls(&self) -> Calls {
        self.state().calls.clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.state().max_in_flight
    }

    fn parent_exists(&self, application: &str) -> Result<(), ApiError> {
        if self.state().applications.contains_key(application) {
            Ok(())
        } else {
            Err(ApiError::new(
                Code::NotFound,
                format!("application {} not found", application),
            ))
        }
    }

    /// Shared deletion flow: submission errors are immediate, removal happens on wait
    fn delete_with<F>(&self, name: &str, remove: F) -> Result<PendingOperation<()>, ApiError>
    where
        F: FnOnce(&mut State) -> bool + Send + 'static,
    {
        if let Some(err) = self.state().delete_errors.get(name).cloned() {
            return Err(err);
        }
        let guard = InFlight::start(&self.state);
        let state = self.state.clone();
        let delay = self.state().delete_delay;
        let missing = format!("{} not found", name);
        Ok(PendingOperation::new(
            format!("operations/delete-{}", name),
            async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                let removed = remove(&mut lock(&state));
                drop(guard);
                if removed {
                    Ok(())
                } else {
                    Err(ApiError::new(Code::NotFound, missing))
                }
            },
        ))
    }
}

#[async_trait]
impl DiscoveredLookup for FakeCatalog {
    async fn lookup_discovered(
        &self,
        kind: AppHubType,
        parent: &str,
        uri: &str,
    ) -> Result<Option<DiscoveredTwin>, ApiError> {
        let mut state = self.state();
        state.calls.lookups += 1;
        if let Some(err) = state
            .lookup_errors
            .get(&(parent.to_string(), uri.to_string()))
        {
            return Err(err.clone());
        }
        Ok(state
            .twins
            .get(&(kind, parent.to_string(), uri.to_string()))
            .cloned())
    }
}

#[async_trait]
impl ApplicationStore for FakeCatalog {
    async fn get_application(&self, name: &str) -> Result<Application, ApiError> {
        let mut state = self.state();
        state.calls.get_application += 1;
        if let Some(err) = state.get_errors.get(name) {
            return Err(err.clone());
        }
        state.applications.get(name).cloned().ok_or_else(|| {
            ApiError::new(Code::NotFound, format!("application {} not found", name))
        })
    }

    async fn create_application(
        &self,
        parent: &str,
        application_id: &str,
        mut application: Application,
    ) -> Result<PendingOperation<Application>, ApiError> {
        let name = format!("{}/applications/{}", parent, application_id);
        {
            let mut state = self.state();
            state.calls.create_application += 1;
            if let Some(err) = state.create_errors.get(application_id) {
                return Err(err.clone());
            }
            if state.applications.contains_key(&name) {
                return Err(ApiError::new(Code::AlreadyExists, format!("{} exists", name)));
            }
        }
        application.name = name.clone();
        application.state = "ACTIVE".to_string();
        let state = self.state.clone();
        Ok(PendingOperation::new(
            format!("operations/create-{}", name),
            async move {
                lock(&state)
                    .applications
                    .insert(name, application.clone());
                Ok(application)
            },
        ))
    }

    async fn list_applications(&self, parent: &str) -> Result<Vec<Application>, ApiError> {
        let prefix = format!("{}/applications/", parent);
        Ok(self
            .state()
            .applications
            .values()
            .filter(|app| app.name.starts_with(&prefix))
            .cloned()
            .collect())
    }

    async fn delete_application(&self, name: &str) -> Result<PendingOperation<()>, ApiError> {
        {
            let mut state = self.state();
            state.calls.delete_application += 1;
            let prefix = format!("{}/", name);
            let has_children = state.services.keys().any(|s| s.starts_with(&prefix))
                || state.workloads.keys().any(|w| w.starts_with(&prefix));
            if has_children {
                return Err(ApiError::new(
                    Code::FailedPrecondition,
                    format!("application {} still has services or workloads", name),
                ));
            }
        }
        let key = name.to_string();
        self.delete_with(name, move |state| state.applications.remove(&key).is_some())
    }
}

#[async_trait]
impl ServiceStore for FakeCatalog {
    async fn create_service(
        &self,
        application: &str,
        service_id: &str,
        mut service: Service,
    ) -> Result<PendingOperation<Service>, ApiError> {
        self.state().calls.create_service += 1;
        self.parent_exists(application)?;
        let name = format!("{}/services/{}", application, service_id);
        {
            let state = self.state();
            if let Some(err) = state.create_errors.get(service_id) {
                return Err(err.clone());
            }
            if state.services.contains_key(&name) {
                return Err(ApiError::new(Code::AlreadyExists, format!("{} exists", name)));
            }
        }
        service.name = name.clone();
        let state = self.state.clone();
        Ok(PendingOperation::new(
            format!("operations/create-{}", name),
            async move {
                let mut state = lock(&state);
                // A discovered service can only be registered once
                if state
                    .services
                    .values()
                    .any(|s| s.discovered_service == service.discovered_service)
                {
                    return Err(ApiError::new(
                        Code::FailedPrecondition,
                        format!("{} is already registered", service.discovered_service),
                    ));
                }
                state.services.insert(name, service.clone());
                Ok(service)
            },
        ))
    }

    async fn list_services(&self, application: &str) -> Result<Vec<Service>, ApiError> {
        let prefix = format!("{}/services/", application);
        Ok(self
            .state()
            .services
            .values()
            .filter(|s| s.name.starts_with(&prefix))
            .cloned()
            .collect())
    }

    async fn delete_service(&self, name: &str) -> Result<PendingOperation<()>, ApiError> {
        self.state().calls.delete_service += 1;
        let key = name.to_string();
        self.delete_with(name, move |state| state.services.remove(&key).is_some())
    }
}

#[async_trait]
impl WorkloadStore for FakeCatalog {
    async fn create_workload(
        &self,
        application: &str,
        workload_id: &str,
        mut workload: Workload,
    ) -> Result<PendingOperation<Workload>, ApiError> {
        self.state().calls.create_workload += 1;
        self.parent_exists(application)?;
        let name = format!("{}/workloads/{}", application, workload_id);
        {
            let state = self.state();
            if let Some(err) = state.create_errors.get(workload_id) {
                return Err(err.clone());
            }
            if state.workloads.contains_key(&name) {
                return Err(ApiError::new(Code::AlreadyExists, format!("{} exists", name)));
            }
        }
        workload.name = name.clone();
        let state = self.state.clone();
        Ok(PendingOperation::new(
            format!("operations/create-{}", name),
            async move {
                let mut state = lock(&state);
                if state
                    .workloads
                    .values()
                    .any(|w| w.discovered_workload == workload.discovered_workload)
                {
                    return Err(ApiError::new(
                        Code::FailedPrecondition,
                        format!("{} is already registered", workload.discovered_workload),
                    ));
                }
                state.workloads.insert(name, workload.clone());
                Ok(workload)
            },
        ))
    }

    async fn list_workloads(&self, application: &str) -> Result<Vec<Workload>, ApiError> {
        let prefix = format!("{}/workloads/", application);
        Ok(self
            .state()
            .workloads
            .values()
            .filter(|w| w.name.starts_with(&prefix))
            .cloned()
            .collect())
    }

    async fn delete_workload(&self, name: &str) -> Result<PendingOperation<()>, ApiError> {
        self.state().calls.delete_workload += 1;
        let key = name.to_string();
        self.delete_with(name, move |state| state.workloads.remove(&key).is_some())
    }
}

/// Replays queued search results and records every request
#[derive(Default)]
pub struct FakeSearch {
    responses: Mutex<VecDeque<Result<Vec<ResourceRecord>, ApiError>>>,
    requests: Mutex<Vec<SearchRequest>>,
}

impl FakeSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, result: Result<Vec<ResourceRecord>, ApiError>) -> &Self {
        self.responses
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push_back(result);
        self
    }

    pub fn requests(&self) -> Vec<SearchRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

#[async_trait]
impl ResourceSearch for FakeSearch {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<ResourceRecord>, ApiError> {
        self.requests
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(request.clone());
        self.responses
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Returns a fixed set of log-derived resources
#[derive(Default)]
pub struct FakeLogs {
    resources: IndexMap<String, ResourceRecord>,
    queries: Mutex<Vec<(String, String)>>,
}

impl FakeLogs {
    pub fn new(records: Vec<ResourceRecord>) -> Self {
        Self {
            resources: records.into_iter().map(|r| (r.name.clone(), r)).collect(),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<(String, String)> {
        self.queries
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

#[async_trait]
impl LogQuery for FakeLogs {
    async fn query_logs(
        &self,
        project_id: &str,
        filter: &str,
    ) -> Result<IndexMap<String, ResourceRecord>, ApiError> {
        self.queries
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push((project_id.to_string(), filter.to_string()));
        Ok(self.resources.clone())
    }
}

/// Project number to project id table
#[derive(Default)]
pub struct FakeProjects {
    ids: HashMap<String, String>,
}

impl FakeProjects {
    pub fn new(entries: &[(&str, &str)]) -> Self {
        Self {
            ids: entries
                .iter()
                .map(|(number, id)| (number.to_string(), id.to_string()))
                .collect(),
        }
    }
}

#[async_trait]
impl ProjectDirectory for FakeProjects {
    async fn project_id(&self, project: &str) -> Result<String, ApiError> {
        self.ids
            .get(project)
            .cloned()
            .ok_or_else(|| ApiError::new(Code::NotFound, format!("{} not found", project)))
    }
}
