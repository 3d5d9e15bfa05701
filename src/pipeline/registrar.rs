// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Per-resource registration
//!
//! For each discovered resource:
//! 1. normalize its location onto a supported region or the global bucket
//! 2. look up App Hub's discovered service/workload for it
//! 3. resolve the application it belongs to and record it in the report
//! 4. stop here in report-only mode
//! 5. get or create the application
//! 6. register the resource as a service or workload of the application
//!
//! Lookup problems skip the resource. Create and register failures abort the
//! run, except for the duplicates that mean "already done".

use std::fmt;
use tracing::{debug, info, warn};

use super::classify::{Classification, GLOBAL_LOCATION, Placement, is_gateway_uri};
use super::criteria::FilterMode;
use super::error::PipelineError;
use super::group_key::GroupKeyResolver;
use super::report::GeneratedApplications;
use crate::gcp::error::{ApiError, Code};
use crate::gcp::model::{
    AppHubType, Application, Attributes, DiscoveredTwin, ResourceRecord, Scope, ScopeType,
    Service, Workload,
};
use crate::gcp::provider::Catalog;
use crate::progress::ProgressHandle;

/// Maximum length of an App Hub resource id or display name
const MAX_NAME_RUNES: usize = 63;

/// Room left for the display-name part of a registration id
const MAX_PREFIX_RUNES: usize = 50;

/// Cap a name at 63 characters
pub fn truncate_name(name: &str) -> String {
    name.chars().take(MAX_NAME_RUNES).collect()
}

/// Service/workload id: the sanitized display name plus the numeric-ish suffix
/// of the discovered id, e.g. (`svc-123`, `my-service`) -> `my-service-123`.
/// A discovered id without a suffix is used as is.
pub fn registration_id(discovered_id: &str, display_name: &str) -> String {
    match discovered_id.rsplit_once('-') {
        Some((_, suffix)) => {
            let prefix: String = truncate_name(display_name)
                .chars()
                .take(MAX_PREFIX_RUNES)
                .map(|c| if c == '_' { '-' } else { c })
                .collect();
            format!("{}-{}", prefix, suffix)
        }
        None => discovered_id.to_string(),
    }
}

/// Id segment of `projects/{p}/locations/{l}/discovered{Services,Workloads}/{id}`
fn discovered_id(name: &str) -> Result<&str, PipelineError> {
    let parts: Vec<&str> = name.split('/').collect();
    match parts.get(5) {
        Some(id) if parts.len() >= 6 && !id.is_empty() => Ok(id),
        _ => Err(PipelineError::InvalidDiscoveredName(name.to_string())),
    }
}

/// Settings shared by every resource of one run
#[derive(Debug, Clone)]
pub struct RegistrationOptions {
    pub management_project: String,
    /// Location applications are created in
    pub application_location: String,
    pub scope: ScopeType,
    pub attributes: Option<Attributes>,
    pub report_only: bool,
}

impl RegistrationOptions {
    fn location_parent(&self, location: &str) -> String {
        format!(
            "projects/{}/locations/{}",
            self.management_project, location
        )
    }

    fn application_parent(&self) -> String {
        self.location_parent(&self.application_location)
    }

    pub fn application_name(&self, app_id: &str) -> String {
        format!("{}/applications/{}", self.application_parent(), app_id)
    }
}

/// Why a resource was left alone
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    UnsupportedLocation(String),
    /// A global resource cannot join a regional application
    ScopeMismatch,
    NotDiscovered,
    LookupFailed(Code),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnsupportedLocation(location) => {
                write!(f, "unsupported location '{}'", location)
            }
            SkipReason::ScopeMismatch => f.write_str("global resource in a regional application"),
            SkipReason::NotDiscovered => f.write_str("not discovered by App Hub"),
            SkipReason::LookupFailed(code) => write!(f, "lookup failed with {}", code),
        }
    }
}

/// What happened to one resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Skipped(SkipReason),
    /// Report-only mode: resolved but nothing was mutated
    Reported { application: String },
    Registered {
        application: String,
        registration_id: String,
    },
    AlreadyRegistered {
        application: String,
        registration_id: String,
    },
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Skipped(_) => "skipped",
            Outcome::Reported { .. } => "reported",
            Outcome::Registered { .. } => "registered",
            Outcome::AlreadyRegistered { .. } => "already registered",
        }
    }
}

pub struct Registrar<'a> {
    catalog: &'a dyn Catalog,
    resolver: GroupKeyResolver<'a>,
    classification: &'a Classification,
    options: RegistrationOptions,
    progress: ProgressHandle,
    report: GeneratedApplications,
}

impl<'a> Registrar<'a> {
    pub fn new(
        catalog: &'a dyn Catalog,
        resolver: GroupKeyResolver<'a>,
        classification: &'a Classification,
        options: RegistrationOptions,
        progress: ProgressHandle,
    ) -> Self {
        Self {
            catalog,
            resolver,
            classification,
            options,
            progress,
            report: GeneratedApplications::new(),
        }
    }

    pub fn report(&self) -> &GeneratedApplications {
        &self.report
    }

    pub fn into_report(self) -> GeneratedApplications {
        self.report
    }

    /// Run one resource through the registration steps
    pub async fn process(
        &mut self,
        record: &ResourceRecord,
        mode: &FilterMode,
    ) -> Result<Outcome, PipelineError> {
        let outcome = self.process_inner(record, mode).await?;
        match &outcome {
            Outcome::Skipped(reason) => {
                warn!(resource = %record.name, reason = %reason, "Skipping resource")
            }
            other => debug!(resource = %record.name, outcome = other.label(), "Resource processed"),
        }
        self.progress
            .resource_processed(record.short_name(), outcome.label());
        Ok(outcome)
    }

    async fn process_inner(
        &mut self,
        record: &ResourceRecord,
        mode: &FilterMode,
    ) -> Result<Outcome, PipelineError> {
        let Some(placement) = self.classification.normalize_location(&record.location) else {
            return Ok(Outcome::Skipped(SkipReason::UnsupportedLocation(
                record.location.clone(),
            )));
        };
        if placement == Placement::Global && self.options.scope == ScopeType::Regional {
            return Ok(Outcome::Skipped(SkipReason::ScopeMismatch));
        }

        let kind = self.classification.app_hub_type(&record.asset_type);
        let twin = match self.lookup(record, kind, &placement).await? {
            Ok(twin) => twin,
            Err(reason) => return Ok(Outcome::Skipped(reason)),
        };

        let application = self.resolver.resolve(record, mode).await;
        let twin_id = discovered_id(&twin.name)?;
        let display_name = record.short_name();
        self.report
            .record(&application, twin_id, kind, display_name);

        if self.options.report_only {
            return Ok(Outcome::Reported { application });
        }

        self.get_or_create_application(&application).await?;

        let registration_id = registration_id(twin_id, display_name);
        let created = self
            .register(&application, &registration_id, kind, &twin, display_name)
            .await?;
        Ok(if created {
            Outcome::Registered {
                application,
                registration_id,
            }
        } else {
            Outcome::AlreadyRegistered {
                application,
                registration_id,
            }
        })
    }

    /// Find the discovered twin. The outer error aborts the run, the inner one
    /// skips the resource.
    async fn lookup(
        &self,
        record: &ResourceRecord,
        kind: AppHubType,
        placement: &Placement,
    ) -> Result<Result<DiscoveredTwin, SkipReason>, PipelineError> {
        let uri = self
            .classification
            .rewrite_uri(&record.asset_type, &record.name, &record.project);
        let parent = self.options.location_parent(placement.location());

        let mut result = self.catalog.lookup_discovered(kind, &parent, &uri).await;
        if let Err(ref e) = result
            && e.is(Code::NotFound)
            && is_gateway_uri(&uri)
            && *placement != Placement::Global
        {
            debug!(uri = %uri, "Gateway not found regionally, retrying in global");
            let global = self.options.location_parent(GLOBAL_LOCATION);
            result = self.catalog.lookup_discovered(kind, &global, &uri).await;
        }

        match result {
            Ok(Some(twin)) => Ok(Ok(twin)),
            Ok(None) => {
                warn!(uri = %uri, kind = %kind, "Discovered resource not found, perhaps already registered");
                Ok(Err(SkipReason::NotDiscovered))
            }
            Err(e) if e.is(Code::PermissionDenied) => Err(PipelineError::PermissionDenied {
                permission: kind.lookup_permission(),
                project: self.options.management_project.clone(),
                uri,
                source: e,
            }),
            Err(e) => {
                warn!(uri = %uri, kind = %kind, error = %e, "Discovered resource lookup failed");
                Ok(Err(SkipReason::LookupFailed(e.code)))
            }
        }
    }

    /// Return the application, creating it when it does not exist yet
    pub async fn get_or_create_application(
        &self,
        app_id: &str,
    ) -> Result<Application, PipelineError> {
        let name = self.options.application_name(app_id);
        match self.catalog.get_application(&name).await {
            Ok(app) => {
                debug!(application = %name, "Application exists");
                return Ok(app);
            }
            Err(e) if e.is(Code::NotFound) => {}
            Err(source) => {
                return Err(PipelineError::ApplicationLookup {
                    application: name,
                    source,
                });
            }
        }

        info!(application = %name, scope = ?self.options.scope, "Creating application");
        let application = Application {
            display_name: app_id.to_string(),
            scope: Some(Scope {
                kind: self.options.scope,
            }),
            attributes: self.options.attributes.clone(),
            ..Default::default()
        };
        let create_error = |source: ApiError| PipelineError::ApplicationCreate {
            application: name.clone(),
            source,
        };

        let operation = match self
            .catalog
            .create_application(&self.options.application_parent(), app_id, application)
            .await
        {
            Ok(op) => op,
            Err(e) if e.is(Code::AlreadyExists) => {
                // Created by someone else since the Get
                info!(application = %name, "Application already exists");
                return self
                    .catalog
                    .get_application(&name)
                    .await
                    .map_err(create_error);
            }
            Err(e) => return Err(create_error(e)),
        };

        debug!(operation = %operation.name(), "Waiting for application creation");
        let created = operation.wait().await.map_err(create_error)?;
        info!(application = %created.name, "Application created");
        Ok(created)
    }

    /// Register the twin with the application. Returns false when it was
    /// already registered.
    async fn register(
        &self,
        app_id: &str,
        registration_id: &str,
        kind: AppHubType,
        twin: &DiscoveredTwin,
        display_name: &str,
    ) -> Result<bool, PipelineError> {
        let application = self.options.application_name(app_id);
        let display_name = truncate_name(display_name);
        let attributes = self.options.attributes.clone();
        let registration_error = |source: ApiError| PipelineError::Registration {
            application: application.clone(),
            resource: twin.name.clone(),
            source,
        };

        info!(
            application = %app_id,
            kind = %kind,
            id = %registration_id,
            "Registering into application"
        );

        let submitted = match kind {
            AppHubType::Service => self
                .catalog
                .create_service(
                    &application,
                    registration_id,
                    Service {
                        display_name,
                        discovered_service: twin.name.clone(),
                        attributes,
                        ..Default::default()
                    },
                )
                .await
                .map(|op| op.map(|service| service.name)),
            AppHubType::Workload => self
                .catalog
                .create_workload(
                    &application,
                    registration_id,
                    Workload {
                        display_name,
                        discovered_workload: twin.name.clone(),
                        attributes,
                        ..Default::default()
                    },
                )
                .await
                .map(|op| op.map(|workload| workload.name)),
        };

        let operation = match submitted {
            Ok(op) => op,
            Err(e) if e.is(Code::AlreadyExists) => {
                info!(
                    id = %registration_id,
                    application = %app_id,
                    "Already registered with application, skipping creation"
                );
                return Ok(false);
            }
            Err(e) => return Err(registration_error(e)),
        };

        debug!(operation = %operation.name(), "Registration started, waiting for completion");
        match operation.wait().await {
            Ok(name) => {
                info!(registration = %name, application = %app_id, "Registered with application");
                Ok(true)
            }
            Err(e) if e.is(Code::FailedPrecondition) => {
                info!(
                    id = %registration_id,
                    application = %app_id,
                    reason = %e,
                    "Already registered, skipping creation"
                );
                Ok(false)
            }
            Err(e) => Err(registration_error(e)),
        }
    }
}
