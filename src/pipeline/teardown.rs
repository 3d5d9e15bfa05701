// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Application teardown
//!
//! App Hub refuses to delete an application that still owns services or
//! workloads, so children go first: services, then workloads, each group
//! fanned out with a bounded number of deletions in flight. The first failed
//! deletion drops the rest of its group and ends the teardown.

use futures::{StreamExt, TryStreamExt, stream};
use tracing::{debug, info};

use super::error::PipelineError;
use crate::gcp::error::ApiError;
use crate::gcp::operation::PendingOperation;
use crate::gcp::provider::Catalog;
use crate::progress::ProgressHandle;

/// Deletions in flight per group
pub const MAX_CONCURRENT_DELETIONS: usize = 4;

pub struct Teardown<'a> {
    catalog: &'a dyn Catalog,
    progress: ProgressHandle,
}

impl<'a> Teardown<'a> {
    pub fn new(catalog: &'a dyn Catalog, progress: ProgressHandle) -> Self {
        Self { catalog, progress }
    }

    /// Delete one application together with its services and workloads
    pub async fn delete_application(
        &self,
        management_project: &str,
        location: &str,
        app_id: &str,
    ) -> Result<(), PipelineError> {
        let name = format!(
            "projects/{}/locations/{}/applications/{}",
            management_project, location, app_id
        );
        self.progress.deleting(&name);
        info!(application = %name, "Deleting application");

        let services = self
            .catalog
            .list_services(&name)
            .await
            .map_err(|source| teardown_error("list services of", &name, source))?;
        let names = services.into_iter().map(|s| s.name).collect();
        self.delete_all("delete service", names, |n| async move {
            self.catalog.delete_service(&n).await
        })
        .await?;

        let workloads = self
            .catalog
            .list_workloads(&name)
            .await
            .map_err(|source| teardown_error("list workloads of", &name, source))?;
        let names = workloads.into_iter().map(|w| w.name).collect();
        self.delete_all("delete workload", names, |n| async move {
            self.catalog.delete_workload(&n).await
        })
        .await?;

        self.delete_one("delete application", name, |n| async move {
            self.catalog.delete_application(&n).await
        })
        .await
    }

    /// Delete `app_id` in every location, or every application found there
    /// when no id is given. Locations are handled one after another and the
    /// first failure stops the loop.
    pub async fn delete_applications(
        &self,
        management_project: &str,
        locations: &[String],
        app_id: Option<&str>,
    ) -> Result<usize, PipelineError> {
        let mut deleted = 0;
        for location in locations {
            let app_ids = match app_id {
                Some(id) => vec![id.to_string()],
                None => self.list_application_ids(management_project, location).await?,
            };
            debug!(location = %location, applications = app_ids.len(), "Tearing down location");
            for id in app_ids {
                self.delete_application(management_project, location, &id)
                    .await?;
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    async fn list_application_ids(
        &self,
        management_project: &str,
        location: &str,
    ) -> Result<Vec<String>, PipelineError> {
        let parent = format!("projects/{}/locations/{}", management_project, location);
        let applications = self
            .catalog
            .list_applications(&parent)
            .await
            .map_err(|source| teardown_error("list applications in", &parent, source))?;
        Ok(applications
            .iter()
            .filter_map(|app| app.name.rsplit('/').next())
            .map(str::to_string)
            .collect())
    }

    /// Run `submit` for every name with at most MAX_CONCURRENT_DELETIONS in flight
    async fn delete_all<F, Fut>(
        &self,
        action: &'static str,
        names: Vec<String>,
        submit: F,
    ) -> Result<(), PipelineError>
    where
        F: Fn(String) -> Fut + Copy,
        Fut: Future<Output = Result<PendingOperation<()>, ApiError>>,
    {
        stream::iter(names)
            .map(Ok)
            .try_for_each_concurrent(MAX_CONCURRENT_DELETIONS, |name| {
                self.delete_one(action, name, submit)
            })
            .await
    }

    /// Submit one deletion and wait for it to finish
    async fn delete_one<F, Fut>(
        &self,
        action: &'static str,
        name: String,
        submit: F,
    ) -> Result<(), PipelineError>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<PendingOperation<()>, ApiError>>,
    {
        let operation = submit(name.clone())
            .await
            .map_err(|source| teardown_error(action, &name, source))?;
        debug!(operation = %operation.name(), "Waiting for deletion");
        operation
            .wait()
            .await
            .map_err(|source| teardown_error(action, &name, source))?;
        info!(name = %name, "Deleted");
        self.progress.deleted(&name);
        Ok(())
    }
}

fn teardown_error(action: &'static str, name: &str, source: ApiError) -> PipelineError {
    PipelineError::Teardown {
        action,
        name: name.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcp::error::Code;
    use crate::gcp::fake::FakeCatalog;
    use crate::progress::create_progress_handle;
    use std::time::Duration;

    const APP: &str = "projects/mgmt/locations/us-west1/applications/checkout";

    fn seed(catalog: &FakeCatalog, services: usize, workloads: usize) {
        catalog.insert_application(APP);
        for i in 0..services {
            catalog.insert_service(APP, &format!("svc-{i}"), &format!("ds-{i}"));
        }
        for i in 0..workloads {
            catalog.insert_workload(APP, &format!("wl-{i}"), &format!("dw-{i}"));
        }
    }

    #[tokio::test]
    async fn test_deletes_children_then_application() {
        let catalog = FakeCatalog::new();
        seed(&catalog, 3, 2);
        let teardown = Teardown::new(&catalog, create_progress_handle());

        teardown
            .delete_application("mgmt", "us-west1", "checkout")
            .await
            .unwrap();

        assert!(catalog.services().is_empty());
        assert!(catalog.workloads().is_empty());
        assert!(catalog.application(APP).is_none());
        let calls = catalog.calls();
        assert_eq!(calls.delete_service, 3);
        assert_eq!(calls.delete_workload, 2);
        assert_eq!(calls.delete_application, 1);
    }

    #[tokio::test]
    async fn test_concurrency_is_capped() {
        let catalog = FakeCatalog::new();
        seed(&catalog, 10, 0);
        catalog.set_delete_delay(Duration::from_millis(20));
        let teardown = Teardown::new(&catalog, create_progress_handle());

        teardown
            .delete_application("mgmt", "us-west1", "checkout")
            .await
            .unwrap();

        assert_eq!(catalog.max_in_flight(), MAX_CONCURRENT_DELETIONS);
        assert_eq!(catalog.calls().delete_service, 10);
    }

    #[tokio::test]
    async fn test_first_failure_cancels_group() {
        let catalog = FakeCatalog::new();
        seed(&catalog, 10, 2);
        catalog.set_delete_delay(Duration::from_millis(50));
        catalog.fail_delete(
            &format!("{APP}/services/svc-0"),
            ApiError::new(Code::Internal, "boom"),
        );
        let teardown = Teardown::new(&catalog, create_progress_handle());

        let err = teardown
            .delete_application("mgmt", "us-west1", "checkout")
            .await
            .unwrap_err();
        match err {
            PipelineError::Teardown { action, name, .. } => {
                assert_eq!(action, "delete service");
                assert!(name.ends_with("/services/svc-0"));
            }
            other => panic!("unexpected error: {other}"),
        }

        let calls = catalog.calls();
        assert!(calls.delete_service <= MAX_CONCURRENT_DELETIONS);
        assert_eq!(calls.delete_workload, 0);
        assert_eq!(calls.delete_application, 0);
        assert!(catalog.application(APP).is_some());
    }

    #[tokio::test]
    async fn test_registered_resources_tear_down_cleanly() {
        use crate::gcp::fake::FakeProjects;
        use crate::gcp::model::{AppHubType, ResourceRecord, ScopeType};
        use crate::pipeline::classify::Classification;
        use crate::pipeline::criteria::FilterMode;
        use crate::pipeline::group_key::GroupKeyResolver;
        use crate::pipeline::registrar::{RegistrationOptions, Registrar};
        use std::collections::BTreeMap;

        let catalog = FakeCatalog::new();
        let parent = "projects/mgmt/locations/us-west1";
        let service_uri = "//run.googleapis.com/projects/shop/locations/us-west1/services/checkout";
        let job_uri = "//run.googleapis.com/projects/shop/locations/us-west1/jobs/reindex";
        catalog.add_twin(AppHubType::Service, parent, service_uri, "svc-1");
        catalog.add_twin(AppHubType::Workload, parent, job_uri, "wl-2");

        let projects = FakeProjects::default();
        let classification = Classification::default();
        let mut registrar = Registrar::new(
            &catalog,
            GroupKeyResolver::new(&projects),
            &classification,
            RegistrationOptions {
                management_project: "mgmt".to_string(),
                application_location: "us-west1".to_string(),
                scope: ScopeType::Regional,
                attributes: None,
                report_only: false,
            },
            create_progress_handle(),
        );
        let mode = FilterMode::Label {
            key: "appid".to_string(),
            value: None,
        };
        for (uri, asset_type) in [
            (service_uri, "run.googleapis.com/Service"),
            (job_uri, "run.googleapis.com/Job"),
        ] {
            let record = ResourceRecord {
                name: uri.to_string(),
                asset_type: asset_type.to_string(),
                location: "us-west1".to_string(),
                labels: BTreeMap::from([("appid".to_string(), "checkout".to_string())]),
                ..Default::default()
            };
            registrar.process(&record, &mode).await.unwrap();
        }
        assert_eq!(catalog.services().len(), 1);
        assert_eq!(catalog.workloads().len(), 1);

        Teardown::new(&catalog, create_progress_handle())
            .delete_application("mgmt", "us-west1", "checkout")
            .await
            .unwrap();

        assert!(catalog.services().is_empty());
        assert!(catalog.workloads().is_empty());
        assert!(catalog.application_names().is_empty());
    }

    #[tokio::test]
    async fn test_bulk_delete_lists_each_location() {
        let catalog = FakeCatalog::new();
        seed(&catalog, 1, 1);
        catalog.insert_application("projects/mgmt/locations/us-west1/applications/orders");
        catalog.insert_application("projects/mgmt/locations/global/applications/shared");
        catalog.insert_application("projects/mgmt/locations/europe-west1/applications/keep");
        let teardown = Teardown::new(&catalog, create_progress_handle());

        let deleted = teardown
            .delete_applications(
                "mgmt",
                &["us-west1".to_string(), "global".to_string()],
                None,
            )
            .await
            .unwrap();

        assert_eq!(deleted, 3);
        assert_eq!(
            catalog.application_names(),
            vec!["projects/mgmt/locations/europe-west1/applications/keep".to_string()]
        );
    }

    #[tokio::test]
    async fn test_failure_stops_location_loop() {
        let catalog = FakeCatalog::new();
        catalog.insert_application("projects/mgmt/locations/us-west1/applications/checkout");
        catalog.insert_application("projects/mgmt/locations/us-east1/applications/checkout");
        catalog.fail_delete(
            "projects/mgmt/locations/us-west1/applications/checkout",
            ApiError::new(Code::PermissionDenied, "no"),
        );
        let teardown = Teardown::new(&catalog, create_progress_handle());

        let result = teardown
            .delete_applications(
                "mgmt",
                &["us-west1".to_string(), "us-east1".to_string()],
                Some("checkout"),
            )
            .await;

        assert!(matches!(result, Err(PipelineError::Teardown { .. })));
        assert!(
            catalog
                .application("projects/mgmt/locations/us-east1/applications/checkout")
                .is_some()
        );
    }
}
