// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! The assembly pipeline: discover resources, group them into applications
//! and register them with App Hub, or tear applications down again.

pub mod classify;
pub mod criteria;
pub mod discovery;
pub mod error;
pub mod group_key;
pub mod query;
pub mod registrar;
pub mod report;
pub mod teardown;

pub use classify::Classification;
pub use criteria::{FilterCriteria, FilterMode};
pub use discovery::{Discovery, DiscoverySettings};
pub use error::PipelineError;
pub use group_key::GroupKeyResolver;
pub use registrar::{Outcome, RegistrationOptions, Registrar};
pub use report::GeneratedApplications;
pub use teardown::Teardown;

use tracing::info;

use crate::progress::ProgressHandle;

/// Discover everything in `scope` matching `criteria` and run each resource
/// through the registrar, one at a time and in discovery order.
pub async fn generate(
    discovery: &Discovery<'_>,
    mut registrar: Registrar<'_>,
    scope: &str,
    criteria: &FilterCriteria,
    progress: &ProgressHandle,
) -> Result<GeneratedApplications, PipelineError> {
    let records = discovery.discover(scope, criteria).await?;
    progress.start_registration(records.len());

    let mut registered = 0;
    for record in &records {
        if let Outcome::Registered { .. } = registrar.process(record, &criteria.mode).await? {
            registered += 1;
        }
    }

    let report = registrar.into_report();
    info!(
        resources = records.len(),
        registered,
        applications = report.len(),
        "Generation complete"
    );
    Ok(report)
}
