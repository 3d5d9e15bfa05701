// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Google Cloud API access: capability traits, wire models and REST clients

pub mod apphub;
pub mod asset;
pub mod auth;
pub mod error;
#[cfg(test)]
pub mod fake;
pub mod logging;
pub mod model;
pub mod operation;
pub mod projects;
pub mod provider;
pub mod rest;

pub use apphub::AppHubClient;
pub use asset::AssetClient;
pub use auth::TokenProvider;
pub use error::{ApiError, Code};
pub use logging::LoggingClient;
pub use model::{AppHubType, Application, Attributes, DiscoveredTwin, ResourceRecord};
pub use operation::PendingOperation;
pub use projects::ProjectsClient;
pub use provider::{
    ApplicationStore, Catalog, DiscoveredLookup, LogQuery, ProjectDirectory, ResourceSearch,
    SearchRequest, ServiceStore, WorkloadStore,
};
pub use rest::RestClient;
