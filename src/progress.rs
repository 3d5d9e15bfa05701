// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Progress reporting for long-running runs
//!
//! The pipeline reports what it is doing through a broadcast channel so the
//! CLI can show it on a spinner without the pipeline knowing about terminals.

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::broadcast;

/// Create a spinner with consistent styling
pub fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        .template("{spinner:.cyan} {msg} {elapsed:.dim}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}

/// Progress update message
#[derive(Clone, Debug)]
pub enum ProgressUpdate {
    // === Discovery ===
    /// Searching a scope
    Searching { scope: String, mode: String },
    /// Discovery finished
    DiscoveryComplete {
        resource_count: usize,
        elapsed_ms: u64,
    },

    // === Registration ===
    /// Starting to process discovered resources
    StartingRegistration { total: usize },
    /// One resource went through the registration steps
    ResourceProcessed { resource: String, outcome: String },

    // === Teardown ===
    /// Tearing down an application
    Deleting { application: String },
    /// A service, workload or application is gone
    Deleted { name: String },
}

/// Progress reporter shared by the pipeline stages
pub struct ProgressReporter {
    sender: broadcast::Sender<ProgressUpdate>,
    /// Resources processed so far
    resources_done: AtomicUsize,
    /// Resources discovered for this run
    resources_total: AtomicUsize,
}

impl ProgressReporter {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self {
            sender,
            resources_done: AtomicUsize::new(0),
            resources_total: AtomicUsize::new(0),
        }
    }

    /// Subscribe to progress updates
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressUpdate> {
        self.sender.subscribe()
    }

    pub fn searching(&self, scope: &str, mode: &str) {
        let _ = self.sender.send(ProgressUpdate::Searching {
            scope: scope.to_string(),
            mode: mode.to_string(),
        });
    }

    pub fn discovery_complete(&self, resource_count: usize, elapsed_ms: u64) {
        let _ = self.sender.send(ProgressUpdate::DiscoveryComplete {
            resource_count,
            elapsed_ms,
        });
    }

    /// Report registration start, resetting the counters
    pub fn start_registration(&self, total: usize) {
        self.resources_done.store(0, Ordering::SeqCst);
        self.resources_total.store(total, Ordering::SeqCst);
        let _ = self
            .sender
            .send(ProgressUpdate::StartingRegistration { total });
    }

    pub fn resource_processed(&self, resource: &str, outcome: &str) {
        self.resources_done.fetch_add(1, Ordering::SeqCst);
        let _ = self.sender.send(ProgressUpdate::ResourceProcessed {
            resource: resource.to_string(),
            outcome: outcome.to_string(),
        });
    }

    pub fn deleting(&self, application: &str) {
        let _ = self.sender.send(ProgressUpdate::Deleting {
            application: application.to_string(),
        });
    }

    pub fn deleted(&self, name: &str) {
        let _ = self.sender.send(ProgressUpdate::Deleted {
            name: name.to_string(),
        });
    }

    /// Get current progress (done/total)
    pub fn progress(&self) -> (usize, usize) {
        (
            self.resources_done.load(Ordering::SeqCst),
            self.resources_total.load(Ordering::SeqCst),
        )
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe handle to progress reporter
pub type ProgressHandle = Arc<ProgressReporter>;

/// Create a new progress reporter handle
pub fn create_progress_handle() -> ProgressHandle {
    Arc::new(ProgressReporter::new())
}
