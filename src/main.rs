// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

mod cli;
pub mod config;
mod gcp;
mod output;
mod pipeline;
pub mod progress;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::prelude::*;

use cli::{Args, Command, DeleteArgs, GenerateArgs, LogLevel};
use config::Config;
use gcp::{AppHubClient, AssetClient, LoggingClient, ProjectsClient, RestClient, TokenProvider};
use output::ReportTable;
use pipeline::{
    Discovery, FilterCriteria, GeneratedApplications, GroupKeyResolver, RegistrationOptions,
    Registrar, Teardown,
};
use progress::{ProgressHandle, ProgressUpdate, create_progress_handle, create_spinner};

/// Initialize logging with file output and optional stderr
fn init_logging(level: LogLevel, verbose: bool) {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::fmt::format::FmtSpan;

    let log_dir = config::log_dir().unwrap_or_else(|_| std::path::PathBuf::from("."));

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Could not create log directory: {}", e);
        return;
    }

    // Rotate daily, keep up to 5 files
    let file_appender = match RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("apphub-assembler.log")
        .max_log_files(5)
        .build(&log_dir)
    {
        Ok(appender) => appender,
        Err(e) => {
            eprintln!("Warning: Could not create log file: {}", e);
            return;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    // Leak the guard to keep the background writer alive
    std::mem::forget(guard);

    let filter = if verbose {
        "apphub_assembler=debug".to_string()
    } else {
        format!("apphub_assembler={}", level.as_str())
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    // File layer (always enabled)
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_span_events(FmtSpan::NONE);

    if verbose {
        let stderr_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_span_events(FmtSpan::NONE);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .with(stderr_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.log_level, args.verbose);

    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match &args.command {
        Command::Generate(generate) => run_generate(generate, &config, args.verbose).await,
        Command::Delete(delete) => run_delete(delete, &config, args.verbose).await,
    }
}

fn rest_client(management_project: &str) -> Result<RestClient> {
    let tokens = Arc::new(TokenProvider::from_env());
    RestClient::new(tokens, Some(management_project.to_string()))
        .context("Failed to create HTTP client")
}

/// Drive `task` to completion while rendering progress on a spinner.
/// The spinner is skipped in verbose mode, where logs go to stderr.
async fn with_spinner<F, T>(
    progress: &ProgressHandle,
    message: &str,
    verbose: bool,
    task: F,
) -> T
where
    F: Future<Output = T>,
{
    if verbose {
        return task.await;
    }

    let spinner = create_spinner(message);
    let mut progress_rx = progress.subscribe();
    let mut handle = Box::pin(task);

    let result = loop {
        tokio::select! {
            biased;
            update = progress_rx.recv() => {
                match update {
                    Ok(ProgressUpdate::Searching { scope, mode }) => {
                        spinner.set_message(format!("Searching {} by {}...", scope, mode));
                    }
                    Ok(ProgressUpdate::DiscoveryComplete { resource_count, .. }) => {
                        spinner.set_message(format!("{} resources found", resource_count));
                    }
                    Ok(ProgressUpdate::StartingRegistration { total }) => {
                        spinner.set_message(format!("Processing {} resources...", total));
                    }
                    Ok(ProgressUpdate::ResourceProcessed { resource, outcome }) => {
                        let (done, total) = progress.progress();
                        spinner.set_message(format!("[{}/{}] {}: {}", done, total, resource, outcome));
                    }
                    Ok(ProgressUpdate::Deleting { application }) => {
                        spinner.set_message(format!("Deleting {}...", application));
                    }
                    Ok(ProgressUpdate::Deleted { name }) => {
                        spinner.set_message(format!("Deleted {}", name));
                    }
                    Err(_) => {}
                }
            }
            result = &mut handle => {
                break result;
            }
        }
    };

    spinner.finish_and_clear();
    result
}

async fn run_generate(args: &GenerateArgs, config: &Config, verbose: bool) -> Result<()> {
    // Configuration errors surface before any remote call
    args.validate()?;
    let management_project = args.management_project()?;
    let criteria = FilterCriteria::new(
        args.filter_mode()?,
        args.locations.clone(),
        args.load_asset_types()?,
    )?;
    let attributes = args.load_attributes()?;

    let rest = rest_client(&management_project)?;
    let search = AssetClient::new(rest.clone());
    let logs = LoggingClient::new(rest.clone());
    let projects = ProjectsClient::new(rest.clone());
    let catalog = AppHubClient::new(rest, config.poll_interval());

    let progress = create_progress_handle();
    let classification = &config.classification;
    let discovery = Discovery::new(
        &search,
        &logs,
        classification,
        config.discovery_settings(args.dedupe),
        progress.clone(),
    );
    let registrar = Registrar::new(
        &catalog,
        GroupKeyResolver::new(&projects),
        classification,
        RegistrationOptions {
            management_project,
            application_location: criteria.application_location().to_string(),
            scope: criteria.app_scope(),
            attributes,
            report_only: args.report_only,
        },
        progress.clone(),
    );

    let report: GeneratedApplications = with_spinner(
        &progress,
        "Discovering resources...",
        verbose,
        pipeline::generate(&discovery, registrar, &args.parent, &criteria, &progress),
    )
    .await?;

    if args.report_only {
        println!(
            "{}",
            ReportTable::from_report(&report).format(&args.output, args.no_headers)
        );
    } else {
        eprintln!(
            "Processed {} resources into {} applications",
            report.resource_count(),
            report.len()
        );
    }
    Ok(())
}

async fn run_delete(args: &DeleteArgs, config: &Config, verbose: bool) -> Result<()> {
    let rest = rest_client(&args.management_project)?;
    let catalog = AppHubClient::new(rest, config.poll_interval());
    let progress = create_progress_handle();
    let teardown = Teardown::new(&catalog, progress.clone());

    let deleted = with_spinner(
        &progress,
        "Deleting applications...",
        verbose,
        teardown.delete_applications(
            &args.management_project,
            &args.locations,
            args.app_name.as_deref(),
        ),
    )
    .await?;

    eprintln!("Deleted {} applications", deleted);
    Ok(())
}
