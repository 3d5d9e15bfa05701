// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use anyhow::{Context, Result, bail};
use clap::{ArgGroup, Parser, Subcommand, ValueEnum};
use regex::Regex;
use std::fs;
use std::path::PathBuf;
use std::sync::LazyLock;

use crate::gcp::model::Attributes;
use crate::pipeline::classify::parse_asset_types;
use crate::pipeline::criteria::FilterMode;

/// `projects/{project}` or `folders/{folder}`
static PARENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(projects|folders)/[^/\s]+$").expect("valid regex"));

#[derive(Parser, Debug)]
#[command(name = "apphub-assembler")]
#[command(
    author,
    version,
    about = "Group discovered cloud resources into App Hub applications"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Default log level for the log file
    #[arg(long, value_enum, default_value = "info", global = true)]
    pub log_level: LogLevel,

    /// Enable debug logging and mirror it to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (default: ~/.apphub-assembler/config.json)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Discover resources and register them into App Hub applications
    Generate(GenerateArgs),

    /// Delete App Hub applications together with their services and workloads
    Delete(DeleteArgs),
}

#[derive(clap::Args, Debug)]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .multiple(false)
        .args([
            "auto_detect",
            "label_key",
            "tag_key",
            "contains",
            "log_label_key",
            "per_k8s_namespace",
            "per_k8s_app_label",
            "project_keys",
        ])
))]
pub struct GenerateArgs {
    /// Search scope: projects/{project} or folders/{folder}
    #[arg(long)]
    pub parent: String,

    /// Project hosting the App Hub applications. Defaults to the parent project.
    #[arg(long)]
    pub management_project: Option<String>,

    /// Locations to search; repeat or comma-separate
    #[arg(long, required = true, value_delimiter = ',')]
    pub locations: Vec<String>,

    /// Group by the value of this resource label
    #[arg(long)]
    pub label_key: Option<String>,

    /// Only resources whose label has this value
    #[arg(long, requires = "label_key", conflicts_with = "tag_value")]
    pub label_value: Option<String>,

    /// Group by the value of this resource tag
    #[arg(long)]
    pub tag_key: Option<String>,

    /// Only resources whose tag has this value
    #[arg(long, requires = "tag_key")]
    pub tag_value: Option<String>,

    /// Resources whose name contains this string; also the application name
    #[arg(long)]
    pub contains: Option<String>,

    /// Discover resources through this Cloud Logging entry label
    #[arg(long, requires = "log_label_value")]
    pub log_label_key: Option<String>,

    /// Log label value; also the application name
    #[arg(long, requires = "log_label_key")]
    pub log_label_value: Option<String>,

    /// One application per Kubernetes namespace
    #[arg(long)]
    pub per_k8s_namespace: bool,

    /// One application per app.kubernetes.io/name label value
    #[arg(long)]
    pub per_k8s_app_label: bool,

    /// Guess applications from well known labels and tags
    #[arg(long)]
    pub auto_detect: bool,

    /// Put everything in these projects into one application
    #[arg(long, requires = "app_name")]
    pub project_keys: Vec<String>,

    /// Application name for --project-keys
    #[arg(long, requires = "project_keys")]
    pub app_name: Option<String>,

    /// JSON file with App Hub attributes
    #[arg(long, value_name = "PATH")]
    pub attributes: Option<PathBuf>,

    /// File with a comma-separated list of asset types to search
    #[arg(long, value_name = "PATH")]
    pub asset_types: Option<PathBuf>,

    /// Print what would be registered without changing anything
    #[arg(long)]
    pub report_only: bool,

    /// Process resources matched by several auto-detect searches once
    #[arg(long)]
    pub dedupe: bool,

    /// Report format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: OutputFormat,

    /// Omit column headers in the report
    #[arg(long)]
    pub no_headers: bool,
}

impl GenerateArgs {
    fn is_folder(&self) -> bool {
        self.parent.starts_with("folders/")
    }

    /// Check the combinations clap cannot express
    pub fn validate(&self) -> Result<()> {
        if !PARENT_RE.is_match(&self.parent) {
            bail!("parent must be of the format projects/{{project}} or folders/{{folder}}");
        }
        if self.is_folder() && self.management_project.is_none() {
            bail!("--management-project is required for folder parents");
        }
        if self.label_value.is_some() && self.label_key.is_none() {
            bail!("--label-value must be used with --label-key");
        }
        if self.tag_value.is_some() && self.tag_key.is_none() {
            bail!("--tag-value must be used with --tag-key");
        }
        if self.label_value.is_some() && self.tag_value.is_some() {
            bail!("--label-value and --tag-value cannot be used together");
        }
        if self.log_label_key.is_some() != self.log_label_value.is_some() {
            bail!("--log-label-key and --log-label-value must be used together");
        }
        if self.is_folder() && self.log_label_key.is_some() {
            bail!("--log-label-key is not allowed for folder parents");
        }
        if self.locations.iter().all(|l| l.trim().is_empty()) {
            bail!("at least one location is required");
        }
        if let Some(name) = &self.app_name
            && !name.starts_with(|c: char| c.is_ascii_lowercase())
        {
            bail!("--app-name must start with a lowercase letter");
        }
        Ok(())
    }

    /// The explicit management project, or the parent's project
    pub fn management_project(&self) -> Result<String> {
        match (&self.management_project, self.parent.strip_prefix("projects/")) {
            (Some(project), _) => Ok(project.clone()),
            (None, Some(project)) => Ok(project.to_string()),
            (None, None) => bail!("--management-project is required for folder parents"),
        }
    }

    pub fn filter_mode(&self) -> Result<FilterMode> {
        let mode = if self.auto_detect {
            FilterMode::AutoDetect
        } else if self.per_k8s_namespace {
            FilterMode::KubernetesNamespace
        } else if self.per_k8s_app_label {
            FilterMode::KubernetesAppLabel
        } else if let Some(key) = &self.log_label_key {
            FilterMode::LogLabel {
                key: key.clone(),
                value: self.log_label_value.clone().unwrap_or_default(),
            }
        } else if !self.project_keys.is_empty() {
            FilterMode::Projects {
                project_ids: self.project_keys.clone(),
                app_name: self.app_name.clone().unwrap_or_default(),
            }
        } else if let Some(key) = &self.label_key {
            FilterMode::Label {
                key: key.clone(),
                value: self.label_value.clone(),
            }
        } else if let Some(key) = &self.tag_key {
            FilterMode::Tag {
                key: key.clone(),
                value: self.tag_value.clone(),
            }
        } else if let Some(substring) = &self.contains {
            FilterMode::NameContains(substring.clone())
        } else {
            bail!("one grouping mode is required");
        };
        Ok(mode)
    }

    /// Parse the --attributes file. An empty file means no attributes.
    pub fn load_attributes(&self) -> Result<Option<Attributes>> {
        let Some(path) = &self.attributes else {
            return Ok(None);
        };
        let data = fs::read(path)
            .with_context(|| format!("Failed to read attributes file: {}", path.display()))?;
        Attributes::from_json(&data)
            .with_context(|| format!("Failed to parse attributes file: {}", path.display()))
    }

    /// Parse the --asset-types file
    pub fn load_asset_types(&self) -> Result<Option<Vec<String>>> {
        let Some(path) = &self.asset_types else {
            return Ok(None);
        };
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read asset types file: {}", path.display()))?;
        let types = parse_asset_types(&data);
        Ok((!types.is_empty()).then_some(types))
    }
}

#[derive(clap::Args, Debug)]
pub struct DeleteArgs {
    /// Project hosting the App Hub applications
    #[arg(long)]
    pub management_project: String,

    /// Locations to delete from; repeat or comma-separate
    #[arg(long, required = true, value_delimiter = ',')]
    pub locations: Vec<String>,

    /// Delete only this application instead of every application
    #[arg(long)]
    pub app_name: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogLevel {
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }
}

#[derive(ValueEnum, Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}
