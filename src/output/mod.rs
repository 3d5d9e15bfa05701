// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Rendering of the generated-applications report

mod csv;
mod json;
mod table;

pub use csv::CsvFormatter;
pub use json::JsonFormatter;
pub use table::TableFormatter;

use crate::cli::OutputFormat;
use crate::pipeline::report::GeneratedApplications;

pub const REPORT_COLUMNS: &[&str] = &["application", "discovered_id", "type", "resource"];

/// The report flattened to one row per resource
#[derive(Debug, Clone)]
pub struct ReportTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ReportTable {
    pub fn from_report(report: &GeneratedApplications) -> Self {
        Self {
            columns: REPORT_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: report
                .rows()
                .map(|row| {
                    vec![
                        row.application.to_string(),
                        row.discovered_id.to_string(),
                        row.app_hub_type.to_string(),
                        row.resource.to_string(),
                    ]
                })
                .collect(),
        }
    }

    pub fn format(&self, format: &OutputFormat, no_headers: bool) -> String {
        match format {
            OutputFormat::Table => TableFormatter::format(self, no_headers),
            OutputFormat::Json => JsonFormatter::format(self),
            OutputFormat::Csv => CsvFormatter::format(self, no_headers),
        }
    }

    /// Rows as JSON objects keyed by column name
    fn to_json_rows(&self) -> Vec<serde_json::Map<String, serde_json::Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row)
                    .map(|(col, val)| (col.clone(), serde_json::Value::String(val.clone())))
                    .collect()
            })
            .collect()
    }
}
