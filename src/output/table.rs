// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use std::borrow::Cow;

use comfy_table::{Table, presets::ASCII_BORDERS_ONLY_CONDENSED};

use super::ReportTable;

/// Maximum width of the resource column
const MAX_RESOURCE_WIDTH: usize = 60;

const RESOURCE_COLUMN: &str = "resource";

/// Truncate a string to max_len chars, adding "..." if truncated
fn truncate_value(s: &str, max_len: usize) -> Cow<'_, str> {
    if s.chars().count() <= max_len {
        Cow::Borrowed(s)
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        Cow::Owned(format!("{}...", truncated))
    }
}

pub struct TableFormatter;

impl TableFormatter {
    pub fn format(result: &ReportTable, no_headers: bool) -> String {
        if result.rows.is_empty() {
            return "(0 resources)".to_string();
        }

        let mut table = Table::new();
        table.load_preset(ASCII_BORDERS_ONLY_CONDENSED);

        let resource_col = result.columns.iter().position(|c| c == RESOURCE_COLUMN);

        if !no_headers {
            table.set_header(&result.columns);
        }

        for row in &result.rows {
            let cells: Vec<Cow<'_, str>> = row
                .iter()
                .enumerate()
                .map(|(idx, val)| {
                    if Some(idx) == resource_col {
                        truncate_value(val, MAX_RESOURCE_WIDTH)
                    } else {
                        Cow::Borrowed(val.as_str())
                    }
                })
                .collect();
            table.add_row(cells);
        }

        let output = table.to_string();
        format!("{}\n({} resources)", output, result.rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with(resource: String) -> ReportTable {
        ReportTable {
            columns: vec!["application".to_string(), "resource".to_string()],
            rows: vec![vec!["checkout".to_string(), resource]],
        }
    }

    #[test]
    fn test_truncate_value_short() {
        let result = truncate_value("hello", 10);
        assert_eq!(result, "hello");
        assert!(matches!(result, Cow::Borrowed(_)));
    }

    #[test]
    fn test_truncate_value_unicode() {
        let result = truncate_value("日本語テストです長い文字列", 8);
        assert!(result.chars().count() <= 8);
        assert!(result.ends_with("..."));
    }

    #[test]
    fn test_long_resource_is_truncated() {
        let output = TableFormatter::format(&table_with("a".repeat(80)), false);
        assert!(!output.contains(&"a".repeat(80)));
        assert!(output.contains("..."));
        assert!(output.ends_with("(1 resources)"));
    }

    #[test]
    fn test_headers_can_be_omitted() {
        let output = TableFormatter::format(&table_with("cart".to_string()), true);
        assert!(!output.contains("application"));
        assert!(output.contains("cart"));
    }

    #[test]
    fn test_empty_report() {
        let empty = ReportTable {
            columns: vec![],
            rows: vec![],
        };
        assert_eq!(TableFormatter::format(&empty, false), "(0 resources)");
    }
}
