// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Result formatting for CLI output

use super::commands::OutputFormat;
use colored::*;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use kubecypher::{QueryResult, ResolvedKind};
use serde_json::Value;

/// Result formatter for different output formats
pub struct ResultFormatter;

impl ResultFormatter {
    pub fn format(result: &QueryResult, format: OutputFormat) -> String {
        match format {
            OutputFormat::Table => Self::format_table(result),
            OutputFormat::Json => Self::format_json(result),
        }
    }

    /// One table per binding
    fn format_table(result: &QueryResult) -> String {
        if result.is_empty() {
            return format!("{}\n", "No results found".yellow());
        }

        let mut output = String::new();
        output.push_str(&format!("{}\n", "Query Results".bold().green()));
        output.push_str(&format!(
            "Execution time: {} ms\n",
            result.execution_time_ms
        ));
        output.push_str(&format!("Documents: {}\n", result.document_count()));

        for (binding, documents) in &result.bindings {
            output.push_str(&format!(
                "\n{} ({})\n",
                binding.bold().cyan(),
                documents.len()
            ));
            if documents.is_empty() {
                output.push_str(&format!("{}\n", "  no matches".yellow()));
                continue;
            }

            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec![
                Cell::new("Namespace").fg(Color::Green),
                Cell::new("Name").fg(Color::Green),
                Cell::new("Document").fg(Color::Green),
            ]);
            for document in documents {
                table.add_row(vec![
                    Self::metadata_text(document, "namespace"),
                    Self::metadata_text(document, "name"),
                    Self::value_to_string(document),
                ]);
            }
            output.push_str(&table.to_string());
            output.push('\n');
        }
        output
    }

    fn format_json(result: &QueryResult) -> String {
        let json_result = serde_json::json!({
            "status": "success",
            "bindings": result.bindings,
            "documents": result.document_count(),
            "execution_time_ms": result.execution_time_ms,
        });

        serde_json::to_string_pretty(&json_result).unwrap_or_else(|_| {
            "{\"status\": \"error\", \"error\": \"Could not serialize results to JSON\"}"
                .to_string()
        })
    }

    /// Resolver cache dump as a table
    pub fn format_kinds(entries: &[(String, ResolvedKind)]) -> String {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec![
            Cell::new("Identifier").fg(Color::Green),
            Cell::new("Kind").fg(Color::Green),
            Cell::new("API Version").fg(Color::Green),
            Cell::new("Resource").fg(Color::Green),
            Cell::new("Namespaced").fg(Color::Green),
        ]);
        for (identifier, kind) in entries {
            table.add_row(vec![
                identifier.clone(),
                kind.kind.clone(),
                kind.api_version(),
                kind.gvr.resource.clone(),
                kind.namespaced.to_string(),
            ]);
        }
        table.to_string()
    }

    fn metadata_text(document: &Value, key: &str) -> String {
        document
            .get("metadata")
            .and_then(|m| m.get(key))
            .and_then(Value::as_str)
            .unwrap_or("-")
            .to_string()
    }

    /// Compact JSON, with strings shown bare
    fn value_to_string(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            Value::Null => "NULL".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result() -> QueryResult {
        let mut result = QueryResult::new();
        result.bindings.insert(
            "d".to_string(),
            vec![json!({"metadata": {"name": "web", "namespace": "default"}})],
        );
        result.bindings.insert("rs".to_string(), vec![]);
        result
    }

    #[test]
    fn test_json_output() {
        let text = ResultFormatter::format(&result(), OutputFormat::Json);
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["status"], "success");
        assert_eq!(parsed["documents"], 1);
        assert_eq!(parsed["bindings"]["d"][0]["metadata"]["name"], "web");
        assert_eq!(parsed["bindings"]["rs"], json!([]));
    }

    #[test]
    fn test_table_output() {
        let text = ResultFormatter::format(&result(), OutputFormat::Table);
        assert!(text.contains("web"));
        assert!(text.contains("default"));
        assert!(text.contains("no matches"));

        let empty = ResultFormatter::format(&QueryResult::new(), OutputFormat::Table);
        assert!(empty.contains("No results found"));
    }
}
