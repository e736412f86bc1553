//! Output formatting for CLI

use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Output format options
pub enum OutputFormat {
    Text,
    Json,
    Table,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "table" => OutputFormat::Table,
            _ => OutputFormat::Text,
        }
    }
}

/// Render rows as a table, pretty JSON, or one line per row
pub fn format_rows<T>(rows: &[T], format: &str) -> String
where
    T: Tabled + Serialize,
{
    match OutputFormat::from(format) {
        OutputFormat::Json => serde_json::to_string_pretty(rows).unwrap_or_else(|_| "[]".to_string()),
        OutputFormat::Table => Table::new(rows).with(Style::rounded()).to_string(),
        OutputFormat::Text => rows
            .iter()
            .map(|row| {
                T::headers()
                    .iter()
                    .zip(row.fields())
                    .map(|(header, field)| format!("{}={}", header, field))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// Render a single record; tables fall back to a two-column key/value layout
pub fn format_record<T: Serialize>(data: &T, format: &str) -> String {
    match OutputFormat::from(format) {
        OutputFormat::Json => serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string()),
        OutputFormat::Table | OutputFormat::Text => {
            let value = serde_json::to_value(data).unwrap_or_default();
            let Some(fields) = value.as_object() else {
                return value.to_string();
            };
            let width = fields.keys().map(|k| k.len()).max().unwrap_or(0);
            fields
                .iter()
                .map(|(key, value)| {
                    let rendered = match value {
                        serde_json::Value::String(s) => s.clone(),
                        serde_json::Value::Null => "-".to_string(),
                        other => other.to_string(),
                    };
                    format!("  {:width$}  {}", key, rendered, width = width)
                })
                .collect::<Vec<_>>()
                .join("\n")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Tabled, Serialize)]
    struct Row {
        name: String,
        bitrate: u64,
    }

    #[test]
    fn test_text_rows() {
        let rows = vec![Row {
            name: "720p".into(),
            bitrate: 2_800_000,
        }];
        assert_eq!(format_rows(&rows, "text"), "name=720p bitrate=2800000");
    }

    #[test]
    fn test_record_layout() {
        let record = serde_json::json!({ "id": "42", "title": null });
        let text = format_record(&record, "text");
        assert!(text.contains("id     42"));
        assert!(text.contains("title  -"));
    }
}
