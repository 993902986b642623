// LogFold - core/export.rs
//
// CSV and JSON export of parsed events and their extracted fields.
// Core layer: writes to any Write trait object.

use crate::core::model::ParsedEvent;
use crate::util::constants::MAX_EXPORT_EVENTS;
use crate::util::error::ExportError;
use serde::Deserialize;
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

/// Supported export encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "unknown export format '{other}' (expected csv or json)"
            )),
        }
    }
}

/// Export events in `format`. Returns the number of events written.
pub fn export_events<W: Write>(
    events: &[ParsedEvent],
    format: ExportFormat,
    writer: W,
    export_path: &Path,
) -> Result<usize, ExportError> {
    if events.len() > MAX_EXPORT_EVENTS {
        return Err(ExportError::TooManyEvents {
            count: events.len(),
            max: MAX_EXPORT_EVENTS,
        });
    }
    let count = match format {
        ExportFormat::Csv => export_csv(events, writer, export_path)?,
        ExportFormat::Json => export_json(events, writer, export_path)?,
    };
    tracing::info!(
        path = %export_path.display(),
        format = %format,
        events = count,
        "Export complete"
    );
    Ok(count)
}

/// Export events to CSV.
///
/// Writes: event, start_line, end_line, time, severity, level, category, message
pub fn export_csv<W: Write>(
    events: &[ParsedEvent],
    writer: W,
    export_path: &Path,
) -> Result<usize, ExportError> {
    let csv_err = |e| ExportError::Csv {
        path: export_path.to_path_buf(),
        source: e,
    };
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer
        .write_record([
            "event",
            "start_line",
            "end_line",
            "time",
            "severity",
            "level",
            "category",
            "message",
        ])
        .map_err(csv_err)?;

    let mut count = 0;
    for parsed in events {
        let fields = &parsed.fields;
        let time = fields
            .time
            .as_ref()
            .map(|t| t.to_string())
            .unwrap_or_default();

        csv_writer
            .write_record([
                parsed.event.index.to_string().as_str(),
                &parsed.event.start.to_string(),
                &parsed.event.end.to_string(),
                &time,
                fields.severity.as_deref().unwrap_or(""),
                fields.level().label(),
                fields.category.as_deref().unwrap_or(""),
                &fields.message,
            ])
            .map_err(csv_err)?;
        count += 1;
    }

    csv_writer.flush().map_err(|e| ExportError::Io {
        path: export_path.to_path_buf(),
        source: e,
    })?;

    Ok(count)
}

/// Export events to JSON (array of objects).
pub fn export_json<W: Write>(
    events: &[ParsedEvent],
    writer: W,
    export_path: &Path,
) -> Result<usize, ExportError> {
    serde_json::to_writer_pretty(writer, events).map_err(|e| ExportError::Json {
        path: export_path.to_path_buf(),
        source: e,
    })?;
    Ok(events.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{Event, ExtractedFields, TimeValue};
    use chrono::NaiveDate;

    fn make_event(index: usize, message: &str) -> ParsedEvent {
        let raw = format!("2024-01-15 ERROR [db] {message}");
        ParsedEvent {
            event: Event {
                index,
                start: index,
                end: index + 1,
                lines: vec![raw.clone()],
            },
            fields: ExtractedFields {
                time: NaiveDate::from_ymd_opt(2024, 1, 15).map(TimeValue::Date),
                severity: Some("ERROR".to_string()),
                category: Some("db".to_string()),
                message: message.to_string(),
                groups: vec![Some("2024-01-15".to_string())],
                raw,
                matched: true,
            },
        }
    }

    #[test]
    fn test_csv_export() {
        let events = vec![make_event(0, "Error one"), make_event(1, "Error, two")];
        let mut buf = Vec::new();
        let count = export_csv(&events, &mut buf, Path::new("out.csv")).unwrap();
        assert_eq!(count, 2);

        let output = String::from_utf8(buf).unwrap();
        let header = "event,start_line,end_line,time,severity";
        assert!(output.starts_with(header));
        assert!(output.contains("Error one"));
        assert!(output.contains("\"Error, two\""));
        assert!(output.contains("2024-01-15"));
    }

    #[test]
    fn test_json_export() {
        let events = vec![make_event(0, "Test message")];
        let mut buf = Vec::new();
        let count = export_json(&events, &mut buf, Path::new("out.json")).unwrap();
        assert_eq!(count, 1);

        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value[0]["fields"]["message"], "Test message");
        assert_eq!(value[0]["start"], 0);
    }

    #[test]
    fn test_unstructured_event_exports_raw_message() {
        let parsed = ParsedEvent {
            event: Event {
                index: 0,
                start: 0,
                end: 1,
                lines: vec!["garbage".to_string()],
            },
            fields: ExtractedFields::unstructured("garbage".to_string()),
        };
        let mut buf = Vec::new();
        export_events(&[parsed], ExportFormat::Csv, &mut buf, Path::new("x.csv")).unwrap();
        let output = String::from_utf8(buf).unwrap();
        assert!(output.lines().nth(1).unwrap().ends_with(",garbage"));
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("JSON".parse::<ExportFormat>(), Ok(ExportFormat::Json));
        assert_eq!("csv".parse::<ExportFormat>(), Ok(ExportFormat::Csv));
        assert!("xml".parse::<ExportFormat>().is_err());
    }
}
