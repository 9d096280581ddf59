// Result export to JSON, CSV and plain text

use crate::run::EndpointRecord;
use std::fs;
use std::io;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    Txt,
}

impl ExportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(ExportFormat::Json),
            "csv" => Some(ExportFormat::Csv),
            "txt" => Some(ExportFormat::Txt),
            _ => None,
        }
    }

    /// Picks the format from the file extension, falling back to JSON.
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_str)
            .unwrap_or(ExportFormat::Json)
    }
}

pub fn generate_json_export(records: &[EndpointRecord]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(records)
}

const CSV_HEADER: [&str; 6] = ["value", "resolved_url", "type", "source", "reachable", "status"];

/// Unprobed records leave `reachable` and `status` empty.
pub fn generate_csv_export(records: &[EndpointRecord]) -> io::Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(CSV_HEADER)?;

    for record in records {
        let reachable = record.reachable.map(|r| r.to_string()).unwrap_or_default();
        let status = record.status.map(|s| s.to_string()).unwrap_or_default();
        writer.write_record([
            record.value.as_str(),
            record.resolved_url.as_str(),
            record.kind.to_string().as_str(),
            record.source.to_string().as_str(),
            reachable.as_str(),
            status.as_str(),
        ])?;
    }

    let data = writer.into_inner().map_err(|e| e.into_error())?;
    String::from_utf8(data).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

pub fn generate_txt_export(records: &[EndpointRecord]) -> String {
    records
        .iter()
        .map(|record| match record.status {
            Some(status) if status != 0 => format!("{} [{}]", record.resolved_url, status),
            _ => record.resolved_url.clone(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Writes `records` to `path` in the format its extension selects, creating
/// missing parent directories first.
pub fn export_results(path: &Path, records: &[EndpointRecord]) -> io::Result<ExportFormat> {
    let format = ExportFormat::from_path(path);
    let content = match format {
        ExportFormat::Json => generate_json_export(records)?,
        ExportFormat::Csv => generate_csv_export(records)?,
        ExportFormat::Txt => generate_txt_export(records),
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;

    info!("Exported {} records to {}", records.len(), path.display());
    Ok(format)
}
