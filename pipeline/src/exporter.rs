//! Writes the aggregate to disk.
//!
//! Every export goes to a temporary file next to the destination and is
//! renamed over it once fully written, so a failed export leaves whatever
//! was at `path` untouched.

use common::JobRecord;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;
use tempfile::NamedTempFile;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(format!("unsupported export format {other:?}")),
        }
    }
}

pub fn export(records: &[JobRecord], path: impl AsRef<Path>, format: ExportFormat) -> Result<(), ExportError> {
    match format {
        ExportFormat::Json => export_json(records, path),
        ExportFormat::Csv => export_csv(records, path),
    }
}

/// Indented UTF-8 JSON array, one object per record, in order.
pub fn export_json(records: &[JobRecord], path: impl AsRef<Path>) -> Result<(), ExportError> {
    let path = path.as_ref();
    write_atomically(path, |out| {
        serde_json::to_writer_pretty(&mut *out, records)?;
        out.write_all(b"\n")?;
        Ok(())
    })?;
    info!(count = records.len(), path = %path.display(), "saved jobs as JSON");
    Ok(())
}

/// Header row followed by one row per record.
pub fn export_csv(records: &[JobRecord], path: impl AsRef<Path>) -> Result<(), ExportError> {
    let path = path.as_ref();
    write_atomically(path, |out| {
        let mut writer = csv::Writer::from_writer(out);
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    })?;
    info!(count = records.len(), path = %path.display(), "saved jobs as CSV");
    Ok(())
}

/// Reads back a file written by [`export_json`].
pub fn import_json(path: impl AsRef<Path>) -> Result<Vec<JobRecord>, ExportError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let records: Vec<JobRecord> = serde_json::from_reader(BufReader::new(file))?;
    info!(count = records.len(), path = %path.display(), "loaded jobs from JSON");
    Ok(records)
}

fn write_atomically<F>(path: &Path, write: F) -> Result<(), ExportError>
where
    F: FnOnce(&mut dyn Write) -> Result<(), ExportError>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut out = BufWriter::new(tmp.as_file_mut());
        write(&mut out)?;
        out.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| ExportError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn records() -> Vec<JobRecord> {
        vec![
            JobRecord {
                posted_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                title: "Senior Python Dev".to_string(),
                company: "TechCorp".to_string(),
                location: "London".to_string(),
                contract_type: "permanent".to_string(),
                salary_display: "£80,000".to_string(),
                url: "http://example.com/1".to_string(),
            },
            JobRecord {
                posted_date: NaiveDate::from_ymd_opt(2024, 4, 30).unwrap(),
                title: "Données, \"quoted\"".to_string(),
                company: "N/A".to_string(),
                location: "N/A".to_string(),
                contract_type: "N/A".to_string(),
                salary_display: "N/A".to_string(),
                url: String::new(),
            },
        ]
    }

    #[test]
    fn test_json_export_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.json");
        export_json(&records(), &path).unwrap();
        assert_eq!(import_json(&path).unwrap(), records());
    }

    #[test]
    fn test_json_export_is_indented_and_keeps_all_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.json");
        export_json(&records(), &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("[\n  {"));
        assert!(text.contains("\"url\": \"http://example.com/1\""));
        assert!(text.contains("Données"));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value[0].as_object().unwrap().len(), 7);
    }

    #[test]
    fn test_export_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.json");
        export_json(&records(), &path).unwrap();
        export_json(&records()[..1], &path).unwrap();
        assert_eq!(import_json(&path).unwrap().len(), 1);
    }

    #[test]
    fn test_unwritable_path_fails_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("jobs.json");
        assert!(matches!(export_json(&records(), &path), Err(ExportError::Io(_))));
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_csv_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.csv");
        export(&records(), &path, ExportFormat::Csv).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("posted_date,title,company,location,contract_type,salary_display,url")
        );
        assert_eq!(
            lines.next(),
            Some("2024-05-01,Senior Python Dev,TechCorp,London,permanent,\"£80,000\",http://example.com/1")
        );
        assert_eq!(lines.next(), Some("2024-04-30,\"Données, \"\"quoted\"\"\",N/A,N/A,N/A,N/A,"));
    }

    #[test]
    fn test_empty_export_is_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.json");
        export_json(&[], &path).unwrap();
        assert!(import_json(&path).unwrap().is_empty());
    }

    #[test]
    fn test_import_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.json");
        std::fs::write(&path, "{\"not\": \"a list\"}").unwrap();
        assert!(matches!(import_json(&path), Err(ExportError::Json(_))));
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("CSV".parse::<ExportFormat>(), Ok(ExportFormat::Csv));
        assert_eq!("json".parse::<ExportFormat>(), Ok(ExportFormat::Json));
        assert!("xml".parse::<ExportFormat>().is_err());
    }
}
