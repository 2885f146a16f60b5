use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use super::ReportId;
use crate::marketplace::validation::{formatted, Pattern, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("report file {0} already exists; export aborted")]
    AlreadyExists(PathBuf),
    #[error("failed to access report file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid report CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid report timestamp '{0}'")]
    Timestamp(String),
    #[error("report file contains no rows")]
    Empty,
}

/// Titled key/value summary that can be exported to and imported from CSV.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    id: ReportId,
    report_type: String,
    data: Vec<(String, String)>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ReportRow {
    report_id: String,
    report_type: String,
    created_at: String,
    field: String,
    value: String,
}

impl Report {
    /// `data` must hold at least one entry so the CSV export can be read back.
    pub fn new(
        report_type: impl Into<String>,
        data: Vec<(String, String)>,
    ) -> Result<Self, ValidationError> {
        Self::restore(ReportId::generate(), report_type, data, Utc::now())
    }

    pub fn restore(
        id: ReportId,
        report_type: impl Into<String>,
        data: Vec<(String, String)>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let report_type = report_type.into();
        formatted("report_type", &report_type, Pattern::LettersAndSpaces)?;
        if data.is_empty() {
            return Err(ValidationError::Empty { field: "data" });
        }
        Ok(Self {
            id,
            report_type,
            data,
            created_at,
        })
    }

    pub fn id(&self) -> &ReportId {
        &self.id
    }

    pub fn report_type(&self) -> &str {
        &self.report_type
    }

    pub fn data(&self) -> &[(String, String)] {
        &self.data
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.data
            .iter()
            .find(|(key, _)| key == field)
            .map(|(_, value)| value.as_str())
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn set_report_type(&mut self, report_type: impl Into<String>) -> Result<(), ValidationError> {
        let report_type = report_type.into();
        formatted("report_type", &report_type, Pattern::LettersAndSpaces)?;
        self.report_type = report_type;
        Ok(())
    }

    /// Human-readable summary, one `field: value` line per entry.
    pub fn render(&self) -> String {
        let mut text = format!("{}\n", self.report_type);
        for (field, value) in &self.data {
            text.push_str(field);
            text.push_str(": ");
            text.push_str(value);
            text.push('\n');
        }
        text
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<(), ReportError> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        let created_at = self.created_at.to_rfc3339();
        for (field, value) in &self.data {
            csv_writer.serialize(ReportRow {
                report_id: self.id.0.clone(),
                report_type: self.report_type.clone(),
                created_at: created_at.clone(),
                field: field.clone(),
                value: value.clone(),
            })?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ReportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .from_reader(reader);
        let mut header: Option<(String, String, String)> = None;
        let mut data = Vec::new();

        for row in csv_reader.deserialize::<ReportRow>() {
            let row = row?;
            if header.is_none() {
                header = Some((row.report_id, row.report_type, row.created_at));
            }
            data.push((row.field, row.value));
        }

        let (id, report_type, created_at) = header.ok_or(ReportError::Empty)?;
        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map_err(|_| ReportError::Timestamp(created_at.clone()))?
            .with_timezone(&Utc);
        Ok(Self::restore(ReportId(id), report_type, data, created_at)?)
    }

    /// Write the report to a new CSV file; an existing file is never overwritten.
    pub fn export(&self, path: impl AsRef<Path>) -> Result<(), ReportError> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|err| match err.kind() {
                std::io::ErrorKind::AlreadyExists => ReportError::AlreadyExists(path.to_path_buf()),
                _ => ReportError::Io(err),
            })?;
        self.to_writer(file)
    }

    pub fn import(path: impl AsRef<Path>) -> Result<Self, ReportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }
}
