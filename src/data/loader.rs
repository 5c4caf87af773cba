use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{
    Array, AsArray, Date32Array, Float32Array, Float64Array, Int32Array, Int64Array, StringArray,
};
use arrow::datatypes::DataType;
use chrono::NaiveDate;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;
use thiserror::Error;

use super::dates::parse_date_or_today;
use super::model::{EmploymentType, ExperienceLevel, JobDataset, JobPosting};

// ---------------------------------------------------------------------------
// Errors and column schema
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum DataError {
    #[error("unsupported file extension: .{0}")]
    UnsupportedExtension(String),
    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),
    #[error("row {row}: {message}")]
    InvalidRecord { row: usize, message: String },
}

/// Canonical columns of a job-postings table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    JobTitle,
    ExperienceLevel,
    EmploymentType,
    Location,
    Industry,
    Salary,
    PostedDate,
}

impl Column {
    const ALL: [Column; 7] = [
        Column::JobTitle,
        Column::ExperienceLevel,
        Column::EmploymentType,
        Column::Location,
        Column::Industry,
        Column::Salary,
        Column::PostedDate,
    ];

    fn canonical(self) -> &'static str {
        match self {
            Column::JobTitle => "job_title",
            Column::ExperienceLevel => "experience_level",
            Column::EmploymentType => "employment_type",
            Column::Location => "location",
            Column::Industry => "industry",
            Column::Salary => "salary_usd",
            Column::PostedDate => "posted_date",
        }
    }

    fn aliases(self) -> &'static [&'static str] {
        match self {
            Column::JobTitle => &["job_title", "title"],
            Column::ExperienceLevel => &["experience_level", "experience", "seniority"],
            Column::EmploymentType => &["employment_type", "contract"],
            Column::Location => &["location", "company_location", "city"],
            Column::Industry => &["industry", "sector"],
            Column::Salary => &["salary_usd", "salary_in_usd", "salary"],
            Column::PostedDate => &["posted_date", "date", "posted_at"],
        }
    }

    /// Salary may be absent from the table; every other column is required.
    fn required(self) -> bool {
        !matches!(self, Column::Salary)
    }

    fn matches(self, header: &str) -> bool {
        let h = header.trim().to_ascii_lowercase();
        self.aliases().iter().any(|a| *a == h)
    }
}

/// Position of each canonical column in a header row.
struct ColumnIndex {
    positions: [Option<usize>; 7],
}

impl ColumnIndex {
    fn from_headers<'a>(headers: impl IntoIterator<Item = &'a str>) -> Result<Self, DataError> {
        let mut positions = [None; 7];
        for (pos, header) in headers.into_iter().enumerate() {
            for (slot, col) in Column::ALL.iter().enumerate() {
                if positions[slot].is_none() && col.matches(header) {
                    positions[slot] = Some(pos);
                }
            }
        }
        for (slot, col) in Column::ALL.iter().enumerate() {
            if col.required() && positions[slot].is_none() {
                return Err(DataError::MissingColumn(col.canonical()));
            }
        }
        Ok(ColumnIndex { positions })
    }

    fn get(&self, col: Column) -> Option<usize> {
        let slot = Column::ALL.iter().position(|c| *c == col)?;
        self.positions[slot]
    }
}

/// One row of loosely-typed cells, before interpretation.
#[derive(Debug, Default)]
struct RawRow {
    job_title: String,
    experience_level: String,
    employment_type: String,
    location: String,
    industry: String,
    salary: Option<f64>,
    posted_date: Option<NaiveDate>,
    posted_label: String,
}

impl RawRow {
    fn into_posting(self) -> JobPosting {
        let posted_date = self
            .posted_date
            .unwrap_or_else(|| parse_date_or_today(&self.posted_label));
        JobPosting {
            job_title: non_empty_or_unknown(self.job_title),
            experience_level: ExperienceLevel::parse(&non_empty_or_unknown(self.experience_level)),
            employment_type: EmploymentType::parse(&non_empty_or_unknown(self.employment_type)),
            location: non_empty_or_unknown(self.location),
            industry: non_empty_or_unknown(self.industry),
            salary_usd: self.salary.filter(|s| s.is_finite() && *s >= 0.0),
            posted_date,
        }
    }
}

fn non_empty_or_unknown(s: String) -> String {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        "Unknown".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Parse a salary cell, tolerating thousands separators and a leading `$`.
fn parse_salary(s: &str) -> Option<f64> {
    let cleaned: String = s
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',' && *c != '_')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a job-postings dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – flat columns, one row per posting (recommended)
/// * `.json`    – `[{ "job_title": "...", "salary_usd": 120000, ... }, ...]`
/// * `.csv`     – header row with the column names
pub fn load_file(path: &Path) -> Result<JobDataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        "csv" => load_csv(path),
        other => Err(DataError::UnsupportedExtension(other.to_string()).into()),
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented):
///
/// ```json
/// [
///   {
///     "job_title": "Data Scientist",
///     "experience_level": "Senior-level",
///     "employment_type": "Full-time",
///     "location": "Berlin",
///     "industry": "Finance",
///     "salary_usd": 98000,
///     "posted_date": "2024-03-15"
///   },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<JobDataset> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    parse_json(&text)
}

fn parse_json(text: &str) -> Result<JobDataset> {
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;

    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut postings = Vec::with_capacity(records.len());

    for (i, rec) in records.iter().enumerate() {
        let obj = rec.as_object().ok_or_else(|| DataError::InvalidRecord {
            row: i,
            message: "not a JSON object".into(),
        })?;

        // Resolve aliases against this record's own keys.
        let index = ColumnIndex::from_headers(obj.keys().map(String::as_str))
            .with_context(|| format!("Row {i}"))?;
        let keys: Vec<&String> = obj.keys().collect();
        let cell = |col: Column| index.get(col).and_then(|pos| obj.get(keys[pos].as_str()));

        let posted = cell(Column::PostedDate).map(json_to_text).unwrap_or_default();
        let row = RawRow {
            job_title: cell(Column::JobTitle).map(json_to_text).unwrap_or_default(),
            experience_level: cell(Column::ExperienceLevel).map(json_to_text).unwrap_or_default(),
            employment_type: cell(Column::EmploymentType).map(json_to_text).unwrap_or_default(),
            location: cell(Column::Location).map(json_to_text).unwrap_or_default(),
            industry: cell(Column::Industry).map(json_to_text).unwrap_or_default(),
            salary: cell(Column::Salary).and_then(json_to_salary),
            posted_date: None,
            posted_label: posted,
        };
        postings.push(row.into_posting());
    }

    Ok(JobDataset::from_postings(postings))
}

fn json_to_text(val: &JsonValue) -> String {
    match val {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

fn json_to_salary(val: &JsonValue) -> Option<f64> {
    match val {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => parse_salary(s),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names (aliases accepted), one posting
/// per row.  An empty salary cell means "not published".
fn load_csv(path: &Path) -> Result<JobDataset> {
    let reader = csv::Reader::from_path(path).context("opening CSV")?;
    read_csv(reader)
}

fn read_csv<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<JobDataset> {
    let headers = reader.headers().context("reading CSV headers")?.clone();
    let index = ColumnIndex::from_headers(headers.iter())?;

    let mut postings = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let cell = |col: Column| index.get(col).and_then(|pos| record.get(pos)).unwrap_or("");

        let row = RawRow {
            job_title: cell(Column::JobTitle).to_string(),
            experience_level: cell(Column::ExperienceLevel).to_string(),
            employment_type: cell(Column::EmploymentType).to_string(),
            location: cell(Column::Location).to_string(),
            industry: cell(Column::Industry).to_string(),
            salary: parse_salary(cell(Column::Salary)),
            posted_date: None,
            posted_label: cell(Column::PostedDate).to_string(),
        };
        postings.push(row.into_posting());
    }

    Ok(JobDataset::from_postings(postings))
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file of job postings.
///
/// Expected schema:
/// - text columns (`Utf8`/`LargeUtf8`) for the categorical fields
/// - `salary_usd`: any integer or float type (nullable)
/// - `posted_date`: `Date32` or an ISO-8601 text column
fn load_parquet(path: &Path) -> Result<JobDataset> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut postings = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();
        let index = ColumnIndex::from_headers(schema.fields().iter().map(|f| f.name().as_str()))?;

        let column = |col: Column| index.get(col).map(|pos| batch.column(pos));

        for row in 0..batch.num_rows() {
            let text = |col: Column| column(col).map(|c| extract_text(c, row)).unwrap_or_default();

            let (posted_date, posted_label) = match column(Column::PostedDate) {
                Some(c) => extract_date(c, row)
                    .with_context(|| format!("Row {row}: failed to read 'posted_date'"))?,
                None => (None, String::new()),
            };

            let raw = RawRow {
                job_title: text(Column::JobTitle),
                experience_level: text(Column::ExperienceLevel),
                employment_type: text(Column::EmploymentType),
                location: text(Column::Location),
                industry: text(Column::Industry),
                salary: column(Column::Salary).and_then(|c| extract_f64(c, row)),
                posted_date,
                posted_label,
            };
            postings.push(raw.into_posting());
        }
    }

    Ok(JobDataset::from_postings(postings))
}

// -- Parquet / Arrow helpers --

/// Read a cell as text; non-text columns are rendered with their value.
fn extract_text(col: &Arc<dyn Array>, row: usize) -> String {
    if col.is_null(row) {
        return String::new();
    }
    match col.data_type() {
        DataType::Utf8 => col.as_string::<i32>().value(row).to_string(),
        DataType::LargeUtf8 => col.as_string::<i64>().value(row).to_string(),
        _ => extract_f64(col, row)
            .map(|v| v.to_string())
            .unwrap_or_default(),
    }
}

/// Read a numeric cell as `f64`; nulls and text that is not a number give `None`.
fn extract_f64(col: &Arc<dyn Array>, row: usize) -> Option<f64> {
    if col.is_null(row) {
        return None;
    }
    let any = col.as_any();
    match col.data_type() {
        DataType::Int32 => any.downcast_ref::<Int32Array>().map(|a| a.value(row) as f64),
        DataType::Int64 => any.downcast_ref::<Int64Array>().map(|a| a.value(row) as f64),
        DataType::Float32 => any.downcast_ref::<Float32Array>().map(|a| a.value(row) as f64),
        DataType::Float64 => any.downcast_ref::<Float64Array>().map(|a| a.value(row)),
        DataType::Utf8 => any
            .downcast_ref::<StringArray>()
            .and_then(|a| parse_salary(a.value(row))),
        _ => None,
    }
}

/// Read a date cell.  Text dates are returned as a label so that malformed
/// values go through the lenient fallback instead of failing the load.
fn extract_date(col: &Arc<dyn Array>, row: usize) -> Result<(Option<NaiveDate>, String)> {
    if col.is_null(row) {
        return Ok((None, String::new()));
    }
    match col.data_type() {
        DataType::Date32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Date32Array>()
                .context("expected Date32Array")?;
            Ok((arr.value_as_date(row), String::new()))
        }
        DataType::Utf8 | DataType::LargeUtf8 => Ok((None, extract_text(col, row))),
        other => bail!("Expected Date32 or text column, got {other:?}"),
    }
}
