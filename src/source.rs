use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::Field as ParquetField;
use tracing::debug;

use crate::error::PipelineError;

/// Untyped table as read from a source: a header row plus string cells.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub origin: PathBuf,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(origin: impl Into<PathBuf>, headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            origin: origin.into(),
            headers,
            rows,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Parquet,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("parquet") => SourceFormat::Parquet,
            _ => SourceFormat::Csv,
        }
    }
}

pub fn load_table(path: &Path) -> Result<RawTable, PipelineError> {
    let file = open_source(path)?;
    let table = match SourceFormat::from_path(path) {
        SourceFormat::Csv => read_csv_table(path, file)?,
        SourceFormat::Parquet => read_parquet_table(path, file)?,
    };
    debug!(
        path = %path.display(),
        columns = table.headers.len(),
        rows = table.rows.len(),
        "loaded source table"
    );
    Ok(table)
}

fn open_source(path: &Path) -> Result<File, PipelineError> {
    match File::open(path) {
        Ok(file) => Ok(file),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Err(PipelineError::not_found(path)),
        Err(err) => Err(PipelineError::malformed(path, format!("unreadable: {err}"))),
    }
}

/// Reads comma-delimited text whose first record is the header row. `origin`
/// only labels errors, so in-memory buffers can be passed with any name.
pub fn read_csv_table<R: Read>(origin: &Path, rdr: R) -> Result<RawTable, PipelineError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(rdr);

    let headers = reader
        .headers()
        .map_err(|err| PipelineError::malformed(origin, format!("header row: {err}")))?
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>();
    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        return Err(PipelineError::malformed(origin, "no header row"));
    }

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record
            .map_err(|err| PipelineError::malformed(origin, format!("row {}: {err}", idx + 1)))?;
        rows.push(record.iter().map(|cell| cell.to_string()).collect());
    }

    Ok(RawTable::new(origin, headers, rows))
}

fn read_parquet_table(origin: &Path, file: File) -> Result<RawTable, PipelineError> {
    let reader = SerializedFileReader::new(file)
        .map_err(|err| PipelineError::malformed(origin, format!("parquet reader: {err}")))?;

    let headers = reader
        .metadata()
        .file_metadata()
        .schema_descr()
        .root_schema()
        .get_fields()
        .iter()
        .map(|field| field.name().to_string())
        .collect::<Vec<_>>();
    if headers.is_empty() {
        return Err(PipelineError::malformed(origin, "parquet schema has no columns"));
    }

    let iter = reader
        .get_row_iter(None)
        .map_err(|err| PipelineError::malformed(origin, format!("parquet rows: {err}")))?;

    let mut rows = Vec::new();
    for (idx, row) in iter.enumerate() {
        let row =
            row.map_err(|err| PipelineError::malformed(origin, format!("row {}: {err}", idx + 1)))?;
        rows.push(
            row.get_column_iter()
                .map(|(_, field)| parquet_cell(field))
                .collect(),
        );
    }

    Ok(RawTable::new(origin, headers, rows))
}

fn parquet_cell(field: &ParquetField) -> String {
    match field {
        ParquetField::Null => String::new(),
        ParquetField::Str(s) => s.clone(),
        ParquetField::Double(v) => v.to_string(),
        ParquetField::Float(v) => v.to_string(),
        ParquetField::Long(v) => v.to_string(),
        ParquetField::Int(v) => v.to_string(),
        ParquetField::Short(v) => v.to_string(),
        ParquetField::Byte(v) => v.to_string(),
        ParquetField::ULong(v) => v.to_string(),
        ParquetField::UInt(v) => v.to_string(),
        ParquetField::UShort(v) => v.to_string(),
        ParquetField::UByte(v) => v.to_string(),
        ParquetField::Bool(v) => v.to_string(),
        other => other.to_string(),
    }
}
