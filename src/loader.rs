use std::collections::HashMap;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Range, Reader};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{ColumnMap, Field, LoaderConfig};
use crate::models::{LoadReport, LoadStatus, RawRow};

const MISSING_CUSTOMER_ID: &str = "None";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("data file not found at {}", .0.display())]
    SourceUnavailable(PathBuf),
    #[error("unsupported data file format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error("sheet '{0}' not found in workbook")]
    SheetMissing(String),
    #[error("workbook error: {0}")]
    Spreadsheet(#[from] calamine::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Workbook,
    Csv,
}

fn source_kind(path: &Path) -> Option<SourceKind> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" | "xla" | "ods" => Some(SourceKind::Workbook),
        "csv" => Some(SourceKind::Csv),
        _ => None,
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Extracted {
    pub rows: Vec<RawRow>,
    pub skipped: usize,
}

impl Extracted {
    fn push(&mut self, line: usize, parsed: Result<RawRow, RowError>) {
        match parsed {
            Ok(row) => self.rows.push(row),
            Err(err) => {
                debug!(row = line, error = %err, "skipping malformed row");
                self.skipped += 1;
            }
        }
    }
}

/// Reads every row from `source`. Never fails: an absent or unreadable
/// source yields no rows and a report saying why.
pub fn load_rows(source: Option<&Path>, config: &LoaderConfig) -> (Vec<RawRow>, LoadReport) {
    let Some(path) = source else {
        warn!("no data file found; serving an empty portfolio");
        return (Vec::new(), LoadReport::unavailable(None));
    };

    match read_source(path, config) {
        Ok(extracted) => {
            info!(
                path = %path.display(),
                loaded = extracted.rows.len(),
                skipped = extracted.skipped,
                "Loaded {} accounts from data file",
                extracted.rows.len()
            );
            let report = LoadReport {
                source: Some(path.to_path_buf()),
                status: LoadStatus::Loaded,
                rows_read: extracted.rows.len(),
                rows_skipped: extracted.skipped,
            };
            (extracted.rows, report)
        }
        Err(LoadError::SourceUnavailable(missing)) => {
            warn!(path = %missing.display(), "data file not found; serving an empty portfolio");
            (Vec::new(), LoadReport::unavailable(Some(missing)))
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to read data file; serving an empty portfolio");
            let report = LoadReport {
                source: Some(path.to_path_buf()),
                status: LoadStatus::SourceMalformed(err.to_string()),
                rows_read: 0,
                rows_skipped: 0,
            };
            (Vec::new(), report)
        }
    }
}

pub fn read_source(path: &Path, config: &LoaderConfig) -> Result<Extracted, LoadError> {
    if !path.is_file() {
        return Err(LoadError::SourceUnavailable(path.to_path_buf()));
    }

    match source_kind(path) {
        Some(SourceKind::Workbook) => {
            let range = read_sheet(path, &config.sheet)?;
            Ok(rows_from_range(&range, &config.columns))
        }
        Some(SourceKind::Csv) => read_csv(path, &config.columns),
        None => Err(LoadError::UnsupportedFormat(path.to_path_buf())),
    }
}

fn read_sheet(path: &Path, sheet: &str) -> Result<Range<Data>, LoadError> {
    let mut workbook = open_workbook_auto(path)?;
    if !workbook.sheet_names().iter().any(|name| name == sheet) {
        return Err(LoadError::SheetMissing(sheet.to_string()));
    }
    Ok(workbook.worksheet_range(sheet)?)
}

pub fn rows_from_range(range: &Range<Data>, columns: &ColumnMap) -> Extracted {
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Extracted::default();
    };
    let headers: Vec<String> = header.iter().map(|cell| cell.to_string()).collect();
    let positions = columns.resolve(&headers);

    let mut extracted = Extracted::default();
    for (idx, row) in rows.enumerate() {
        let parsed = parse_row(&positions, |col| row.get(col).map(cell_from_data));
        extracted.push(idx + 2, parsed);
    }
    extracted
}

fn read_csv(path: &Path, columns: &ColumnMap) -> Result<Extracted, LoadError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
    let positions = columns.resolve(&headers);

    let mut extracted = Extracted::default();
    for (idx, result) in reader.records().enumerate() {
        let parsed = match result {
            Ok(record) => parse_row(&positions, |col| record.get(col).map(cell_from_text)),
            Err(err) => Err(RowError::Unreadable(err.to_string())),
        };
        extracted.push(idx + 2, parsed);
    }
    Ok(extracted)
}

#[derive(Debug, Clone, PartialEq)]
enum Cell<'a> {
    Empty,
    Int(i64),
    Float(f64),
    Text(&'a str),
    Invalid,
}

fn cell_from_data(data: &Data) -> Cell<'_> {
    match data {
        Data::Empty => Cell::Empty,
        Data::Int(value) => Cell::Int(*value),
        Data::Float(value) => Cell::Float(*value),
        Data::Bool(value) => Cell::Int(i64::from(*value)),
        Data::String(value) if value.trim().is_empty() => Cell::Empty,
        Data::String(value) => Cell::Text(value),
        Data::DateTime(value) => Cell::Float(value.as_f64()),
        _ => Cell::Invalid,
    }
}

fn cell_from_text(value: &str) -> Cell<'_> {
    if value.trim().is_empty() {
        Cell::Empty
    } else {
        Cell::Text(value)
    }
}

#[derive(Debug, Error)]
enum RowError {
    #[error("row contains no values")]
    Blank,
    #[error("{} is not numeric", .0.key())]
    NotNumeric(Field),
    #[error("unreadable record: {0}")]
    Unreadable(String),
}

fn parse_row<'a, F>(positions: &HashMap<Field, usize>, cell_at: F) -> Result<RawRow, RowError>
where
    F: Fn(usize) -> Option<Cell<'a>>,
{
    let cell = |field: Field| {
        positions
            .get(&field)
            .and_then(|col| cell_at(*col))
            .unwrap_or(Cell::Empty)
    };

    if Field::ALL.iter().all(|field| cell(*field) == Cell::Empty) {
        return Err(RowError::Blank);
    }

    let number = |field: Field| number_from(cell(field)).ok_or(RowError::NotNumeric(field));

    Ok(RawRow {
        customer_id: customer_id_from(cell(Field::CustomerId)),
        utilization: number(Field::Utilization)?,
        avg_payment_ratio: number(Field::AvgPaymentRatio)?,
        min_due_freq: number(Field::MinDueFreq)?,
        cash_withdrawal: number(Field::CashWithdrawal)?,
        dpd_next: bucket_from(cell(Field::DpdNext)).ok_or(RowError::NotNumeric(Field::DpdNext))?,
    })
}

fn customer_id_from(cell: Cell<'_>) -> String {
    match cell {
        Cell::Int(value) => value.to_string(),
        Cell::Float(value) => value.to_string(),
        Cell::Text(value) => value.to_string(),
        Cell::Empty | Cell::Invalid => MISSING_CUSTOMER_ID.to_string(),
    }
}

fn number_from(cell: Cell<'_>) -> Option<f64> {
    let value = match cell {
        Cell::Empty => Some(0.0),
        Cell::Int(value) => Some(value as f64),
        Cell::Float(value) => Some(value),
        Cell::Text(value) => value.trim().parse().ok(),
        Cell::Invalid => None,
    };
    value.filter(|value| value.is_finite())
}

// Truncates toward zero.
fn bucket_from(cell: Cell<'_>) -> Option<i64> {
    match cell {
        Cell::Int(value) => Some(value),
        Cell::Text(value) => {
            let value = value.trim();
            value
                .parse::<i64>()
                .ok()
                .or_else(|| truncate(value.parse::<f64>().ok()?))
        }
        other => truncate(number_from(other)?),
    }
}

fn truncate(value: f64) -> Option<i64> {
    value.is_finite().then(|| value.trunc() as i64)
}
