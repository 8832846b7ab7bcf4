//! CSV ingest.
//!
//! Turns a CSV with one row per observation into a [`Dataset`]:
//! - factor and target columns are looked up by (case-insensitive) header name
//! - rows with a missing or non-numeric value are skipped and reported
//! - zero usable rows is an error (exit code 3)

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use nalgebra::{DMatrix, DVector};

use crate::domain::{Dataset, FactorSet};
use crate::error::AppError;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub id: Option<String>,
    pub message: String,
}

/// Ingest output: the usable observations plus what was skipped.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub dataset: Dataset,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
}

/// Which columns to read.
#[derive(Debug, Clone)]
pub struct ColumnSpec<'a> {
    pub factors: &'a [String],
    pub target: &'a str,
    /// Column holding the row identifier; line numbers are used when absent.
    pub id_column: Option<&'a str>,
}

/// Load a dataset from a CSV file.
pub fn load_dataset(path: &Path, columns: &ColumnSpec<'_>) -> Result<IngestedData, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    let data = read_dataset(file, columns)?;

    log::info!(
        "loaded {} of {} rows from {} ({} skipped)",
        data.rows_used,
        data.rows_read,
        path.display(),
        data.row_errors.len()
    );
    Ok(data)
}

/// Same as [`load_dataset`] over any reader.
pub fn read_dataset<R: Read>(reader: R, columns: &ColumnSpec<'_>) -> Result<IngestedData, AppError> {
    let factors = FactorSet::new(columns.factors.iter().cloned())
        .map_err(|_| AppError::new(2, "At least one factor column is required."))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let factor_idx = factors
        .names()
        .iter()
        .map(|name| require_column(&header_map, name))
        .collect::<Result<Vec<usize>, AppError>>()?;
    let target_idx = require_column(&header_map, columns.target)?;
    let id_idx = columns
        .id_column
        .map(|name| require_column(&header_map, name))
        .transpose()?;

    let mut ids = Vec::new();
    let mut values = Vec::new();
    let mut target = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: header line plus 1-based numbering.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    id: None,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        let id = match id_idx {
            Some(i) => get_value(&record, i).map(str::to_string),
            None => Some(line.to_string()),
        };

        let parsed = factor_idx
            .iter()
            .zip(factors.names())
            .map(|(&i, name)| parse_f64(&record, i, name))
            .collect::<Result<Vec<f64>, String>>()
            .and_then(|row| Ok((row, parse_f64(&record, target_idx, columns.target)?)));

        match (parsed, id) {
            (Ok((row, f)), Some(id)) => {
                ids.push(id);
                values.extend(row);
                target.push(f);
            }
            (Ok(_), None) => row_errors.push(RowError {
                line,
                id: None,
                message: "Missing identifier value.".to_string(),
            }),
            (Err(message), id) => row_errors.push(RowError { line, id, message }),
        }
    }

    let rows_used = target.len();
    if rows_used == 0 {
        return Err(AppError::new(3, "No valid rows remain after parsing."));
    }

    for e in &row_errors {
        log::warn!("skipped line {}: {}", e.line, e.message);
    }

    let x = DMatrix::from_row_slice(rows_used, factors.len(), &values);
    let y = DVector::from_vec(target);
    let dataset = Dataset::new(ids, factors, x, y)?;

    Ok(IngestedData {
        dataset,
        row_errors,
        rows_read,
        rows_used,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn require_column(header_map: &HashMap<String, usize>, name: &str) -> Result<usize, AppError> {
    header_map
        .get(&normalize_header_name(name))
        .copied()
        .ok_or_else(|| AppError::new(2, format!("Missing required column: `{name}`")))
}

fn get_value(record: &StringRecord, idx: usize) -> Option<&str> {
    record.get(idx).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_f64(record: &StringRecord, idx: usize, name: &str) -> Result<f64, String> {
    let raw = get_value(record, idx).ok_or_else(|| format!("Missing value: `{name}`"))?;
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(format!("Invalid number for `{name}`: '{raw}'")),
    }
}
