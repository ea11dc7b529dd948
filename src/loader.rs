use crate::dataset::{Cell, Dataset, Row};
use calamine::{Data, Range, Reader, open_workbook_auto_from_rs};
use std::collections::HashSet;
use std::io::Cursor;
use thiserror::Error;

/// Name given to a header cell that is left blank
const EMPTY_HEADER: &str = "__EMPTY";

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("{0}")]
    Workbook(#[from] calamine::Error),

    #[error("Workbook contains no sheets")]
    NoSheets,
}

/// Parse an uploaded workbook into a dataset
///
/// Only the first sheet is read. Its first row supplies the header names and
/// every following row becomes a data row. Rows with no values are skipped.
/// The format is detected from the content, so xlsx, xlsm, xlsb, xls and ods
/// are all accepted.
///
/// # Arguments
/// * `file_name` - Original name of the uploaded file
/// * `bytes` - Raw file content
///
/// # Returns
/// * `Result<Dataset, ParseError>` - The parsed dataset, possibly with no rows
pub fn parse_workbook(file_name: &str, bytes: &[u8]) -> Result<Dataset, ParseError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let range = workbook.worksheet_range_at(0).ok_or(ParseError::NoSheets)??;

    Ok(dataset_from_range(file_name, &range))
}

/// Convert a sheet range into a dataset, using the first row as headers
pub fn dataset_from_range(file_name: &str, range: &Range<Data>) -> Dataset {
    let mut rows = range.rows();

    let Some(header_row) = rows.next() else {
        return Dataset::new(file_name, Vec::new(), Vec::new());
    };
    let headers = header_names(header_row);

    let data = rows
        .map(|cells| Row::new(cells.iter().map(coerce).collect()))
        .filter(|row| !row.is_blank())
        .collect();

    Dataset::new(file_name, headers, data)
}

/// Derive unique header names from the header row
///
/// Blank cells become `__EMPTY`, `__EMPTY_1`, ... and repeated names get a
/// numeric suffix (`Name`, `Name_1`, ...).
fn header_names(cells: &[Data]) -> Vec<String> {
    let mut seen = HashSet::new();

    cells
        .iter()
        .map(|cell| {
            let base = coerce(cell)
                .map(|c| c.to_string())
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| EMPTY_HEADER.to_string());

            let mut name = base.clone();
            let mut suffix = 0;
            while seen.contains(&name) {
                suffix += 1;
                name = format!("{}_{}", base, suffix);
            }
            seen.insert(name.clone());
            name
        })
        .collect()
}

/// Map a workbook cell onto the dataset's scalar model
fn coerce(cell: &Data) -> Option<Cell> {
    match cell {
        Data::Int(i) => Some(Cell::Number(*i as f64)),
        Data::Float(f) => Some(Cell::Number(*f)),
        // Dates keep their serial number, as the workbook stores them
        Data::DateTime(dt) => Some(Cell::Number(dt.as_f64())),
        Data::String(s) if s.is_empty() => None,
        Data::String(s) => Some(Cell::Text(s.clone())),
        Data::Bool(b) => Some(Cell::Text(b.to_string())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(Cell::Text(s.clone())),
        Data::Error(e) => Some(Cell::Text(e.to_string())),
        Data::Empty => None,
    }
}
