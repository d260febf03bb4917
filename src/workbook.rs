//! Workbook ingestion: turns spreadsheet or CSV bytes into sheets of plain cells.
//!
//! Decoding is delegated to `calamine` for binary workbook formats and to the
//! `csv` crate for plain-text input (a CSV file is treated as a single-sheet
//! workbook named after the file stem). Everything downstream only ever sees
//! the three-valued [`Cell`] model: text, number, or empty. Loading builds the
//! whole [`Workbook`] before returning, so a failure never leaves a caller
//! holding partially replaced state.

use std::{fmt, fs::File, path::Path};

use calamine::{Data, Reader, open_workbook_auto};
use log::debug;
use thiserror::Error;

/// Loader failures, split by which collaborator failed. Reading the bytes and
/// decoding them are reported as distinct conditions; neither produces a
/// partial workbook.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode '{path}': {message}")]
    Parse { path: String, message: String },
}

/// A single cell value. Columns carry no inherent type; meaning is only ever
/// assigned by inference downstream.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

pub type Row = Vec<Cell>;

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Cell::Number(_))
    }

    /// Textual form of the cell, or `None` when empty. Numbers render without
    /// a trailing `.0` so that a year cell compares equal to its filter text.
    pub fn text(&self) -> Option<String> {
        match self {
            Cell::Text(value) => Some(value.clone()),
            Cell::Number(value) => Some(format_number(*value)),
            Cell::Empty => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text().unwrap_or_default())
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

/// Returns the cell at `index`, treating anything past the end of the row as
/// empty. Short rows are normal input, never an error.
pub fn cell_at(row: &Row, index: usize) -> &Cell {
    static EMPTY: Cell = Cell::Empty;
    row.get(index).unwrap_or(&EMPTY)
}

#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone)]
pub struct Workbook {
    sheets: Vec<Sheet>,
}

impl Workbook {
    /// Loads every sheet of a workbook into memory. CSV input becomes a
    /// single-sheet workbook.
    pub fn open(path: &Path) -> Result<Self, LoadError> {
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv") || ext.eq_ignore_ascii_case("tsv"));
        let workbook = if is_csv {
            Self::open_delimited(path)?
        } else {
            Self::open_spreadsheet(path)?
        };
        debug!(
            "Loaded {} sheet(s) from {}",
            workbook.sheets.len(),
            path.display()
        );
        Ok(workbook)
    }

    pub fn from_sheets(sheets: Vec<Sheet>) -> Self {
        Self { sheets }
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|sheet| sheet.name.clone()).collect()
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    fn open_spreadsheet(path: &Path) -> Result<Self, LoadError> {
        // Probe readability first so an unreadable file reports as a read
        // failure rather than a decode failure.
        File::open(path).map_err(|source| LoadError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let mut decoder = open_workbook_auto(path).map_err(|err| LoadError::Parse {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        let names = decoder.sheet_names().to_vec();
        let mut sheets = Vec::with_capacity(names.len());
        for name in names {
            let range = decoder
                .worksheet_range(&name)
                .map_err(|err| LoadError::Parse {
                    path: path.display().to_string(),
                    message: format!("sheet '{name}': {err}"),
                })?;
            let rows = range
                .rows()
                .map(|row| row.iter().map(cell_from_data).collect())
                .collect();
            sheets.push(Sheet { name, rows });
        }
        Ok(Self { sheets })
    }

    fn open_delimited(path: &Path) -> Result<Self, LoadError> {
        let delimiter = match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("tsv") => b'\t',
            _ => b',',
        };
        let file = File::open(path).map_err(|source| LoadError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(file);
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|err| LoadError::Parse {
                path: path.display().to_string(),
                message: err.to_string(),
            })?;
            rows.push(record.iter().map(cell_from_field).collect());
        }
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("sheet")
            .to_string();
        Ok(Self {
            sheets: vec![Sheet { name, rows }],
        })
    }
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(value) => Cell::Text(value.clone()),
        Data::Float(value) => Cell::Number(*value),
        Data::Int(value) => Cell::Number(*value as f64),
        Data::Bool(value) => Cell::Text(if *value { "true" } else { "false" }.to_string()),
        Data::DateTime(value) => Cell::Number(value.as_f64()),
        Data::DateTimeIso(value) | Data::DurationIso(value) => Cell::Text(value.clone()),
    }
}

fn cell_from_field(field: &str) -> Cell {
    if field.is_empty() {
        return Cell::Empty;
    }
    // CSV carries no type information; a numeric-looking field becomes a
    // number so header detection sees the same shapes as workbook input.
    if let Ok(value) = field.trim().parse::<f64>()
        && !field.trim().is_empty()
    {
        return Cell::Number(value);
    }
    Cell::Text(field.to_string())
}
