//! Spreadsheet import and export.
//!
//! Uploads must carry an `.xls` name; `calamine` sniffs the actual workbook
//! format from the bytes. Exports are OOXML workbooks written with
//! `rust_xlsxwriter`. The first row of every sheet is a header.

use std::io::Cursor;

use calamine::{Data, Reader};
use cinelog_common::{AppError, AppResult};
use rust_xlsxwriter::{Format, Workbook};

/// MIME type of every export download.
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const ACCEPTED_EXTENSION: &str = "xls";

/// An uploaded spreadsheet.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Other(String),
}

impl Cell {
    fn from_data(data: &Data) -> Self {
        match data {
            Data::Empty => Self::Empty,
            Data::String(s) if s.trim().is_empty() => Self::Empty,
            Data::String(s) => Self::Text(s.trim().to_string()),
            #[allow(clippy::cast_precision_loss)]
            Data::Int(n) => Self::Number(*n as f64),
            Data::Float(f) => Self::Number(*f),
            other => Self::Other(other.to_string()),
        }
    }

    /// Text rendering, with whole numbers written without a fraction.
    #[must_use]
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Empty => None,
            Self::Text(s) | Self::Other(s) => Some(s.clone()),
            #[allow(clippy::cast_possible_truncation)]
            Self::Number(n) if n.fract() == 0.0 => Some(format!("{}", *n as i64)),
            Self::Number(n) => Some(n.to_string()),
        }
    }

    #[must_use]
    pub const fn is_number(&self) -> bool {
        matches!(self, Self::Number(_))
    }
}

/// Read the data rows of the first worksheet, skipping the header row.
///
/// Wrong extensions and unreadable workbooks both fail with
/// [`AppError::InvalidFileFormat`] before any row is looked at.
pub fn read_rows(upload: &Upload) -> AppResult<Vec<Vec<Cell>>> {
    let extension = upload
        .filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();
    if extension != ACCEPTED_EXTENSION {
        return Err(AppError::InvalidFileFormat);
    }

    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(upload.bytes.clone()))
        .map_err(|e| {
            tracing::warn!(error = %e, filename = %upload.filename, "Unreadable spreadsheet");
            AppError::InvalidFileFormat
        })?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::BadRequest("No worksheet found in the spreadsheet.".to_string()))?
        .map_err(|e| {
            tracing::warn!(error = %e, filename = %upload.filename, "Unreadable worksheet");
            AppError::InvalidFileFormat
        })?;

    // The range starts at the first used cell, not at A1.
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let padding = start_col as usize;

    Ok(range
        .rows()
        .enumerate()
        .filter(|(offset, _)| start_row as usize + offset > 0)
        .map(|(_, row)| {
            std::iter::repeat_n(Cell::Empty, padding)
                .chain(row.iter().map(Cell::from_data))
                .collect()
        })
        .collect())
}

/// Cell at `index`, or [`Cell::Empty`] for short rows.
#[must_use]
pub fn cell(row: &[Cell], index: usize) -> Cell {
    row.get(index).cloned().unwrap_or(Cell::Empty)
}

/// Result of a bulk import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub existing: Vec<String>,
    pub invalid: Vec<String>,
}

impl ImportSummary {
    /// Render the outcome for `things` (e.g. "genres").
    ///
    /// Returns `Ok(notice)` when anything was imported, `Err(alert)` otherwise.
    pub fn message(&self, things: &str) -> Result<String, String> {
        if self.imported == 0 {
            return Err(format!("Failed to import any {things}"));
        }

        let mut notice = format!("Successfully imported {} {things}", self.imported);
        if !self.existing.is_empty() {
            notice.push_str(&format!(
                ". The following {things} already exist: {}",
                self.existing.join(", ")
            ));
        }
        if !self.invalid.is_empty() {
            notice.push_str(&format!(
                ". The following values are not valid {things}: {}",
                self.invalid.join(", ")
            ));
        }
        Ok(notice)
    }
}

/// A finished export.
#[derive(Debug, Clone)]
pub struct Export {
    pub filename: &'static str,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl Export {
    /// Single-sheet workbook download.
    pub fn sheet(
        filename: &'static str,
        sheet_name: &str,
        header: &[&str],
        rows: &[Vec<String>],
    ) -> AppResult<Self> {
        Ok(Self {
            filename,
            content_type: XLSX_MIME,
            bytes: write_sheet(sheet_name, header, rows)?,
        })
    }
}

/// Write a single-sheet workbook with a bold header row.
pub fn write_sheet(
    sheet_name: &str,
    header: &[&str],
    rows: &[Vec<String>],
) -> AppResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name).map_err(xlsx_error)?;

    for (col, label) in header.iter().enumerate() {
        worksheet
            .write_string_with_format(0, column(col)?, *label, &header_format)
            .map_err(xlsx_error)?;
    }

    for (r, values) in rows.iter().enumerate() {
        let row = u32::try_from(r + 1).map_err(|_| AppError::Internal("Too many rows".to_string()))?;
        for (col, value) in values.iter().enumerate() {
            worksheet
                .write_string(row, column(col)?, value)
                .map_err(xlsx_error)?;
        }
    }

    workbook.save_to_buffer().map_err(xlsx_error)
}

fn column(index: usize) -> AppResult<u16> {
    u16::try_from(index).map_err(|_| AppError::Internal("Too many columns".to_string()))
}

fn xlsx_error(e: rust_xlsxwriter::XlsxError) -> AppError {
    AppError::Internal(format!("Failed to write spreadsheet: {e}"))
}
