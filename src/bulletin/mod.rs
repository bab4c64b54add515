//! Locating the trade table inside a downloaded bulletin.
//!
//! A bulletin is a semi-structured .xls sheet: some variable number of
//! preamble rows, then a marker row ("Единица измерения: Метрическая тонна"),
//! then the column headers, then the data block. The locator loads the sheet
//! as a headerless cell grid, finds the marker, and exposes the data block
//! through a named-column table view.

use std::path::{Path, PathBuf};

use calamine::{open_workbook, DataType, Reader, Xls};
use thiserror::Error;

/// Exact marker text that demarcates the start of the metric-ton table.
pub const MARKER_TEXT: &str = "Единица измерения: Метрическая тонна";

/// Errors raised while loading and locating the bulletin table.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("bulletin file not found: {0}")]
    FileMissing(PathBuf),
    #[error("failed to read spreadsheet: {0}")]
    Workbook(#[from] calamine::XlsError),
    #[error("spreadsheet has no worksheets")]
    NoWorksheet,
    #[error("marker row '{MARKER_TEXT}' not found")]
    MarkerNotFound,
    #[error("column header not found: {0:?}")]
    MissingColumn(&'static str),
}

/// A single spreadsheet cell, decoupled from the file-format reader so the
/// locator and normalizer stay testable on plain grids.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Numeric view of the cell. Textual digits are parsed; anything
    /// unparsable is treated as missing, mirroring a lenient coercion.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => s.trim().parse().ok(),
            Cell::Empty => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }
}

impl From<&DataType> for Cell {
    fn from(value: &DataType) -> Self {
        match value {
            DataType::Int(i) => Cell::Number(*i as f64),
            DataType::Float(f) => Cell::Number(*f),
            DataType::DateTime(f) => Cell::Number(*f),
            DataType::String(s) => Cell::Text(s.clone()),
            DataType::Bool(b) => Cell::Text(b.to_string()),
            _ => Cell::Empty,
        }
    }
}

/// The columns of the trade table, addressed by their fixed Russian headers.
/// Header drift is a single point of change here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum Column {
    InstrumentCode,
    InstrumentName,
    DeliveryBasis,
    Volume,
    Total,
    ContractCount,
}

impl Column {
    pub const ALL: [Column; 6] = [
        Column::InstrumentCode,
        Column::InstrumentName,
        Column::DeliveryBasis,
        Column::Volume,
        Column::Total,
        Column::ContractCount,
    ];

    /// Header text as it appears in the bulletin, embedded line breaks
    /// included. "Обьем" is the exchange's own spelling, not a typo here.
    pub fn header(self) -> &'static str {
        match self {
            Column::InstrumentCode => "Код\nИнструмента",
            Column::InstrumentName => "Наименование\nИнструмента",
            Column::DeliveryBasis => "Базис\nпоставки",
            Column::Volume => "Объем\nДоговоров\nв единицах\nизмерения",
            Column::Total => "Обьем\nДоговоров,\nруб.",
            Column::ContractCount => "Количество\nДоговоров,\nшт.",
        }
    }
}

/// Typed view over the data block: rows after the header row, addressed by
/// [`Column`].
#[derive(Debug, Clone)]
pub struct TableView {
    indices: [usize; 6],
    rows: Vec<Vec<Cell>>,
}

impl TableView {
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn cell<'a>(&self, row: &'a [Cell], column: Column) -> &'a Cell {
        row.get(self.indices[column as usize]).unwrap_or(&Cell::Empty)
    }
}

/// Scans the grid row-major, column-minor for the first cell exactly equal
/// to [`MARKER_TEXT`] and returns its row index. First match wins; scanning
/// stops immediately.
pub fn locate_marker(grid: &[Vec<Cell>]) -> Result<usize, ExtractError> {
    for (row_idx, row) in grid.iter().enumerate() {
        for cell in row {
            if cell.as_str() == Some(MARKER_TEXT) {
                return Ok(row_idx);
            }
        }
    }
    Err(ExtractError::MarkerNotFound)
}

/// Builds the table view treating `row_start + 1` as the header row and
/// everything below it as data.
pub fn table_at(grid: &[Vec<Cell>], row_start: usize) -> Result<TableView, ExtractError> {
    let header_row = grid
        .get(row_start + 1)
        .ok_or(ExtractError::MarkerNotFound)?;

    let mut indices = [0usize; 6];
    for column in Column::ALL {
        let idx = header_row
            .iter()
            .position(|cell| cell.as_str() == Some(column.header()))
            .ok_or(ExtractError::MissingColumn(column.header()))?;
        indices[column as usize] = idx;
    }

    let rows = grid
        .get(row_start + 2..)
        .unwrap_or_default()
        .to_vec();

    Ok(TableView { indices, rows })
}

/// Loads the first worksheet of the bulletin at `path` as a headerless grid.
pub fn load_grid(path: &Path) -> Result<Vec<Vec<Cell>>, ExtractError> {
    if !path.exists() {
        return Err(ExtractError::FileMissing(path.to_path_buf()));
    }

    let mut workbook: Xls<_> = open_workbook(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ExtractError::NoWorksheet)??;

    Ok(range
        .rows()
        .map(|row| row.iter().map(Cell::from).collect())
        .collect())
}

/// Full locate pipeline: load the grid, find the marker, build the view.
pub fn locate(path: &Path) -> Result<TableView, ExtractError> {
    let grid = load_grid(path)?;
    let row_start = locate_marker(&grid)?;
    table_at(&grid, row_start)
}
