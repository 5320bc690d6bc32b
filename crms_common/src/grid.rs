//! Rectangular 2-D string grids exchanged with the gateway.
//!
//! Retrieval responses embed headers in the grid: row 0 holds the column
//! labels, column 0 holds the row labels and the corner cell is empty. Store
//! commands carry a bare data body without headers. `ValueGrid` only enforces
//! the rectangular shape; what the cells mean is decided by the command axes.
use std::fmt::{Display, Formatter};

use bincode::de::{BorrowDecode, BorrowDecoder, Decode, Decoder};
use bincode::error::DecodeError;
use bincode::Encode;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::result::Result;

/// Rectangular grid of string cells stored row by row.
///
/// Every decoding path (serde and bincode) goes through [`ValueGrid::from_rows`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Encode, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<String>>", into = "Vec<Vec<String>>")]
pub struct ValueGrid {
    cells: Vec<Vec<String>>,
}

impl ValueGrid {
    /// Empty grid with no rows and no columns.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a grid from rows, rejecting ragged input.
    pub fn from_rows(rows: Vec<Vec<String>>) -> Result<Self> {
        if let Some(first) = rows.first() {
            let width = first.len();
            if let Some((index, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
                return Err(GatewayError::InvalidGrid(format!(
                    "row {} has {} cells, expected {}",
                    index,
                    row.len(),
                    width
                )));
            }
        }
        Ok(Self { cells: rows })
    }

    /// Convenience constructor from string slices, mostly for tests and fixtures.
    pub fn from_str_rows<R, S>(rows: R) -> Result<Self>
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rows: Vec<Vec<String>> = rows
            .into_iter()
            .map(|row| row.into_iter().map(Into::into).collect())
            .collect();
        Self::from_rows(rows)
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    /// Number of columns (zero for an empty grid).
    pub fn columns(&self) -> usize {
        self.cells.first().map(Vec::len).unwrap_or(0)
    }

    /// `(rows, columns)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows(), self.columns())
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> usize {
        self.cells.iter().map(Vec::len).sum()
    }

    /// `true` when the grid holds no cells at all.
    pub fn is_empty(&self) -> bool {
        self.cell_count() == 0
    }

    /// Cell at `(row, col)`, if present.
    pub fn get(&self, row: usize, col: usize) -> Option<&str> {
        self.cells
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
    }

    /// Row `index` as a slice, if present.
    pub fn row(&self, index: usize) -> Option<&[String]> {
        self.cells.get(index).map(Vec::as_slice)
    }

    /// Iterate over rows.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[String]> {
        self.cells.iter().map(Vec::as_slice)
    }

    /// Column labels of a header-annotated grid: row 0 without the corner cell.
    pub fn column_headers(&self) -> Vec<&str> {
        self.row(0)
            .map(|r| r.iter().skip(1).map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Row labels of a header-annotated grid: column 0 without the corner cell.
    pub fn row_headers(&self) -> Vec<&str> {
        self.cells
            .iter()
            .skip(1)
            .filter_map(|r| r.first().map(String::as_str))
            .collect()
    }

    /// Shape of the data body of a header-annotated grid.
    pub fn body_shape(&self) -> (usize, usize) {
        (
            self.rows().saturating_sub(1),
            self.columns().saturating_sub(1),
        )
    }

    /// Look up a body cell of a header-annotated grid by its row and column labels.
    pub fn lookup(&self, row_header: &str, column_header: &str) -> Option<&str> {
        let col = self
            .row(0)?
            .iter()
            .skip(1)
            .position(|h| h == column_header)?
            + 1;
        let row = self
            .cells
            .iter()
            .skip(1)
            .position(|r| r.first().map(String::as_str) == Some(row_header))?
            + 1;
        self.get(row, col)
    }

    /// Consume the grid and return its rows.
    pub fn into_rows(self) -> Vec<Vec<String>> {
        self.cells
    }
}

impl TryFrom<Vec<Vec<String>>> for ValueGrid {
    type Error = GatewayError;

    fn try_from(rows: Vec<Vec<String>>) -> Result<Self> {
        Self::from_rows(rows)
    }
}

impl From<ValueGrid> for Vec<Vec<String>> {
    fn from(grid: ValueGrid) -> Self {
        grid.cells
    }
}

impl<Context> Decode<Context> for ValueGrid {
    fn decode<D: Decoder<Context = Context>>(decoder: &mut D) -> std::result::Result<Self, DecodeError> {
        let rows: Vec<Vec<String>> = Decode::decode(decoder)?;
        Self::from_rows(rows).map_err(|e| DecodeError::OtherString(e.to_string()))
    }
}

impl<'de, Context> BorrowDecode<'de, Context> for ValueGrid {
    fn borrow_decode<D: BorrowDecoder<'de, Context = Context>>(
        decoder: &mut D,
    ) -> std::result::Result<Self, DecodeError> {
        let rows: Vec<Vec<String>> = BorrowDecode::borrow_decode(decoder)?;
        Self::from_rows(rows).map_err(|e| DecodeError::OtherString(e.to_string()))
    }
}

impl Display for ValueGrid {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut widths = vec![0usize; self.columns()];
        for row in &self.cells {
            for (col, cell) in row.iter().enumerate() {
                if let Some(width) = widths.get_mut(col) {
                    *width = (*width).max(cell.chars().count());
                }
            }
        }

        for row in &self.cells {
            let line: Vec<String> = row
                .iter()
                .enumerate()
                .map(|(col, cell)| {
                    let width = widths.get(col).copied().unwrap_or(0);
                    format!("{:<width$}", cell, width = width)
                })
                .collect();
            writeln!(f, "{}", line.join(" | ").trim_end())?;
        }
        Ok(())
    }
}
