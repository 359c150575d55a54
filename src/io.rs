//! Reads puzzle files: whitespace-separated integers, one per cell after a
//! two-integer header, with `-1` marking a blank cell.
//!
//! The first header integer is either the board's order (unit size order²)
//! or its size (the unit size itself); whichever makes the remaining
//! integer count consistent wins.  The second header integer is ignored.

use crate::core::Geometry;
use std::fs;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum PuzzleFileError {
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
  #[error("expected an integer, got {0:?}")]
  BadInt(String),
  #[error("file too short: a header of two integers is required")]
  MissingHeader,
  #[error("header {header} does not fit {count} cell values")]
  HeaderMismatch { header: i64, count: usize },
  #[error("cell value {0} out of range for a board of size {1}")]
  BadValue(i64, usize),
}

/// Parses puzzle-file text into the one-line puzzle string the solvers
/// take.
pub fn parse_puzzle_text(text: &str) -> Result<String, PuzzleFileError> {
  let values = text
    .split_whitespace()
    .map(|token| {
      token
        .parse::<i64>()
        .map_err(|_| PuzzleFileError::BadInt(token.to_owned()))
    })
    .collect::<Result<Vec<i64>, _>>()?;
  if values.len() < 2 {
    return Err(PuzzleFileError::MissingHeader);
  }

  let header = values[0];
  let cells = &values[2..];
  let geom = geometry_for_header(header, cells.len()).ok_or(PuzzleFileError::HeaderMismatch {
    header,
    count: cells.len(),
  })?;

  let units = geom.units();
  let alphabet = geom.alphabet().as_bytes();
  let mut line = String::with_capacity(cells.len());
  for &v in cells {
    if v == -1 {
      line.push('.');
    } else if v >= 1 && v <= units as i64 {
      line.push(alphabet[v as usize - 1] as char);
    } else {
      return Err(PuzzleFileError::BadValue(v, units));
    }
  }
  Ok(line)
}

/// Reads and parses a puzzle file.
pub fn read_puzzle_file<P: AsRef<Path>>(path: P) -> Result<String, PuzzleFileError> {
  parse_puzzle_text(&fs::read_to_string(path)?)
}

/// Resolves the header against the cell count: an order `k` means `k⁴`
/// cells, a size `n` means `n²`.  The order reading is tried first.
fn geometry_for_header(header: i64, count: usize) -> Option<Geometry> {
  if header < 2 {
    return None;
  }
  let header = header as usize;
  if header.pow(4) == count {
    if let Some(geom) = Geometry::for_units(header * header) {
      return Some(geom);
    }
  }
  if header * header == count {
    return Geometry::for_units(header);
  }
  None
}
