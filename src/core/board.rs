//! Defines the Board type: a grid of candidate sets, with the counters the
//! solvers steer by.

use super::geom::Geometry;
use super::value_set::ValueSet;
use std::fmt;

/// Errors raised while parsing a one-line puzzle string.
#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum ParseError {
  #[error("{0} cells does not match any supported board size")]
  BadLength(usize),
  #[error("unrecognized character {ch:?} at cell {cell}")]
  BadChar { ch: char, cell: usize },
}

/// A Sudoku board: one ValueSet per cell, in row-major order, plus running
/// counts of the fixed (single-candidate) and infeasible (no-candidate)
/// cells.
///
/// A freshly parsed board carries the givens as fixed cells and every other
/// cell as the full candidate set; constraint propagation then narrows it.
#[derive(Clone)]
pub struct Board {
  geom: Geometry,
  cells: Vec<ValueSet>,
  num_fixed: usize,
  num_infeasible: usize,
}

impl Board {
  /// Parses a one-line puzzle: one character per cell, `.` for a blank,
  /// otherwise a character of the geometry's alphabet.  The board size is
  /// inferred from the string length.
  pub fn from_line(s: &str) -> Result<Board, ParseError> {
    let chars: Vec<char> = s.chars().collect();
    let geom =
      Geometry::from_cell_count(chars.len()).ok_or(ParseError::BadLength(chars.len()))?;
    let alphabet = geom.alphabet();
    let mut cells = Vec::with_capacity(geom.cells());
    let mut num_fixed = 0;
    for (i, &ch) in chars.iter().enumerate() {
      if ch == '.' {
        cells.push(ValueSet::full(geom.units()));
      } else {
        let pos = alphabet
          .find(ch)
          .ok_or(ParseError::BadChar { ch, cell: i })?;
        cells.push(ValueSet::of(geom.units(), pos + 1));
        num_fixed += 1;
      }
    }
    Ok(Board {
      geom,
      cells,
      num_fixed,
      num_infeasible: 0,
    })
  }

  pub fn geometry(&self) -> Geometry {
    self.geom
  }

  /// The unit size N.
  pub fn units(&self) -> usize {
    self.geom.units()
  }

  /// The number of cells, N².
  pub fn cell_count(&self) -> usize {
    self.cells.len()
  }

  pub fn cell(&self, i: usize) -> ValueSet {
    self.cells[i]
  }

  /// Stores a cell without touching the counters.  The propagation engine
  /// maintains the counts through `increment_fixed`/`increment_infeasible`.
  pub fn set_cell_direct(&mut self, i: usize, set: ValueSet) {
    self.cells[i] = set;
  }

  pub fn increment_fixed(&mut self) {
    self.num_fixed += 1;
  }

  pub fn increment_infeasible(&mut self) {
    self.num_infeasible += 1;
  }

  /// How many cells hold exactly one candidate.
  pub fn fixed_cells(&self) -> usize {
    self.num_fixed
  }

  /// How many cells hold no candidates at all.
  pub fn infeasible_cells(&self) -> usize {
    self.num_infeasible
  }

  /// The total candidate count across the grid.  Commits only ever shrink
  /// this, which is what bounds the propagation recursion.
  pub fn total_candidates(&self) -> usize {
    self.cells.iter().map(|c| c.len()).sum()
  }

  /// Verifies that `other` is a valid completion of this board: every cell
  /// fixed, every row/column/box a permutation of `{1..=N}`, and every cell
  /// fixed here keeping its value there.
  pub fn check_solution(&self, other: &Board) -> bool {
    if other.cell_count() != self.cell_count() {
      return false;
    }
    if !other.cells.iter().all(|c| c.is_fixed()) {
      return false;
    }
    let n = self.units();
    for i in 0..n {
      let mut row = ValueSet::empty(n);
      let mut col = ValueSet::empty(n);
      let mut bx = ValueSet::empty(n);
      for j in 0..n {
        row |= other.cell(self.geom.row_cell(i, j));
        col |= other.cell(self.geom.col_cell(i, j));
        bx |= other.cell(self.geom.box_cell(i, j));
      }
      if row.len() != n || col.len() != n || bx.len() != n {
        return false;
      }
    }
    for i in 0..self.cell_count() {
      if let Some(v) = self.cell(i).fixed_value() {
        if other.cell(i).fixed_value() != Some(v) {
          return false;
        }
      }
    }
    true
  }

  /// Tells whether both boards fix exactly the same cells to the same
  /// values.  Candidate sets of unfixed cells are not compared.
  pub fn same_assignments(&self, other: &Board) -> bool {
    self.cell_count() == other.cell_count()
      && (0..self.cell_count()).all(|i| self.cell(i).fixed_value() == other.cell(i).fixed_value())
  }

  /// A hashable rendering of the fixed-cell pattern: the value index per
  /// cell, or -1 where unfixed.
  pub fn assignment_key(&self) -> Vec<i16> {
    self
      .cells
      .iter()
      .map(|c| c.fixed_value().map_or(-1, |v| v as i16 - 1))
      .collect()
  }

  /// One-line rendering: alphabet characters for fixed cells, `.` elsewhere.
  pub fn to_line(&self) -> String {
    let alphabet = self.geom.alphabet().as_bytes();
    self
      .cells
      .iter()
      .map(|c| match c.fixed_value() {
        Some(v) => alphabet[v - 1] as char,
        None => '.',
      })
      .collect()
  }

  /// Human-readable grid, with `|` between boxes and rule lines between box
  /// bands.  With `use_numbers`, fixed cells print as decimal values; with
  /// `show_unfixed`, unfixed cells print their candidate sets (this forces
  /// character rendering for readability).
  pub fn pretty(&self, use_numbers: bool, show_unfixed: bool) -> String {
    let use_numbers = use_numbers && !show_unfixed;
    let g = self.geom;
    let alphabet = g.alphabet();
    let cell_strings: Vec<String> = self
      .cells
      .iter()
      .map(|&c| {
        if use_numbers {
          c.fixed_value().map_or_else(|| ".".to_owned(), |v| v.to_string())
        } else if !show_unfixed && !c.is_fixed() {
          ".".to_owned()
        } else {
          c.render(alphabet)
        }
      })
      .collect();
    let pitch = cell_strings.iter().map(String::len).max().unwrap_or(1) + 1;
    let n = g.units();
    let last = self.cell_count() - 1;
    let mut out = String::new();
    for (i, s) in cell_strings.iter().enumerate() {
      out.push_str(&format!("{:>pitch$} ", s));
      if i % n == n - 1 {
        if i != last {
          out.push('\n');
        }
      } else if i % g.box_cols() == g.box_cols() - 1 {
        out.push('|');
      }
      if i % (n * g.box_rows()) == n * g.box_rows() - 1 && i != last {
        let segment = "-".repeat(g.box_cols() * (pitch + 1));
        out.push_str(&vec![segment; g.boxes_per_row()].join("+"));
        out.push('\n');
      }
    }
    out
  }
}

impl fmt::Display for Board {
  /// Prints the board in its one-line form.
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.to_line())
  }
}

impl fmt::Debug for Board {
  /// Prints the board as an ASCII grid.
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.pretty(false, false))
  }
}
