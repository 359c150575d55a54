//! The constraint-propagation rules that shrink the search space before and
//! during solution construction.
//!
//! Two rules operate on one target cell at a time.  Rule 1 (elimination)
//! removes the values already fixed among the cell's peers.  Rule 2 (hidden
//! single) fixes a value that fits nowhere else in one of the cell's units.
//! Committing a cell re-propagates every peer; the recursion terminates
//! because each commit strictly reduces the grid's total candidate count.

use crate::core::{Board, ValueSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Instant;

/// Telemetry for the propagation engine: separate wall-clock accumulators
/// for the initial pass and for propagation driven from ant construction,
/// plus a commit counter.
///
/// The accumulators are atomic so a handle may be shared across solver
/// instances running on different threads; the phase flag is per-handle, so
/// solves sharing a handle should not overlap an initial pass.
#[derive(Debug, Default)]
pub struct CpStats {
  initial_secs: AtomicU32,
  construct_secs: AtomicU32,
  commits: AtomicU32,
  in_initial: AtomicBool,
}

/// Adds to an f32 accumulator stored as its bit pattern.
fn add_f32(cell: &AtomicU32, add: f32) {
  let mut seen = cell.load(Ordering::Relaxed);
  loop {
    let next = (f32::from_bits(seen) + add).to_bits();
    match cell.compare_exchange_weak(seen, next, Ordering::Relaxed, Ordering::Relaxed) {
      Ok(_) => return,
      Err(now) => seen = now,
    }
  }
}

impl CpStats {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn reset(&self) {
    self.initial_secs.store(0, Ordering::Relaxed);
    self.construct_secs.store(0, Ordering::Relaxed);
    self.commits.store(0, Ordering::Relaxed);
    self.in_initial.store(false, Ordering::Relaxed);
  }

  /// Marks the start of the initial saturation pass; rule timings go to the
  /// initial accumulator until `end_initial`.
  pub fn begin_initial(&self) {
    self.in_initial.store(true, Ordering::Relaxed);
  }

  pub fn end_initial(&self) {
    self.in_initial.store(false, Ordering::Relaxed);
  }

  /// Seconds spent in the rules during initial saturation.
  pub fn initial_secs(&self) -> f32 {
    f32::from_bits(self.initial_secs.load(Ordering::Relaxed))
  }

  /// Seconds spent in the rules during ant construction.
  pub fn construct_secs(&self) -> f32 {
    f32::from_bits(self.construct_secs.load(Ordering::Relaxed))
  }

  /// Commits performed outside the initial pass.
  pub fn commits(&self) -> u32 {
    self.commits.load(Ordering::Relaxed)
  }

  fn add_elapsed(&self, start: Instant) {
    let secs = start.elapsed().as_secs_f32();
    if self.in_initial.load(Ordering::Relaxed) {
      add_f32(&self.initial_secs, secs);
    } else {
      add_f32(&self.construct_secs, secs);
    }
  }

  fn note_commit(&self) {
    if !self.in_initial.load(Ordering::Relaxed) {
      self.commits.fetch_add(1, Ordering::Relaxed);
    }
  }
}

/// Rule 1: removes the values fixed among the cell's peers.  Returns true
/// when this committed the cell (exactly one candidate remained).
pub fn rule1_elimination(board: &mut Board, cell: usize, stats: &CpStats) -> bool {
  let start = Instant::now();
  let current = board.cell(cell);
  if current.is_empty() || current.is_fixed() {
    stats.add_elapsed(start);
    return false;
  }

  let g = board.geometry();
  let n = board.units();
  let (row, col, bx) = (g.row_of(cell), g.col_of(cell), g.box_of(cell));

  let mut fixed = ValueSet::empty(n);
  for j in 0..n {
    for peer in [g.box_cell(bx, j), g.col_cell(col, j), g.row_cell(row, j)] {
      if peer != cell && board.cell(peer).is_fixed() {
        fixed |= board.cell(peer);
      }
    }
  }

  let remaining = current - fixed;
  stats.add_elapsed(start);

  if remaining.is_fixed() {
    set_cell_and_propagate(board, cell, remaining, stats);
    return true;
  }
  board.set_cell_direct(cell, remaining);
  false
}

/// Rule 2: fixes the cell when one of its values fits nowhere else in a
/// unit.  Units are tried row, column, box; the first success wins.
pub fn rule2_hidden_single(board: &mut Board, cell: usize, stats: &CpStats) -> bool {
  let start = Instant::now();
  let current = board.cell(cell);
  if current.is_empty() || current.is_fixed() {
    stats.add_elapsed(start);
    return false;
  }

  let g = board.geometry();
  let n = board.units();
  let (row, col, bx) = (g.row_of(cell), g.col_of(cell), g.box_of(cell));

  let mut row_all = ValueSet::empty(n);
  let mut col_all = ValueSet::empty(n);
  let mut box_all = ValueSet::empty(n);
  for j in 0..n {
    let peer = g.row_cell(row, j);
    if peer != cell {
      row_all |= board.cell(peer);
    }
    let peer = g.col_cell(col, j);
    if peer != cell {
      col_all |= board.cell(peer);
    }
    let peer = g.box_cell(bx, j);
    if peer != cell {
      box_all |= board.cell(peer);
    }
  }
  stats.add_elapsed(start);

  for unit_all in [row_all, col_all, box_all] {
    let only_here = current - unit_all;
    if only_here.is_fixed() {
      set_cell_and_propagate(board, cell, only_here, stats);
      return true;
    }
  }
  false
}

/// Runs the rules against one cell.  A cell that ends up with no candidates
/// is counted infeasible; the search carries on around it.
pub fn propagate_constraints(board: &mut Board, cell: usize, stats: &CpStats) {
  let current = board.cell(cell);
  if current.is_empty() || current.is_fixed() {
    return;
  }
  if rule1_elimination(board, cell, stats) {
    return;
  }
  rule2_hidden_single(board, cell, stats);
  if board.cell(cell).is_empty() {
    board.increment_infeasible();
  }
}

/// Commits a cell to the given (fixed) set and re-propagates all of its
/// peers.  Does nothing if the cell is already fixed.
pub fn set_cell_and_propagate(board: &mut Board, cell: usize, value: ValueSet, stats: &CpStats) {
  if board.cell(cell).is_fixed() {
    return;
  }
  board.set_cell_direct(cell, value);
  board.increment_fixed();
  stats.note_commit();

  let g = board.geometry();
  let n = board.units();
  let (row, col, bx) = (g.row_of(cell), g.col_of(cell), g.box_of(cell));
  for j in 0..n {
    for peer in [g.box_cell(bx, j), g.col_cell(col, j), g.row_cell(row, j)] {
      if peer != cell {
        propagate_constraints(board, peer, stats);
      }
    }
  }
}

/// Propagates every cell, repeating full passes until one changes nothing.
/// This is the initial reduction a freshly parsed board goes through;
/// callers bracket it with `CpStats::begin_initial`/`end_initial`.
pub fn saturate(board: &mut Board, stats: &CpStats) {
  loop {
    let before = (
      board.fixed_cells(),
      board.infeasible_cells(),
      board.total_candidates(),
    );
    for cell in 0..board.cell_count() {
      propagate_constraints(board, cell, stats);
    }
    let after = (
      board.fixed_cells(),
      board.infeasible_cells(),
      board.total_candidates(),
    );
    if after == before {
      return;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::Geometry;

  fn saturated(line: &str) -> (Board, CpStats) {
    let mut board = Board::from_line(line).unwrap();
    let stats = CpStats::new();
    stats.begin_initial();
    saturate(&mut board, &stats);
    stats.end_initial();
    (board, stats)
  }

  /// No fixed cell may share its value with a fixed peer.
  fn assert_sound(board: &Board) {
    let g = board.geometry();
    let n = board.units();
    for cell in 0..board.cell_count() {
      let Some(v) = board.cell(cell).fixed_value() else {
        continue;
      };
      let (row, col, bx) = (g.row_of(cell), g.col_of(cell), g.box_of(cell));
      for j in 0..n {
        for peer in [g.row_cell(row, j), g.col_cell(col, j), g.box_cell(bx, j)] {
          if peer != cell {
            assert_ne!(board.cell(peer).fixed_value(), Some(v));
          }
        }
      }
    }
  }

  #[test]
  fn elimination_commits_last_candidate() {
    // Row 0 fixes 1..8; cell 8 must become 9.
    let line = format!("12345678.{}", ".".repeat(72));
    let (board, _) = saturated(&line);
    assert_eq!(board.cell(8).fixed_value(), Some(9));
    assert_sound(&board);
  }

  #[test]
  fn hidden_single_commits() {
    // A 5 somewhere in every row and column except row 0, column 0, and
    // box 0: cell 0 is then the only place for 5 in its row, even though
    // it keeps all nine candidates of its own.
    let mut line = vec!['.'; 81];
    let rows = [3, 6, 1, 4, 7, 2, 5, 8];
    for (i, col) in (1..9).enumerate() {
      line[9 * rows[i] + col] = '5';
    }
    let line: String = line.into_iter().collect();
    let (board, _) = saturated(&line);
    assert_eq!(board.cell(0).fixed_value(), Some(5));
    assert_sound(&board);
  }

  #[test]
  fn saturation_restores_blanked_cells() {
    let solved =
      "123456789456789123789123456234567891567891234891234567345678912678912345912345678";
    let mut blanked: Vec<char> = solved.chars().collect();
    for cell in [0, 20, 40, 60, 80] {
      blanked[cell] = '.';
    }
    let line: String = blanked.into_iter().collect();
    let (board, stats) = saturated(&line);
    assert_sound(&board);
    assert_eq!(board.fixed_cells(), 81);
    assert!(board.same_assignments(&Board::from_line(solved).unwrap()));
    assert_eq!(board.infeasible_cells(), 0);
    // Commits during the initial pass are not counted as construction work.
    assert_eq!(stats.commits(), 0);
    assert!(stats.initial_secs() >= 0.0);
  }

  #[test]
  fn saturation_is_idempotent() {
    let line = ".1..5..8.4.89.62.1..6...7....5.3.9.....8.7.....1.4.3....4...1..2.93.16.7.7..6..2.";
    let (mut board, stats) = saturated(line);
    let fixed = board.fixed_cells();
    let candidates = board.total_candidates();
    saturate(&mut board, &stats);
    assert_eq!(board.fixed_cells(), fixed);
    assert_eq!(board.total_candidates(), candidates);
  }

  #[test]
  fn contradiction_goes_infeasible() {
    let line = format!("11{}", ".".repeat(79));
    let (board, _) = saturated(&line);
    assert!(board.infeasible_cells() > 0);
  }

  #[test]
  fn commit_counter_runs_outside_initial_phase() {
    let mut board = Board::from_line(&".".repeat(81)).unwrap();
    let stats = CpStats::new();
    set_cell_and_propagate(&mut board, 0, ValueSet::of(9, 1), &stats);
    assert_eq!(stats.commits(), 1);
    assert_eq!(board.fixed_cells(), 1);
    assert!(stats.construct_secs() >= 0.0);
    assert_eq!(stats.initial_secs(), 0.0);
  }

  #[test]
  fn works_on_rectangular_boards() {
    let line = format!("12345.{}", ".".repeat(30));
    let (board, _) = saturated(&line);
    assert_eq!(board.geometry(), Geometry::for_units(6).unwrap());
    assert_eq!(board.cell(5).fixed_value(), Some(6));
    assert_sound(&board);
  }
}
