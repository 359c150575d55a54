//! A depth-first complete search over the constrained board, used when the
//! caller asks for neither ant system.
//!
//! Each stack item owns a board and a pivot cell; candidate values are
//! tried smallest first, with full constraint propagation after every
//! assignment.  Propagation does most of the work, so the stack stays
//! shallow on ordinary puzzles.

use crate::core::{Board, ValueSet};
use crate::propagate::{set_cell_and_propagate, CpStats};
use crate::solve::Engine;
use std::time::{Duration, Instant};

struct StackItem {
  board: Board,

  /// An unfixed cell we'll try all remaining candidates of.
  pivot: usize,

  /// The candidates not yet tried at the pivot.
  untried: ValueSet,
}

pub struct BacktrackSearch {
  solution: Option<Board>,
  total_pivots: usize,
  sol_secs: f32,
}

impl BacktrackSearch {
  pub fn new() -> Self {
    BacktrackSearch {
      solution: None,
      total_pivots: 0,
      sol_secs: 0.0,
    }
  }

  /// Chooses the unfixed, non-empty cell with the fewest candidates.
  fn choose_pivot(board: &Board) -> Option<usize> {
    let mut best = None;
    let mut best_len = usize::MAX;
    for cell in 0..board.cell_count() {
      let set = board.cell(cell);
      if !set.is_fixed() && !set.is_empty() && set.len() < best_len {
        best_len = set.len();
        best = Some(cell);
      }
    }
    best
  }

  /// Pushes a pivot for `board` onto the stack; false when every cell is
  /// already fixed.
  fn pivot(stack: &mut Vec<StackItem>, board: &Board) -> bool {
    let Some(pivot) = Self::choose_pivot(board) else {
      return false;
    };
    stack.push(StackItem {
      untried: board.cell(pivot),
      board: board.clone(),
      pivot,
    });
    true
  }
}

impl Default for BacktrackSearch {
  fn default() -> Self {
    Self::new()
  }
}

impl Engine for BacktrackSearch {
  fn run(&mut self, puzzle: &Board, budget: Duration, stats: &CpStats) -> bool {
    let timer = Instant::now();
    self.solution = None;

    if puzzle.infeasible_cells() == 0 && puzzle.fixed_cells() == puzzle.cell_count() {
      self.solution = Some(puzzle.clone());
      self.sol_secs = timer.elapsed().as_secs_f32();
      return true;
    }

    let mut stack = Vec::with_capacity(16);
    if puzzle.infeasible_cells() == 0 {
      Self::pivot(&mut stack, puzzle);
    }

    while let Some(item) = stack.last_mut() {
      self.total_pivots += 1;
      let Some(value) = item.untried.smallest() else {
        stack.pop();
        continue;
      };
      item.untried -= value;

      let mut board = item.board.clone();
      let pivot = item.pivot;
      set_cell_and_propagate(&mut board, pivot, value, stats);
      if board.infeasible_cells() == 0 {
        if board.fixed_cells() == board.cell_count() {
          self.solution = Some(board);
          self.sol_secs = timer.elapsed().as_secs_f32();
          return true;
        }
        Self::pivot(&mut stack, &board);
      }

      if self.total_pivots % 1024 == 0 && timer.elapsed() > budget {
        break;
      }
    }

    self.sol_secs = timer.elapsed().as_secs_f32();
    false
  }

  fn solution(&self) -> Option<&Board> {
    self.solution.as_ref()
  }

  fn solution_secs(&self) -> f32 {
    self.sol_secs
  }

  fn iterations(&self) -> usize {
    self.total_pivots
  }
}
