//! Defines the Ant type: the per-colony stochastic constructor that walks
//! the board cell by cell, committing one candidate value at a time.

use super::colony::{ColonyKind, PheromoneMatrix};
use crate::core::{Board, ValueSet};
use crate::propagate::{set_cell_and_propagate, CpStats};
use crate::random::{Rng, SolverRng};

/// Everything an ant consults while stepping: its colony's matrix and
/// parameters, the driver's RNG, and the propagation telemetry.  Ants hold
/// no reference to their colony; the driver passes this in per step.
pub struct StepContext<'a> {
  pub kind: ColonyKind,
  pub q0: f32,
  pub tau0: f32,
  pub pher: &'a mut PheromoneMatrix,
  pub rng: &'a mut SolverRng,
  pub stats: &'a CpStats,
}

/// One ant: an owned working board, a cursor, and the roulette scratch.
pub struct Ant {
  sol: Board,
  cursor: usize,
  fail_count: usize,
  roulette: Vec<f32>,
  roulette_vals: Vec<ValueSet>,
}

impl Ant {
  pub fn new(puzzle: &Board) -> Ant {
    Ant {
      sol: puzzle.clone(),
      cursor: 0,
      fail_count: 0,
      roulette: vec![0.0; puzzle.units()],
      roulette_vals: vec![ValueSet::empty(puzzle.units()); puzzle.units()],
    }
  }

  /// Starts a fresh construction pass from `start_cell`.
  pub fn init(&mut self, puzzle: &Board, start_cell: usize) {
    self.sol.clone_from(puzzle);
    self.cursor = start_cell;
    self.fail_count = 0;
  }

  /// Advances one cell: an empty cell counts as a failure; an unfixed cell
  /// gets a value committed (greedy with probability `q0`, roulette
  /// otherwise) followed by the ACS local update; a fixed cell is left
  /// alone.
  pub fn step(&mut self, ctx: &mut StepContext) {
    let cell = self.sol.cell(self.cursor);
    if cell.is_empty() {
      self.fail_count += 1;
    } else if !cell.is_fixed() {
      let chosen = if ctx.rng.random::<f32>() < ctx.q0 {
        self.greedy_choice(ctx)
      } else {
        self.roulette_choice(ctx)
      };
      set_cell_and_propagate(&mut self.sol, self.cursor, chosen, ctx.stats);
      if ctx.kind == ColonyKind::Acs {
        let p = ctx.pher.at_mut(self.cursor, chosen.index());
        *p = *p * 0.9 + ctx.tau0 * 0.1;
      }
    }
    self.cursor += 1;
    if self.cursor == self.sol.cell_count() {
      self.cursor = 0;
    }
  }

  /// The candidate with the highest pheromone; ties go to the smallest
  /// value.
  fn greedy_choice(&self, ctx: &StepContext) -> ValueSet {
    let n = self.sol.units();
    let cell = self.sol.cell(self.cursor);
    let mut choice = ValueSet::of(n, 1);
    let mut best = choice;
    let mut max_pher = -1.0f32;
    for idx in 0..n {
      if cell.contains(choice) {
        let p = ctx.pher.at(self.cursor, idx);
        if p > max_pher {
          max_pher = p;
          best = choice;
        }
      }
      choice <<= 1;
    }
    best
  }

  /// A candidate drawn with probability proportional to its pheromone.
  fn roulette_choice(&mut self, ctx: &mut StepContext) -> ValueSet {
    let n = self.sol.units();
    let cell = self.sol.cell(self.cursor);
    let mut choice = ValueSet::of(n, 1);
    let mut total = 0.0f32;
    let mut num_choices = 0;
    for idx in 0..n {
      if cell.contains(choice) {
        total += ctx.pher.at(self.cursor, idx);
        self.roulette[num_choices] = total;
        self.roulette_vals[num_choices] = choice;
        num_choices += 1;
      }
      choice <<= 1;
    }
    let draw = total * ctx.rng.random::<f32>();
    for i in 0..num_choices {
      if self.roulette[i] > draw {
        return self.roulette_vals[i];
      }
    }
    // Rounding left no strictly-greater prefix; the last candidate stands.
    self.roulette_vals[num_choices - 1]
  }

  /// How many cells this pass managed to fill.
  pub fn cells_filled(&self) -> usize {
    self.sol.cell_count() - self.fail_count
  }

  pub fn solution(&self) -> &Board {
    &self.sol
  }

  #[cfg(test)]
  pub fn solution_mut(&mut self) -> &mut Board {
    &mut self.sol
  }
}
