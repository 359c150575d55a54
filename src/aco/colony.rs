//! Defines the Colony type: a pheromone matrix, a population of ants, and
//! the pheromone update families the drivers apply to them.

use super::ant::Ant;
use crate::core::Board;
use fxhash::FxHashMap;

/// The two ant-system variants a colony can run.
///
/// ACS colonies bias construction toward the best-known value with
/// probability `q0` and deposit a small local update at every step.  MMAS
/// colonies select purely by roulette, update only globally, and clamp
/// every matrix entry into `[tau_min, tau_max]`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ColonyKind {
  Acs,
  Mmas,
}

/// The evaporation rate MMAS colonies use for their global update.
pub const MMAS_RHO: f32 = 0.1;

/// The pheromone score awarded to a solution that filled `filled` of
/// `cells` cells: unbounded as the solution approaches completeness.
pub fn pher_add(cells: usize, filled: usize) -> f32 {
  cells as f32 / (cells - filled) as f32
}

/// A colony's pheromone, one non-negative float per (cell, value) pair.
#[derive(Clone, Debug)]
pub struct PheromoneMatrix {
  values: Vec<f32>,
  values_per_cell: usize,
}

impl PheromoneMatrix {
  pub fn new(cells: usize, values_per_cell: usize, tau0: f32) -> Self {
    PheromoneMatrix {
      values: vec![tau0; cells * values_per_cell],
      values_per_cell,
    }
  }

  pub fn cells(&self) -> usize {
    self.values.len() / self.values_per_cell
  }

  pub fn values_per_cell(&self) -> usize {
    self.values_per_cell
  }

  pub fn at(&self, cell: usize, value_index: usize) -> f32 {
    self.values[cell * self.values_per_cell + value_index]
  }

  pub fn at_mut(&mut self, cell: usize, value_index: usize) -> &mut f32 {
    &mut self.values[cell * self.values_per_cell + value_index]
  }

  /// Clamps every entry into `[lo, hi]`.
  pub fn clamp(&mut self, lo: f32, hi: f32) {
    for p in &mut self.values {
      *p = p.clamp(lo, hi);
    }
  }

  /// Blends `weight` of `other` into this matrix, entrywise:
  /// `p = (1 - weight) * p + weight * other`.
  pub fn blend_from(&mut self, other: &PheromoneMatrix, weight: f32) {
    for (p, &q) in self.values.iter_mut().zip(&other.values) {
      *p = (1.0 - weight) * *p + weight * q;
    }
  }
}

/// One colony of the multi-colony system: its matrix, its ants, its
/// parameters, and the best solution it has constructed so far.
pub struct Colony {
  pub kind: ColonyKind,
  pub pher: PheromoneMatrix,
  pub ants: Vec<Ant>,

  pub q0: f32,
  pub rho: f32,
  pub tau0: f32,
  /// Max-Min bounds; only meaningful (and enforced) for MMAS colonies.
  pub tau_min: f32,
  pub tau_max: f32,

  pub best_sol: Option<Board>,
  pub best_pher: f32,
  pub best_val: usize,
  pub last_improve_iter: usize,
}

impl Colony {
  /// Sets up a colony for the given puzzle.  ACS colonies take the caller's
  /// `q0`/`rho`; MMAS colonies select purely by roulette and use `MMAS_RHO`,
  /// with Max-Min bounds seeded from the initial pheromone.
  pub fn new(kind: ColonyKind, puzzle: &Board, num_ants: usize, q0: f32, rho: f32) -> Colony {
    let cells = puzzle.cell_count();
    let units = puzzle.units();
    let tau0 = 1.0 / cells as f32;
    let (q0, rho) = match kind {
      ColonyKind::Acs => (q0, rho),
      ColonyKind::Mmas => (0.0, MMAS_RHO),
    };
    let (tau_min, tau_max) = match kind {
      ColonyKind::Acs => (0.0, 0.0),
      ColonyKind::Mmas => {
        let tau_max = tau0 / MMAS_RHO;
        (tau_max / (2.0 * units as f32), tau_max)
      }
    };
    Colony {
      kind,
      pher: PheromoneMatrix::new(cells, units, tau0),
      ants: (0..num_ants).map(|_| Ant::new(puzzle)).collect(),
      q0,
      rho,
      tau0,
      tau_min,
      tau_max,
      best_sol: None,
      best_pher: 0.0,
      best_val: 0,
      last_improve_iter: 0,
    }
  }

  /// Global pheromone update: reinforces every fixed cell of the colony's
  /// best solution with `deposit`, evaporating by the colony's rho.  MMAS
  /// matrices are clamped afterwards.
  pub fn global_update(&mut self, deposit: f32) {
    if let Some(best) = &self.best_sol {
      for cell in 0..best.cell_count() {
        let set = best.cell(cell);
        if set.is_fixed() {
          let p = self.pher.at_mut(cell, set.index());
          *p = *p * (1.0 - self.rho) + self.rho * deposit;
        }
      }
    }
    self.clamp();
  }

  /// Applies the Max-Min clamp; does nothing for ACS colonies.
  pub fn clamp(&mut self) {
    if self.kind == ColonyKind::Mmas {
      self.pher.clamp(self.tau_min, self.tau_max);
    }
  }

  /// Refreshes the Max-Min bounds from the colony best after an
  /// improvement: `tau_max = best / rho`, `tau_min = tau_max / (2N)`.
  pub fn refresh_limits(&mut self, units: usize) {
    debug_assert_eq!(self.kind, ColonyKind::Mmas);
    self.tau_max = self.best_pher / self.rho;
    self.tau_min = self.tau_max / (2.0 * units as f32);
  }

  /// Shannon entropy (base 2) of the distribution of this colony's ants
  /// over distinct constructed boards.  Zero when every ant built the same
  /// board; at most log2(number of ants).
  pub fn entropy(&self) -> f32 {
    if self.ants.is_empty() {
      return 0.0;
    }
    let mut buckets: FxHashMap<Vec<i16>, usize> = FxHashMap::default();
    for ant in &self.ants {
      *buckets.entry(ant.solution().assignment_key()).or_insert(0) += 1;
    }
    let total = self.ants.len() as f64;
    let mut entropy = 0.0f64;
    for &count in buckets.values() {
      let p = count as f64 / total;
      entropy -= p * p.log2();
    }
    entropy as f32
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::ValueSet;
  use crate::propagate::{set_cell_and_propagate, CpStats};

  fn blank() -> Board {
    Board::from_line(&".".repeat(81)).unwrap()
  }

  #[test]
  fn pher_add_grows_toward_completion() {
    assert_eq!(pher_add(81, 0), 1.0);
    assert!((pher_add(81, 54) - 3.0).abs() < 1e-6);
    assert!(pher_add(81, 80) > pher_add(81, 79));
    assert_eq!(pher_add(81, 81), f32::INFINITY);
  }

  #[test]
  fn acs_setup() {
    let colony = Colony::new(ColonyKind::Acs, &blank(), 4, 0.9, 0.8);
    assert_eq!(colony.q0, 0.9);
    assert_eq!(colony.rho, 0.8);
    assert_eq!(colony.tau0, 1.0 / 81.0);
    assert_eq!(colony.pher.at(0, 0), 1.0 / 81.0);
    assert_eq!(colony.ants.len(), 4);
  }

  #[test]
  fn mmas_setup_and_bounds() {
    let colony = Colony::new(ColonyKind::Mmas, &blank(), 4, 0.9, 0.8);
    assert_eq!(colony.q0, 0.0);
    assert_eq!(colony.rho, MMAS_RHO);
    let tau0 = 1.0 / 81.0;
    assert!((colony.tau_max - tau0 / MMAS_RHO).abs() < 1e-7);
    assert!((colony.tau_min - colony.tau_max / 18.0).abs() < 1e-7);
  }

  #[test]
  fn global_update_reinforces_best() {
    let mut colony = Colony::new(ColonyKind::Acs, &blank(), 1, 0.9, 0.8);
    let mut best = blank();
    let stats = CpStats::new();
    set_cell_and_propagate(&mut best, 0, ValueSet::of(9, 3), &stats);
    colony.best_sol = Some(best);

    let tau0 = colony.tau0;
    colony.global_update(2.0);
    let expected = tau0 * (1.0 - 0.8) + 0.8 * 2.0;
    assert!((colony.pher.at(0, 2) - expected).abs() < 1e-6);
    // Untouched entries keep their initial value.
    assert_eq!(colony.pher.at(0, 3), tau0);
    assert_eq!(colony.pher.at(1, 2), tau0);
  }

  #[test]
  fn mmas_update_respects_bounds() {
    let mut colony = Colony::new(ColonyKind::Mmas, &blank(), 1, 0.0, 0.0);
    let mut best = blank();
    let stats = CpStats::new();
    set_cell_and_propagate(&mut best, 7, ValueSet::of(9, 9), &stats);
    colony.best_sol = Some(best);

    // A huge deposit must be pulled back to tau_max.
    colony.global_update(1e6);
    for cell in 0..81 {
      for idx in 0..9 {
        let p = colony.pher.at(cell, idx);
        assert!(p >= colony.tau_min && p <= colony.tau_max);
      }
    }
    assert_eq!(colony.pher.at(7, 8), colony.tau_max);
  }

  #[test]
  fn blend_is_entrywise() {
    let mut a = PheromoneMatrix::new(4, 2, 1.0);
    let b = PheromoneMatrix::new(4, 2, 3.0);
    a.blend_from(&b, 0.25);
    for cell in 0..4 {
      for idx in 0..2 {
        assert!((a.at(cell, idx) - 1.5).abs() < 1e-6);
      }
    }
  }

  #[test]
  fn entropy_bounds() {
    let puzzle = blank();
    let stats = CpStats::new();
    let mut colony = Colony::new(ColonyKind::Acs, &puzzle, 4, 0.9, 0.9);
    for ant in &mut colony.ants {
      ant.init(&puzzle, 0);
    }
    // Identical boards: zero entropy.
    assert_eq!(colony.entropy(), 0.0);

    // All distinct: log2(M).
    for (i, ant) in colony.ants.iter_mut().enumerate() {
      set_cell_and_propagate(ant.solution_mut(), 0, ValueSet::of(9, i + 1), &stats);
    }
    assert!((colony.entropy() - 2.0).abs() < 1e-6);

    // Two pairs: 1 bit.
    for (i, ant) in colony.ants.iter_mut().enumerate() {
      ant.init(&puzzle, 0);
      set_cell_and_propagate(ant.solution_mut(), 0, ValueSet::of(9, 1 + i % 2), &stats);
    }
    assert!((colony.entropy() - 1.0).abs() < 1e-6);
  }
}
