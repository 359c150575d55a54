//! The cooperative multi-colony driver.
//!
//! Heterogeneous colonies (ACS and MMAS) construct solutions in lock-step
//! and then cooperate through three operators, each gated by a cheap
//! population statistic:
//!
//! - an ACS colony whose solution entropy has collapsed absorbs a blend of
//!   the MMAS matrix (pheromone fusion);
//! - ACS colonies still exploring split one pheromone payoff between them
//!   in proportion to solution quality and diversity (cooperative-game
//!   allocation), and deposit their shares as the global update;
//! - a stagnating MMAS colony is nudged toward the assignments every ACS
//!   best solution agrees on (public-path recommendation), with a
//!   reinforcement that decays exponentially over iterations.

use super::ant::StepContext;
use super::colony::{pher_add, Colony, ColonyKind};
use crate::core::Board;
use crate::propagate::CpStats;
use crate::random::{new_rng, Rng, SolverRng};
use crate::solve::Engine;
use std::time::{Duration, Instant};
use tracing::debug;

/// Parameters of the multi-colony system.  The first `num_acs` colonies are
/// ACS; the rest are MMAS (normally exactly one).
#[derive(Clone, Copy, Debug)]
pub struct DcmConfig {
  pub num_colonies: usize,
  pub num_acs: usize,
  pub ants_per_colony: usize,
  pub q0: f32,
  pub rho: f32,
  pub best_evap: f32,
  pub conv_threshold: f32,
  pub entropy_threshold: f32,
}

impl Default for DcmConfig {
  fn default() -> Self {
    DcmConfig {
      num_colonies: 3,
      num_acs: 2,
      ants_per_colony: 4,
      q0: 0.9,
      rho: 0.9,
      best_evap: 0.005,
      conv_threshold: 0.8,
      entropy_threshold: 4.0,
    }
  }
}

/// Wall-clock totals for the three cooperation operators.
#[derive(Clone, Copy, Debug, Default)]
pub struct DcmTimes {
  pub coop_game_secs: f32,
  pub fusion_secs: f32,
  pub public_path_secs: f32,
}

/// The multi-colony solver.  Colonies and their matrices are built at the
/// start of `run` and dropped with the system.
pub struct MultiColonySystem {
  cfg: DcmConfig,
  rng: SolverRng,
  colonies: Vec<Colony>,
  global_best: Option<Board>,
  global_best_pher: f32,
  global_best_val: usize,
  iterations: usize,
  sol_secs: f32,
  times: DcmTimes,
}

impl MultiColonySystem {
  pub fn new(cfg: DcmConfig, seed: Option<u64>) -> Self {
    MultiColonySystem {
      cfg,
      rng: new_rng(seed),
      colonies: Vec::new(),
      global_best: None,
      global_best_pher: 0.0,
      global_best_val: 0,
      iterations: 0,
      sol_secs: 0.0,
      times: DcmTimes::default(),
    }
  }

  fn setup_colonies(&mut self, puzzle: &Board) {
    let num_acs = self.cfg.num_acs.min(self.cfg.num_colonies);
    self.colonies = (0..self.cfg.num_colonies)
      .map(|c| {
        let kind = if c < num_acs {
          ColonyKind::Acs
        } else {
          ColonyKind::Mmas
        };
        Colony::new(kind, puzzle, self.cfg.ants_per_colony, self.cfg.q0, self.cfg.rho)
      })
      .collect();
  }

  /// One pass of lock-step construction: every ant advances one cell at a
  /// time, across all colonies.
  fn construct(&mut self, cells: usize, stats: &CpStats) {
    let rng = &mut self.rng;
    for _ in 0..cells {
      for colony in self.colonies.iter_mut() {
        let kind = colony.kind;
        let q0 = colony.q0;
        let tau0 = colony.tau0;
        let Colony { ants, pher, .. } = colony;
        let mut ctx = StepContext {
          kind,
          q0,
          tau0,
          pher,
          rng: &mut *rng,
          stats,
        };
        for ant in ants.iter_mut() {
          ant.step(&mut ctx);
        }
      }
    }
  }

  /// Harvests each colony's best ant, refreshes colony and global bests,
  /// and reports whether some colony completed the board.
  fn harvest_bests(&mut self, cells: usize, units: usize, iter: usize) -> bool {
    let mut solved = false;
    for c in 0..self.colonies.len() {
      let (mut best_filled, mut i_best) = (0, 0);
      for (i, ant) in self.colonies[c].ants.iter().enumerate() {
        if ant.cells_filled() > best_filled {
          best_filled = ant.cells_filled();
          i_best = i;
        }
      }
      let pher_to_add = pher_add(cells, best_filled);
      let colony = &mut self.colonies[c];
      if pher_to_add > colony.best_pher {
        colony.best_sol = Some(colony.ants[i_best].solution().clone());
        colony.best_pher = pher_to_add;
        colony.best_val = best_filled;
        colony.last_improve_iter = iter;
        if colony.kind == ColonyKind::Mmas {
          colony.refresh_limits(units);
        }
        debug!(colony = c, iter, filled = best_filled, "colony best improved");
      }
      if colony.best_pher > self.global_best_pher {
        self.global_best_pher = colony.best_pher;
        self.global_best = colony.best_sol.clone();
        self.global_best_val = colony.best_val;
        if self.global_best_val == cells {
          solved = true;
        }
      }
    }
    solved
  }

  /// Cooperative-game allocation over the given ACS colonies: the total
  /// payoff (the sum of their pheromone scores this round) is split in
  /// proportion to each colony's contribution, the product of a solution
  /// quality factor and a normalized entropy factor.  The shares land in
  /// `allocated`, indexed by colony.
  fn cooperative_game_allocate(&self, cells: usize, acs: &[usize], allocated: &mut [f32]) {
    if acs.is_empty() {
      return;
    }
    let mut total_payoff = 0.0f64;
    let mut min_len = usize::MAX;
    let mut lengths = Vec::with_capacity(acs.len());
    let mut entropies = Vec::with_capacity(acs.len());
    let mut e_max = 0.0f32;
    for &c in acs {
      let colony = &self.colonies[c];
      let len = cells - colony.best_val;
      lengths.push(len);
      min_len = min_len.min(len);
      total_payoff += pher_add(cells, colony.best_val) as f64;
      let e = colony.entropy();
      entropies.push(e);
      e_max = e_max.max(e);
    }
    let mut contributions = vec![0.0f64; acs.len()];
    let mut sum_contr = 0.0f64;
    for k in 0..acs.len() {
      let quality = if lengths[k] > 0 {
        min_len as f64 / lengths[k] as f64
      } else {
        1.0
      };
      let diversity = if e_max > 0.0 {
        (entropies[k] / e_max) as f64
      } else {
        0.0
      };
      contributions[k] = quality * diversity;
      sum_contr += contributions[k];
    }
    for k in 0..acs.len() {
      let share = if sum_contr > 0.0 {
        contributions[k] / sum_contr
      } else {
        1.0 / acs.len() as f64
      };
      allocated[acs[k]] = (share * total_payoff) as f32;
    }
  }

  /// Blends the MMAS matrix into each low-entropy ACS colony.  The mixing
  /// weight is the ACS entropy's share of the combined entropy, so a fully
  /// collapsed ACS colony keeps its own matrix untouched.
  fn apply_pheromone_fusion(&mut self, low_entropy_acs: &[usize], mmas: usize) {
    let e_mmas = self.colonies[mmas].entropy();
    for &c in low_entropy_acs {
      let e_acs = self.colonies[c].entropy();
      let total = e_acs + e_mmas;
      let weight = if total > 0.0 { e_acs / total } else { 0.0 };
      let (acs, mmas_colony) = two_colonies(&mut self.colonies, c, mmas);
      acs.pher.blend_from(&mmas_colony.pher, weight);
      debug!(colony = c, weight, "pheromone fusion");
    }
  }

  /// Reinforces, on the MMAS matrix, every assignment that all ACS best
  /// solutions agree on.  The reinforcement `e^(-iter) / N` is strong in
  /// the first iterations and vanishes as the run ages.
  fn apply_public_path(&mut self, iter: usize, acs: &[usize], mmas: usize) {
    let cells = self.colonies[mmas].pher.cells();
    let units = self.colonies[mmas].pher.values_per_cell();
    let mut public_idx = vec![-1i32; cells];
    'next_cell: for cell in 0..cells {
      let mut agreed = None;
      for &c in acs {
        let Some(best) = &self.colonies[c].best_sol else {
          continue 'next_cell;
        };
        let set = best.cell(cell);
        if !set.is_fixed() {
          continue 'next_cell;
        }
        match agreed {
          None => agreed = Some(set.index()),
          Some(idx) if idx != set.index() => continue 'next_cell,
          _ => {}
        }
      }
      if let Some(idx) = agreed {
        public_idx[cell] = idx as i32;
      }
    }

    let tau_pub = (-(iter as f32)).exp() / units as f32;
    let colony = &mut self.colonies[mmas];
    for (cell, &idx) in public_idx.iter().enumerate() {
      if idx >= 0 {
        *colony.pher.at_mut(cell, idx as usize) += tau_pub;
      }
    }
    colony.clamp();
    debug!(iter, tau_pub, "public path recommendation");
  }

  pub fn times(&self) -> DcmTimes {
    self.times
  }
}

impl Engine for MultiColonySystem {
  fn run(&mut self, puzzle: &Board, budget: Duration, stats: &CpStats) -> bool {
    let timer = Instant::now();
    let cells = puzzle.cell_count();
    let units = puzzle.units();
    self.setup_colonies(puzzle);
    self.times = DcmTimes::default();

    let mut iter = 0usize;
    let mut solved = false;
    while !solved {
      for colony in self.colonies.iter_mut() {
        for ant in colony.ants.iter_mut() {
          ant.init(puzzle, self.rng.random_range(0..cells));
        }
      }
      self.construct(cells, stats);
      solved = self.harvest_bests(cells, units, iter);

      let (acs_idx, mmas_idx): (Vec<usize>, Vec<usize>) =
        (0..self.colonies.len()).partition(|&c| self.colonies[c].kind == ColonyKind::Acs);

      if !acs_idx.is_empty() {
        let mut low_entropy = Vec::new();
        let mut high_entropy = Vec::new();
        for &c in &acs_idx {
          if self.colonies[c].entropy() < self.cfg.entropy_threshold {
            low_entropy.push(c);
          } else {
            high_entropy.push(c);
          }
        }

        if !low_entropy.is_empty() && !mmas_idx.is_empty() {
          let t = Instant::now();
          self.apply_pheromone_fusion(&low_entropy, mmas_idx[0]);
          self.times.fusion_secs += t.elapsed().as_secs_f32();
        }

        if !high_entropy.is_empty() {
          let t = Instant::now();
          let mut allocated = vec![0.0f32; self.colonies.len()];
          self.cooperative_game_allocate(cells, &high_entropy, &mut allocated);
          self.times.coop_game_secs += t.elapsed().as_secs_f32();
          for &c in &high_entropy {
            let deposit = allocated[c];
            let colony = &mut self.colonies[c];
            colony.global_update(deposit);
            colony.best_pher *= 1.0 - self.cfg.best_evap;
          }
        }
      }

      if let Some(&mmas) = mmas_idx.first() {
        let convergence = if iter > 0 {
          self.colonies[mmas].last_improve_iter as f32 / iter as f32
        } else {
          1.0
        };
        if convergence < self.cfg.conv_threshold {
          if !acs_idx.is_empty() {
            let t = Instant::now();
            self.apply_public_path(iter, &acs_idx, mmas);
            self.times.public_path_secs += t.elapsed().as_secs_f32();
          }
        } else {
          let colony = &mut self.colonies[mmas];
          let deposit = colony.best_pher;
          colony.global_update(deposit);
        }
      }

      iter += 1;
      if iter % 100 == 0 && timer.elapsed() > budget {
        break;
      }
    }

    self.iterations = iter;
    self.sol_secs = timer.elapsed().as_secs_f32();
    if solved {
      debug!(iter, secs = self.sol_secs, "multi-colony solve complete");
    }
    solved
  }

  fn solution(&self) -> Option<&Board> {
    self.global_best.as_ref()
  }

  fn solution_secs(&self) -> f32 {
    self.sol_secs
  }

  fn iterations(&self) -> usize {
    self.iterations
  }

  fn dcm_times(&self) -> Option<DcmTimes> {
    Some(self.times)
  }
}

/// Mutable access to one colony alongside shared access to another.
fn two_colonies(colonies: &mut [Colony], a: usize, b: usize) -> (&mut Colony, &Colony) {
  debug_assert_ne!(a, b);
  if a < b {
    let (lo, hi) = colonies.split_at_mut(b);
    (&mut lo[a], &hi[0])
  } else {
    let (lo, hi) = colonies.split_at_mut(a);
    (&mut hi[0], &lo[b])
  }
}
