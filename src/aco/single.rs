//! A single-colony Ant Colony System driver: construction and the global
//! update with best-evaporation, with none of the cooperation machinery.

use super::ant::StepContext;
use super::colony::{pher_add, Colony, ColonyKind};
use crate::core::Board;
use crate::propagate::CpStats;
use crate::random::{new_rng, Rng, SolverRng};
use crate::solve::Engine;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Clone, Copy, Debug)]
pub struct AcsConfig {
  pub num_ants: usize,
  pub q0: f32,
  pub rho: f32,
  pub best_evap: f32,
}

impl Default for AcsConfig {
  fn default() -> Self {
    AcsConfig {
      num_ants: 12,
      q0: 0.9,
      rho: 0.9,
      best_evap: 0.005,
    }
  }
}

pub struct AntSystem {
  cfg: AcsConfig,
  rng: SolverRng,
  colony: Option<Colony>,
  iterations: usize,
  sol_secs: f32,
}

impl AntSystem {
  pub fn new(cfg: AcsConfig, seed: Option<u64>) -> Self {
    AntSystem {
      cfg,
      rng: new_rng(seed),
      colony: None,
      iterations: 0,
      sol_secs: 0.0,
    }
  }
}

impl Engine for AntSystem {
  fn run(&mut self, puzzle: &Board, budget: Duration, stats: &CpStats) -> bool {
    let timer = Instant::now();
    let cells = puzzle.cell_count();
    self.colony = Some(Colony::new(
      ColonyKind::Acs,
      puzzle,
      self.cfg.num_ants,
      self.cfg.q0,
      self.cfg.rho,
    ));
    let colony = self.colony.as_mut().unwrap();

    let mut iter = 0usize;
    let mut solved = false;
    while !solved {
      for ant in colony.ants.iter_mut() {
        ant.init(puzzle, self.rng.random_range(0..cells));
      }
      for _ in 0..cells {
        let tau0 = colony.tau0;
        let Colony { ants, pher, .. } = &mut *colony;
        let mut ctx = StepContext {
          kind: ColonyKind::Acs,
          q0: self.cfg.q0,
          tau0,
          pher,
          rng: &mut self.rng,
          stats,
        };
        for ant in ants.iter_mut() {
          ant.step(&mut ctx);
        }
      }

      let (mut best_filled, mut i_best) = (0, 0);
      for (i, ant) in colony.ants.iter().enumerate() {
        if ant.cells_filled() > best_filled {
          best_filled = ant.cells_filled();
          i_best = i;
        }
      }
      let pher_to_add = pher_add(cells, best_filled);
      if pher_to_add > colony.best_pher {
        colony.best_sol = Some(colony.ants[i_best].solution().clone());
        colony.best_pher = pher_to_add;
        colony.best_val = best_filled;
        colony.last_improve_iter = iter;
        debug!(iter, filled = best_filled, "colony best improved");
        if best_filled == cells {
          solved = true;
        }
      }

      let deposit = colony.best_pher;
      colony.global_update(deposit);
      colony.best_pher *= 1.0 - self.cfg.best_evap;

      iter += 1;
      if iter % 100 == 0 && timer.elapsed() > budget {
        break;
      }
    }

    self.iterations = iter;
    self.sol_secs = timer.elapsed().as_secs_f32();
    solved
  }

  fn solution(&self) -> Option<&Board> {
    self.colony.as_ref().and_then(|c| c.best_sol.as_ref())
  }

  fn solution_secs(&self) -> f32 {
    self.sol_secs
  }

  fn iterations(&self) -> usize {
    self.iterations
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const SOLVED: &str =
    "123456789456789123789123456234567891567891234891234567345678912678912345912345678";

  #[test]
  fn solved_board_completes_immediately() {
    let puzzle = Board::from_line(SOLVED).unwrap();
    let mut system = AntSystem::new(AcsConfig::default(), Some(3));
    let stats = CpStats::new();
    assert!(system.run(&puzzle, Duration::from_secs(5), &stats));
    assert_eq!(system.iterations(), 1);
    assert!(puzzle.check_solution(system.solution().unwrap()));
  }

  #[test]
  fn fills_a_nearly_complete_puzzle() {
    // Blank out a row; construction with propagation finishes it fast.
    let mut line: Vec<char> = SOLVED.chars().collect();
    for cell in 36..45 {
      line[cell] = '.';
    }
    let puzzle = Board::from_line(&line.iter().collect::<String>()).unwrap();
    let mut system = AntSystem::new(AcsConfig::default(), Some(5));
    let stats = CpStats::new();
    assert!(system.run(&puzzle, Duration::from_secs(10), &stats));
    assert!(puzzle.check_solution(system.solution().unwrap()));
  }
}
