//! Random number support for the solvers.
//!
//! Each solver instance owns one RNG, seeded explicitly for reproducible
//! runs or from the operating system otherwise.

pub use rand::Rng;
use rand::{rngs::StdRng, SeedableRng};

/// The RNG used by the stochastic solvers.
pub type SolverRng = StdRng;

/// Makes a solver RNG, seeded from `seed` when given.
pub fn new_rng(seed: Option<u64>) -> SolverRng {
  match seed {
    Some(seed) => StdRng::seed_from_u64(seed),
    None => StdRng::from_os_rng(),
  }
}
