//! Defines the core board types.
//!
//! Among these are:
//!
//! - ValueSet: the candidate values a single cell may still take
//! - Geometry: board sizes and the row/column/box index maps
//! - Board: the grid of candidate sets the solvers work on

mod board;
mod geom;
mod value_set;

pub use board::*;
pub use geom::*;
pub use value_set::*;
