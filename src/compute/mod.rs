//! Compute module - Numerical core of the smoke solver.

mod advection;
mod buffers;
mod extrapolation;
mod field;
mod forces;
mod grid;
mod projection;
mod simulation;
mod sources;
mod stats;

pub use advection::*;
pub use buffers::*;
pub use extrapolation::*;
pub use field::*;
pub use forces::*;
pub use grid::*;
pub use projection::*;
pub use simulation::*;
pub use sources::*;
pub use stats::*;
