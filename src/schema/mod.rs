//! Schema module - Configuration, scene and control types for smoke simulations.

mod config;
mod controller;
mod scene;

pub use config::*;
pub use controller::*;
pub use scene::*;
