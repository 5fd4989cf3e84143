//! Smoke - Grid-based incompressible fluid simulation.
//!
//! This crate simulates smoke on a fixed-resolution 2D or 3D staggered (MAC)
//! grid: body forces, a red-black over-relaxed pressure projection that is
//! safe to run across all cores, velocity extrapolation into obstacles, and
//! semi-Lagrangian advection of velocity and a passive density field.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Parameters, scenes and controllers
//! - `compute`: Grid fields and the per-frame kernel sequence
//!
//! # Example
//!
//! ```rust,no_run
//! use smoke_sim::{
//!     compute::{SimulationStats, SmokeSimulation},
//!     schema::{FieldName, ObstaclePattern, Scene, SmokeParams},
//! };
//!
//! let mut params = SmokeParams {
//!     resolution: [128, 128, 1],
//!     ..Default::default()
//! };
//! let scene = Scene {
//!     obstacles: vec![ObstaclePattern::Sphere {
//!         center: [0.5, 0.3, 0.5],
//!         radius: 0.1,
//!     }],
//!     ..Default::default()
//! };
//!
//! let mut sim = SmokeSimulation::new(&params, scene)?;
//! for _ in 0..100 {
//!     sim.step(&mut params, 1.0 / 60.0)?;
//! }
//!
//! let stats = SimulationStats::from_simulation(&sim);
//! println!("Total density after 100 frames: {}", stats.total_density);
//!
//! // Hand a cell-centered image to a renderer
//! let image = sim.render_scalar(FieldName::Density);
//! assert_eq!(image.len(), 128 * 128);
//! # Ok::<(), smoke_sim::schema::ConfigError>(())
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::{SimulationStats, SmokeSimulation};
pub use schema::{Controller, Scene, SmokeParams};
