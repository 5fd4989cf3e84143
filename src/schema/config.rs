//! Configuration types for smoke simulation parameters.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Pressure value written into every cell on allocation and reset.
pub const DEFAULT_PRESSURE: f32 = 1.0;

/// Per-frame parameter record.
///
/// The simulation receives one of these every frame. Grid resolution and
/// spacing are part of the record; changing either reallocates all buffers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmokeParams {
    /// Grid resolution `[nx, ny, nz]` in cells. Use `nz = 1` for 2D simulations.
    pub resolution: [usize; 3],
    /// Cell spacing `h`.
    pub spacing: f32,
    /// Number of physical projection iterations (each runs two colour passes).
    pub iterations: u32,
    /// Body force applied to the velocity field every frame.
    pub gravity: [f32; 3],
    /// Overrelaxation factor for the projection, in (0, 2).
    pub overrelaxation: f32,
    /// Fluid density used to scale accumulated pressure.
    pub fluid_density: f32,
    /// Keep pressure from the previous frame instead of refilling the default.
    pub warm_start_pressure: bool,
    /// Fixed or measured time step.
    pub time_step: TimeStep,
    /// Bilinear/trilinear sampling during advection (nearest otherwise).
    pub interpolate: bool,
    /// Field reported for visualization.
    pub visualize: FieldName,
    /// Edge-triggered reset request. Cleared by the simulation after one frame.
    pub reset: bool,
    /// Domain-edge boundary conditions.
    pub boundaries: Boundaries,
    /// Density and velocity sources injected each frame.
    pub emitters: Vec<Emitter>,
}

impl Default for SmokeParams {
    fn default() -> Self {
        Self {
            resolution: [256, 256, 1],
            spacing: 1.1,
            iterations: 30,
            gravity: [0.0, -9.81, 0.0],
            overrelaxation: 1.9,
            fluid_density: 0.002,
            warm_start_pressure: true,
            time_step: TimeStep::default(),
            interpolate: true,
            visualize: FieldName::Density,
            reset: false,
            boundaries: Boundaries::default(),
            emitters: Vec::new(),
        }
    }
}

impl SmokeParams {
    /// Check if this is a 3D simulation (depth > 1).
    #[inline]
    pub fn is_3d(&self) -> bool {
        self.resolution[2] > 1
    }

    /// Get total cell count (nx * ny * nz).
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.resolution.iter().product()
    }

    /// Time step for this frame given the measured frame delta.
    #[inline]
    pub fn dt(&self, frame_dt: f32) -> f32 {
        self.time_step.resolve(frame_dt)
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resolution.contains(&0) {
            return Err(ConfigError::InvalidDimensions);
        }
        if !self.spacing.is_finite() || self.spacing <= 0.0 {
            return Err(ConfigError::InvalidSpacing(self.spacing));
        }
        if !(self.overrelaxation > 0.0 && self.overrelaxation < 2.0) {
            return Err(ConfigError::InvalidOverrelaxation(self.overrelaxation));
        }
        match self.time_step {
            TimeStep::Fixed { dt } if !dt.is_finite() || dt <= 0.0 => {
                return Err(ConfigError::InvalidTimeStep(dt));
            }
            _ => {}
        }
        for (i, emitter) in self.emitters.iter().enumerate() {
            if !emitter.radius.is_finite() || emitter.radius < 0.0 {
                return Err(ConfigError::InvalidEmitter { emitter: i });
            }
        }
        Ok(())
    }

    /// Load and validate parameters from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let text = std::fs::read_to_string(path)?;
        let params: Self = serde_json::from_str(&text)?;
        params.validate()?;
        Ok(params)
    }
}

/// Time step selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TimeStep {
    /// Use the same dt every frame.
    Fixed { dt: f32 },
    /// Use the measured wall-clock delta between frames.
    Measured,
}

impl Default for TimeStep {
    fn default() -> Self {
        TimeStep::Fixed { dt: 1.0 / 60.0 }
    }
}

impl TimeStep {
    /// Pick the dt for this frame.
    #[inline]
    pub fn resolve(self, frame_dt: f32) -> f32 {
        match self {
            TimeStep::Fixed { dt } => dt,
            TimeStep::Measured => frame_dt,
        }
    }
}

/// Boundary condition for the velocity component normal to a domain edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryCondition {
    /// No flow through the edge: normal component is zero.
    #[default]
    Wall,
    /// Zero normal gradient: edge face copies the adjacent interior face.
    Open,
}

/// Boundary conditions per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Boundaries {
    pub x: BoundaryCondition,
    pub y: BoundaryCondition,
    pub z: BoundaryCondition,
}

impl Boundaries {
    /// Same condition on every axis.
    pub fn uniform(condition: BoundaryCondition) -> Self {
        Self {
            x: condition,
            y: condition,
            z: condition,
        }
    }

    /// Condition for the given axis (0 = x, 1 = y, 2 = z).
    #[inline]
    pub fn axis(&self, axis: usize) -> BoundaryCondition {
        match axis {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }
}

/// Named simulation buffers exposed to renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    Velocity,
    Pressure,
    #[default]
    Density,
    Obstacles,
}

impl FieldName {
    pub const ALL: [FieldName; 4] = [
        FieldName::Velocity,
        FieldName::Pressure,
        FieldName::Density,
        FieldName::Obstacles,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FieldName::Velocity => "velocity",
            FieldName::Pressure => "pressure",
            FieldName::Density => "density",
            FieldName::Obstacles => "obstacles",
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldName {
    type Err = UnknownFieldName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldName::ALL
            .into_iter()
            .find(|name| name.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownFieldName(s.to_string()))
    }
}

/// Returned when parsing an unknown buffer name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown field name: {0}")]
pub struct UnknownFieldName(pub String);

/// Spherical (circular in 2D) source of density and, optionally, velocity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Emitter {
    /// Center as fraction of the domain extent (0.0-1.0 per axis).
    pub center: [f32; 3],
    /// Radius as fraction of the smallest active extent.
    pub radius: f32,
    /// Density written into covered fluid cells (never lowers existing density).
    pub density: f32,
    /// Velocity imposed on covered faces.
    #[serde(default)]
    pub velocity: Option<[f32; 3]>,
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Grid resolution (nx, ny, nz) must be non-zero")]
    InvalidDimensions,
    #[error("Cell spacing must be positive and finite, got {0}")]
    InvalidSpacing(f32),
    #[error("Overrelaxation must lie in (0, 2), got {0}")]
    InvalidOverrelaxation(f32),
    #[error("Time step must be positive and finite, got {0}")]
    InvalidTimeStep(f32),
    #[error("Emitter {emitter} has an invalid radius")]
    InvalidEmitter { emitter: usize },
}

/// Errors from loading configuration files.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] ConfigError),
}
