//! Scene types for initializing smoke simulations.

use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::LoadError;

/// Initial configuration of the obstacle mask and density field.
///
/// Coordinates are fractions of the domain extent (0.0-1.0 per axis) so the
/// same scene can be reused across resolutions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scene {
    /// Solid regions. Cells whose centers fall inside any shape get mask 0.
    pub obstacles: Vec<ObstaclePattern>,
    /// Initial density pattern.
    pub density: DensityPattern,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            obstacles: Vec::new(),
            density: DensityPattern::Uniform { value: 1.0 },
        }
    }
}

/// Solid shapes carved out of the fluid domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ObstaclePattern {
    /// Sphere in 3D, circle in 2D.
    Sphere {
        center: [f32; 3],
        /// Radius as fraction of the smallest active extent.
        radius: f32,
    },
    /// Axis-aligned box.
    Box { min: [f32; 3], max: [f32; 3] },
    /// Slab spanning the whole domain, perpendicular to `axis`.
    Column {
        axis: usize,
        /// Slab center along `axis`.
        position: f32,
        /// Slab thickness along `axis`.
        thickness: f32,
    },
}

/// Predefined density patterns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DensityPattern {
    /// No smoke.
    Empty,
    /// Same value everywhere.
    Uniform { value: f32 },
    /// Gaussian blob.
    Blob {
        center: [f32; 3],
        /// Radius as fraction of the smallest active extent.
        radius: f32,
        amplitude: f32,
    },
    /// Uniform random noise in [0, amplitude].
    Noise { amplitude: f32, seed: u64 },
}

/// Cell center in fractions of the domain extent.
#[inline]
fn cell_fraction(x: usize, y: usize, z: usize, resolution: [usize; 3]) -> [f32; 3] {
    [
        (x as f32 + 0.5) / resolution[0] as f32,
        (y as f32 + 0.5) / resolution[1] as f32,
        (z as f32 + 0.5) / resolution[2] as f32,
    ]
}

/// Number of axes that take part in the simulation.
#[inline]
fn active_axes(resolution: [usize; 3]) -> usize {
    if resolution[2] > 1 { 3 } else { 2 }
}

/// Distance in cells between a cell center and a fractional point, over active axes.
fn cell_distance(cell: [f32; 3], point: [f32; 3], resolution: [usize; 3]) -> f32 {
    (0..active_axes(resolution))
        .map(|a| {
            let d = (cell[a] - point[a]) * resolution[a] as f32;
            d * d
        })
        .sum::<f32>()
        .sqrt()
}

/// Fractional radius converted to cells using the smallest active extent.
fn radius_in_cells(radius: f32, resolution: [usize; 3]) -> f32 {
    let min_dim = resolution[..active_axes(resolution)]
        .iter()
        .copied()
        .min()
        .unwrap_or(1);
    radius * min_dim as f32
}

impl ObstaclePattern {
    /// Check whether a cell center (as fraction of the extent) lies inside the shape.
    pub fn contains(&self, cell: [f32; 3], resolution: [usize; 3]) -> bool {
        match self {
            ObstaclePattern::Sphere { center, radius } => {
                cell_distance(cell, *center, resolution) <= radius_in_cells(*radius, resolution)
            }
            ObstaclePattern::Box { min, max } => (0..active_axes(resolution))
                .all(|a| cell[a] >= min[a] && cell[a] <= max[a]),
            ObstaclePattern::Column {
                axis,
                position,
                thickness,
            } => {
                let a = (*axis).min(2);
                (cell[a] - position).abs() <= thickness * 0.5
            }
        }
    }
}

impl Scene {
    /// Build the obstacle mask (1 = fluid, 0 = solid) for the given resolution.
    pub fn obstacle_mask(&self, resolution: [usize; 3]) -> Vec<f32> {
        let [nx, ny, nz] = resolution;
        let mut mask = vec![1.0f32; nx * ny * nz];

        if self.obstacles.is_empty() {
            return mask;
        }

        for z in 0..nz {
            for y in 0..ny {
                for x in 0..nx {
                    let cell = cell_fraction(x, y, z, resolution);
                    if self.obstacles.iter().any(|o| o.contains(cell, resolution)) {
                        mask[(z * ny + y) * nx + x] = 0.0;
                    }
                }
            }
        }

        mask
    }

    /// Generate the initial density field for the given resolution.
    pub fn density(&self, resolution: [usize; 3]) -> Vec<f32> {
        let [nx, ny, nz] = resolution;
        let size = nx * ny * nz;

        match &self.density {
            DensityPattern::Empty => vec![0.0; size],
            DensityPattern::Uniform { value } => vec![*value; size],
            DensityPattern::Blob {
                center,
                radius,
                amplitude,
            } => {
                let r = radius_in_cells(*radius, resolution);
                let sigma_sq = (r / 2.0).powi(2).max(1e-6);
                let mut grid = vec![0.0f32; size];
                for z in 0..nz {
                    for y in 0..ny {
                        for x in 0..nx {
                            let cell = cell_fraction(x, y, z, resolution);
                            let dist = cell_distance(cell, *center, resolution);
                            grid[(z * ny + y) * nx + x] =
                                amplitude * (-dist * dist / (2.0 * sigma_sq)).exp();
                        }
                    }
                }
                grid
            }
            DensityPattern::Noise { amplitude, seed } => {
                let mut rng = StdRng::seed_from_u64(*seed);
                (0..size).map(|_| amplitude * rng.r#gen::<f32>()).collect()
            }
        }
    }

    /// Load a scene from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}
