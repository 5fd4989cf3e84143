//! Grid geometry - Resolution, spacing and cell addressing.
//!
//! Cells are stored row-major with x fastest: `index = (z * ny + y) * nx + x`.
//! A 2D grid is a grid with `nz = 1`; its z axis never takes part in
//! neighbour lookups, colouring of passes, or velocity components.

use crate::schema::ConfigError;

/// Side of a cell along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Lower,
    Upper,
}

/// Fixed-resolution uniform grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    /// Cells along x.
    pub nx: usize,
    /// Cells along y.
    pub ny: usize,
    /// Cells along z (1 for 2D).
    pub nz: usize,
    /// Cell spacing.
    pub h: f32,
}

impl Grid {
    /// Create a grid, rejecting empty resolutions and non-positive spacing.
    pub fn new(resolution: [usize; 3], h: f32) -> Result<Self, ConfigError> {
        if resolution.contains(&0) {
            return Err(ConfigError::InvalidDimensions);
        }
        if !h.is_finite() || h <= 0.0 {
            return Err(ConfigError::InvalidSpacing(h));
        }
        Ok(Self {
            nx: resolution[0],
            ny: resolution[1],
            nz: resolution[2],
            h,
        })
    }

    /// Resolution as `[nx, ny, nz]`.
    #[inline]
    pub fn resolution(&self) -> [usize; 3] {
        [self.nx, self.ny, self.nz]
    }

    /// Check if this is a 3D grid.
    #[inline]
    pub fn is_3d(&self) -> bool {
        self.nz > 1
    }

    /// Number of active axes (2 or 3).
    #[inline]
    pub fn dims(&self) -> usize {
        if self.is_3d() { 3 } else { 2 }
    }

    /// Total number of cells.
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.nx * self.ny * self.nz
    }

    /// Physical size of the domain along each axis.
    #[inline]
    pub fn extent(&self) -> [f32; 3] {
        [
            self.nx as f32 * self.h,
            self.ny as f32 * self.h,
            self.nz as f32 * self.h,
        ]
    }

    /// Convert cell coordinates to a flat index.
    #[inline]
    pub fn cell_index(&self, cell: [usize; 3]) -> usize {
        (cell[2] * self.ny + cell[1]) * self.nx + cell[0]
    }

    /// Convert a flat index to cell coordinates.
    #[inline]
    pub fn cell_coords(&self, idx: usize) -> [usize; 3] {
        let x = idx % self.nx;
        let y = (idx / self.nx) % self.ny;
        let z = idx / (self.nx * self.ny);
        [x, y, z]
    }

    /// Checkerboard colour of a cell: 0 or 1.
    #[inline]
    pub fn colour(cell: [usize; 3]) -> usize {
        (cell[0] + cell[1] + cell[2]) % 2
    }

    /// Neighbouring cell across the given side, if it lies inside the domain.
    #[inline]
    pub fn neighbor(&self, cell: [usize; 3], axis: usize, side: Side) -> Option<[usize; 3]> {
        if axis >= self.dims() {
            return None;
        }
        let n = self.resolution()[axis];
        let mut out = cell;
        match side {
            Side::Lower => {
                if cell[axis] == 0 {
                    return None;
                }
                out[axis] -= 1;
            }
            Side::Upper => {
                if cell[axis] + 1 >= n {
                    return None;
                }
                out[axis] += 1;
            }
        }
        Some(out)
    }

    /// World-space position of a cell center.
    #[inline]
    pub fn cell_center(&self, cell: [usize; 3]) -> [f32; 3] {
        [
            (cell[0] as f32 + 0.5) * self.h,
            (cell[1] as f32 + 0.5) * self.h,
            (cell[2] as f32 + 0.5) * self.h,
        ]
    }
}
