//! Grid fields - Flat scalar arrays with cell-centered or staggered sampling.
//!
//! A field stores one value per sample point in row-major order (x fastest).
//! Cell-centered fields sample at `(i + 0.5) * h` on every axis. A field
//! staggered on axis `a` has one extra sample along `a` and samples at
//! `i * h` there (the cell faces), which gives the MAC layout used for
//! velocity: the x component has `(nx + 1) * ny * nz` samples, and so on.

use super::Grid;

/// Shape and sample placement of a field, detached from its data.
///
/// Parallel kernels capture this by value so they can map flat indices to
/// coordinates while the field's storage is mutably borrowed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldLayout {
    pub size: [usize; 3],
    pub offset: [f32; 3],
    pub h: f32,
}

impl FieldLayout {
    #[inline]
    pub fn index(&self, coords: [usize; 3]) -> usize {
        (coords[2] * self.size[1] + coords[1]) * self.size[0] + coords[0]
    }

    #[inline]
    pub fn coords(&self, idx: usize) -> [usize; 3] {
        let x = idx % self.size[0];
        let y = (idx / self.size[0]) % self.size[1];
        let z = idx / (self.size[0] * self.size[1]);
        [x, y, z]
    }

    /// World-space position of the sample at integer coordinates.
    #[inline]
    pub fn position(&self, coords: [usize; 3]) -> [f32; 3] {
        std::array::from_fn(|a| (coords[a] as f32 + self.offset[a]) * self.h)
    }
}

/// Scalar array over the grid with its own sample offset.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    data: Vec<f32>,
    size: [usize; 3],
    /// Sample offset in cells along each axis (0.5 = centered, 0.0 = on faces).
    offset: [f32; 3],
    h: f32,
}

impl Field {
    /// Create a cell-centered field filled with `value`.
    pub fn cell_centered(grid: &Grid, value: f32) -> Self {
        let size = grid.resolution();
        Self {
            data: vec![value; size.iter().product()],
            size,
            offset: [0.5; 3],
            h: grid.h,
        }
    }

    /// Create a field staggered (face-centered) along `axis`, filled with `value`.
    pub fn staggered(grid: &Grid, axis: usize, value: f32) -> Self {
        let mut size = grid.resolution();
        size[axis] += 1;
        let mut offset = [0.5; 3];
        offset[axis] = 0.0;
        Self {
            data: vec![value; size.iter().product()],
            size,
            offset,
            h: grid.h,
        }
    }

    /// Create a cell-centered field from existing values.
    ///
    /// Returns `None` if the length does not match the grid.
    pub fn from_values(grid: &Grid, values: Vec<f32>) -> Option<Self> {
        if values.len() != grid.cell_count() {
            return None;
        }
        Some(Self {
            data: values,
            size: grid.resolution(),
            offset: [0.5; 3],
            h: grid.h,
        })
    }

    /// Number of samples along each axis.
    #[inline]
    pub fn size(&self) -> [usize; 3] {
        self.size
    }

    /// Sample offset in cells along each axis.
    #[inline]
    pub fn offset(&self) -> [f32; 3] {
        self.offset
    }

    #[inline]
    pub fn layout(&self) -> FieldLayout {
        FieldLayout {
            size: self.size,
            offset: self.offset,
            h: self.h,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn fill(&mut self, value: f32) {
        self.data.fill(value);
    }

    /// Copy all values from another field of the same layout.
    pub fn copy_from(&mut self, other: &Field) {
        debug_assert_eq!(self.size, other.size);
        self.data.copy_from_slice(&other.data);
    }

    /// Flat index of the sample at integer coordinates.
    #[inline]
    pub fn index(&self, coords: [usize; 3]) -> usize {
        self.layout().index(coords)
    }

    /// Integer coordinates of a flat index.
    #[inline]
    pub fn coords(&self, idx: usize) -> [usize; 3] {
        self.layout().coords(idx)
    }

    #[inline]
    pub fn get(&self, coords: [usize; 3]) -> f32 {
        self.data[self.index(coords)]
    }

    #[inline]
    pub fn set(&mut self, coords: [usize; 3], value: f32) {
        let idx = self.index(coords);
        self.data[idx] = value;
    }

    /// World-space position of the sample at integer coordinates.
    #[inline]
    pub fn sample_position(&self, coords: [usize; 3]) -> [f32; 3] {
        self.layout().position(coords)
    }

    /// Clamp a world-space position into the region covered by this field's samples.
    #[inline]
    pub fn clamp_position(&self, pos: [f32; 3]) -> [f32; 3] {
        std::array::from_fn(|a| {
            let lo = self.offset[a] * self.h;
            let hi = ((self.size[a] - 1) as f32 + self.offset[a]) * self.h;
            pos[a].clamp(lo, hi)
        })
    }

    /// Lower sample, upper sample and weight along each axis. Positions outside
    /// the field clamp to the border samples.
    #[inline]
    fn locate(&self, pos: [f32; 3]) -> [(usize, usize, f32); 3] {
        std::array::from_fn(|a| {
            let last = self.size[a] - 1;
            let g = (pos[a] / self.h - self.offset[a]).clamp(0.0, last as f32);
            let i0 = (g.floor() as usize).min(last);
            let i1 = (i0 + 1).min(last);
            (i0, i1, g - i0 as f32)
        })
    }

    /// Bilinear (2D) or trilinear (3D) sample at a world-space position.
    pub fn sample_linear(&self, pos: [f32; 3]) -> f32 {
        let [(x0, x1, tx), (y0, y1, ty), (z0, z1, tz)] = self.locate(pos);

        let c00 = lerp(self.get([x0, y0, z0]), self.get([x1, y0, z0]), tx);
        let c10 = lerp(self.get([x0, y1, z0]), self.get([x1, y1, z0]), tx);
        let c0 = lerp(c00, c10, ty);

        if z0 == z1 {
            return c0;
        }

        let c01 = lerp(self.get([x0, y0, z1]), self.get([x1, y0, z1]), tx);
        let c11 = lerp(self.get([x0, y1, z1]), self.get([x1, y1, z1]), tx);
        let c1 = lerp(c01, c11, ty);

        lerp(c0, c1, tz)
    }

    /// Nearest-sample lookup at a world-space position.
    pub fn sample_nearest(&self, pos: [f32; 3]) -> f32 {
        let coords = std::array::from_fn(|a| {
            let last = self.size[a] - 1;
            let g = (pos[a] / self.h - self.offset[a]).clamp(0.0, last as f32);
            (g.round() as usize).min(last)
        });
        self.get(coords)
    }

    /// Sample with either interpolation mode.
    #[inline]
    pub fn sample(&self, pos: [f32; 3], interpolate: bool) -> f32 {
        if interpolate {
            self.sample_linear(pos)
        } else {
            self.sample_nearest(pos)
        }
    }

    pub fn sum(&self) -> f32 {
        self.data.iter().sum()
    }

    pub fn max_abs(&self) -> f32 {
        self.data.iter().fold(0.0f32, |m, v| m.max(v.abs()))
    }

    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Staggered (MAC) velocity: one face-centered field per active axis.
#[derive(Debug, Clone, PartialEq)]
pub struct MacVelocity {
    components: Vec<Field>,
}

impl MacVelocity {
    /// Zero velocity on the given grid.
    pub fn new(grid: &Grid) -> Self {
        Self {
            components: (0..grid.dims())
                .map(|axis| Field::staggered(grid, axis, 0.0))
                .collect(),
        }
    }

    /// Number of components (2 or 3).
    #[inline]
    pub fn dims(&self) -> usize {
        self.components.len()
    }

    #[inline]
    pub fn component(&self, axis: usize) -> &Field {
        &self.components[axis]
    }

    #[inline]
    pub fn component_mut(&mut self, axis: usize) -> &mut Field {
        &mut self.components[axis]
    }

    #[inline]
    pub fn components(&self) -> &[Field] {
        &self.components
    }

    #[inline]
    pub fn components_mut(&mut self) -> &mut [Field] {
        &mut self.components
    }

    pub fn fill(&mut self, value: f32) {
        for component in &mut self.components {
            component.fill(value);
        }
    }

    /// Interpolated velocity at a world-space position. Missing axes read 0.
    pub fn sample(&self, pos: [f32; 3]) -> [f32; 3] {
        let mut v = [0.0; 3];
        for (axis, component) in self.components.iter().enumerate() {
            v[axis] = component.sample_linear(pos);
        }
        v
    }

    /// Velocity at a cell center, averaging the two faces on each axis.
    pub fn cell_velocity(&self, cell: [usize; 3]) -> [f32; 3] {
        let mut v = [0.0; 3];
        for (axis, component) in self.components.iter().enumerate() {
            let mut upper = cell;
            upper[axis] += 1;
            v[axis] = 0.5 * (component.get(cell) + component.get(upper));
        }
        v
    }

    pub fn is_finite(&self) -> bool {
        self.components.iter().all(Field::is_finite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_2d(nx: usize, ny: usize) -> Grid {
        Grid::new([nx, ny, 1], 1.0).unwrap()
    }

    #[test]
    fn test_staggered_sizes() {
        let grid = Grid::new([4, 3, 2], 1.0).unwrap();
        let v = MacVelocity::new(&grid);
        assert_eq!(v.dims(), 3);
        assert_eq!(v.component(0).len(), 5 * 3 * 2);
        assert_eq!(v.component(1).len(), 4 * 4 * 2);
        assert_eq!(v.component(2).len(), 4 * 3 * 3);

        let v2 = MacVelocity::new(&grid_2d(4, 3));
        assert_eq!(v2.dims(), 2);
        assert_eq!(v2.component(0).size(), [5, 3, 1]);
        assert_eq!(v2.component(1).size(), [4, 4, 1]);
    }

    #[test]
    fn test_offsets() {
        let grid = grid_2d(4, 4);
        assert_eq!(Field::cell_centered(&grid, 0.0).offset(), [0.5, 0.5, 0.5]);
        assert_eq!(Field::staggered(&grid, 0, 0.0).offset(), [0.0, 0.5, 0.5]);
        assert_eq!(Field::staggered(&grid, 1, 0.0).offset(), [0.5, 0.0, 0.5]);
        assert_eq!(
            Field::staggered(&grid, 0, 0.0).sample_position([2, 1, 0]),
            [2.0, 1.5, 0.5]
        );
    }

    #[test]
    fn test_sample_at_sample_points_is_exact() {
        let grid = Grid::new([4, 3, 1], 0.5).unwrap();
        let mut field = Field::staggered(&grid, 0, 0.0);
        for idx in 0..field.len() {
            field.as_mut_slice()[idx] = idx as f32;
        }
        for idx in 0..field.len() {
            let pos = field.sample_position(field.coords(idx));
            assert!((field.sample_linear(pos) - idx as f32).abs() < 1e-5);
            assert_eq!(field.sample_nearest(pos), idx as f32);
        }
    }

    #[test]
    fn test_bilinear_midpoint() {
        let grid = grid_2d(2, 2);
        let mut field = Field::cell_centered(&grid, 0.0);
        field.set([0, 0, 0], 0.0);
        field.set([1, 0, 0], 1.0);
        field.set([0, 1, 0], 2.0);
        field.set([1, 1, 0], 3.0);
        // Midpoint between all four centers
        assert!((field.sample_linear([1.0, 1.0, 0.5]) - 1.5).abs() < 1e-6);
        assert!((field.sample_linear([1.0, 0.5, 0.5]) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_trilinear_linear_function_exact() {
        let grid = Grid::new([3, 3, 3], 1.0).unwrap();
        let mut field = Field::cell_centered(&grid, 0.0);
        for idx in 0..field.len() {
            let p = field.sample_position(field.coords(idx));
            field.as_mut_slice()[idx] = p[0] + 2.0 * p[1] - p[2];
        }
        let pos = [1.3, 1.9, 2.1];
        let expected = pos[0] + 2.0 * pos[1] - pos[2];
        assert!((field.sample_linear(pos) - expected).abs() < 1e-4);
    }

    #[test]
    fn test_sampling_clamps_outside() {
        let grid = grid_2d(3, 3);
        let mut field = Field::cell_centered(&grid, 0.0);
        field.set([0, 0, 0], 7.0);
        field.set([2, 2, 0], 9.0);
        assert_eq!(field.sample_linear([-10.0, -10.0, 0.5]), 7.0);
        assert_eq!(field.sample_linear([100.0, 100.0, 0.5]), 9.0);
        assert_eq!(field.sample_nearest([-1.0, -3.0, 0.0]), 7.0);
    }

    #[test]
    fn test_clamp_position_respects_inset() {
        let grid = grid_2d(4, 4);
        let centered = Field::cell_centered(&grid, 0.0);
        assert_eq!(centered.clamp_position([-1.0, 5.0, 0.0]), [0.5, 3.5, 0.5]);
        let u = Field::staggered(&grid, 0, 0.0);
        assert_eq!(u.clamp_position([-1.0, 5.0, 0.0]), [0.0, 3.5, 0.5]);
        assert_eq!(u.clamp_position([9.0, 0.0, 0.0]), [4.0, 0.5, 0.5]);
    }

    #[test]
    fn test_mac_sample_uniform_flow() {
        let grid = grid_2d(4, 4);
        let mut v = MacVelocity::new(&grid);
        v.component_mut(0).fill(2.0);
        v.component_mut(1).fill(-1.0);
        assert_eq!(v.sample([1.7, 2.2, 0.5]), [2.0, -1.0, 0.0]);
        assert_eq!(v.cell_velocity([1, 1, 0]), [2.0, -1.0, 0.0]);
    }

    #[test]
    fn test_from_values_checks_length() {
        let grid = grid_2d(2, 2);
        assert!(Field::from_values(&grid, vec![1.0; 4]).is_some());
        assert!(Field::from_values(&grid, vec![1.0; 5]).is_none());
    }
}
