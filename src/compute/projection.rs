//! Pressure projection - Red-black over-relaxed Gauss-Seidel.
//!
//! Each physical iteration is split into two colour passes over a checkerboard
//! partition of the cells. Cells of one colour never share a face, so a pass
//! can update all of its cells concurrently:
//!
//! 1. every active cell computes its correction from the current face
//!    velocities and writes it into a per-cell scratch buffer;
//! 2. every face applies the corrections of its (at most two) adjacent cells.
//!
//! Only one side of any face can be active in a given pass, so stage 2 gives
//! exactly the result of a sequential sweep over the active cells.
//!
//! Pass `p` updates the cells with `(x + y + z + p) mod 2 == 0`.

use rayon::prelude::*;

use super::{Field, Grid, MacVelocity, Side};

/// Parameters of one projection solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionSettings {
    /// Physical iterations; the solver runs twice as many colour passes.
    pub iterations: u32,
    /// Overrelaxation factor, in (0, 2).
    pub overrelaxation: f32,
    /// Factor converting a velocity correction to pressure (`rho * h / dt`).
    pub pressure_scale: f32,
}

impl ProjectionSettings {
    pub fn new(iterations: u32, overrelaxation: f32) -> Self {
        Self {
            iterations,
            overrelaxation,
            pressure_scale: 0.0,
        }
    }

    /// Accumulate pressure for the given fluid density, spacing and time step.
    pub fn with_pressure(mut self, fluid_density: f32, h: f32, dt: f32) -> Self {
        self.pressure_scale = if dt > 0.0 { fluid_density * h / dt } else { 0.0 };
        self
    }
}

/// Outcome of [`project`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProjectionReport {
    /// Colour passes run.
    pub passes: u32,
    /// Largest absolute correction applied by the final pass.
    pub last_correction: f32,
}

/// Fluid weight of a cell: 1 for fluid, 0 for solid.
#[inline]
pub fn fluid_weight(mask: &[f32], idx: usize) -> f32 {
    mask[idx].clamp(0.0, 1.0)
}

/// Whether `cell` is updated during colour pass `pass`.
#[inline]
pub fn is_active(cell: [usize; 3], pass: u32) -> bool {
    (Grid::colour(cell) + pass as usize) % 2 == 0
}

/// Net outward face velocity of a cell (divergence times `h`).
#[inline]
fn cell_flux(velocity: &MacVelocity, cell: [usize; 3]) -> f32 {
    velocity
        .components()
        .iter()
        .enumerate()
        .map(|(axis, component)| {
            let mut upper = cell;
            upper[axis] += 1;
            component.get(upper) - component.get(cell)
        })
        .sum()
}

/// Sum of neighbor fluid weights. Out-of-domain neighbors count as solid.
#[inline]
fn neighbor_weight(grid: &Grid, mask: &[f32], cell: [usize; 3]) -> f32 {
    let mut s = 0.0;
    for axis in 0..grid.dims() {
        for side in [Side::Lower, Side::Upper] {
            if let Some(n) = grid.neighbor(cell, axis, side) {
                s += fluid_weight(mask, grid.cell_index(n));
            }
        }
    }
    s
}

/// Divergence of a single cell.
#[inline]
pub fn divergence(velocity: &MacVelocity, grid: &Grid, cell: [usize; 3]) -> f32 {
    cell_flux(velocity, cell) / grid.h
}

/// Divergence of every cell, zero for solids.
fn fluid_divergence<'a>(
    velocity: &'a MacVelocity,
    obstacles: &'a Field,
    grid: &'a Grid,
) -> impl ParallelIterator<Item = f32> + 'a {
    let mask = obstacles.as_slice();
    (0..grid.cell_count()).into_par_iter().map(move |idx| {
        if fluid_weight(mask, idx) <= 0.0 {
            0.0
        } else {
            divergence(velocity, grid, grid.cell_coords(idx))
        }
    })
}

/// L2 norm of the divergence over fluid cells.
pub fn divergence_norm(velocity: &MacVelocity, obstacles: &Field, grid: &Grid) -> f32 {
    fluid_divergence(velocity, obstacles, grid)
        .map(|d| d * d)
        .sum::<f32>()
        .sqrt()
}

/// Largest absolute divergence over fluid cells.
pub fn max_divergence(velocity: &MacVelocity, obstacles: &Field, grid: &Grid) -> f32 {
    fluid_divergence(velocity, obstacles, grid)
        .map(f32::abs)
        .reduce(|| 0.0, f32::max)
}

/// Run one colour pass and return the largest absolute correction.
///
/// `correction` is per-cell scratch of length `grid.cell_count()`; its
/// previous contents are ignored.
pub fn colour_pass(
    velocity: &mut MacVelocity,
    obstacles: &Field,
    pressure: &mut Field,
    correction: &mut [f32],
    grid: &Grid,
    settings: &ProjectionSettings,
    pass: u32,
) -> f32 {
    let mask = obstacles.as_slice();
    let omega = settings.overrelaxation;
    let scale = settings.pressure_scale;

    // Stage 1: corrections of the active colour
    let current: &MacVelocity = velocity;
    let max_correction = correction
        .par_iter_mut()
        .zip(pressure.as_mut_slice().par_iter_mut())
        .enumerate()
        .map(|(idx, (p, cell_pressure))| {
            *p = 0.0;
            let cell = grid.cell_coords(idx);
            if !is_active(cell, pass) || fluid_weight(mask, idx) <= 0.0 {
                return 0.0;
            }
            let s = neighbor_weight(grid, mask, cell);
            if s <= 0.0 {
                return 0.0;
            }
            let c = -omega * cell_flux(current, cell) / s;
            *p = c;
            *cell_pressure += scale * c;
            c.abs()
        })
        .reduce(|| 0.0, f32::max);

    // Stage 2: faces pull the corrections of their two cells
    let correction: &[f32] = correction;
    let resolution = grid.resolution();
    for (axis, component) in velocity.components_mut().iter_mut().enumerate() {
        let layout = component.layout();
        component
            .as_mut_slice()
            .par_iter_mut()
            .enumerate()
            .for_each(|(idx, value)| {
                let face = layout.coords(idx);
                let (w_lower, p_lower) = if face[axis] > 0 {
                    let mut lower = face;
                    lower[axis] -= 1;
                    let i = grid.cell_index(lower);
                    (fluid_weight(mask, i), correction[i])
                } else {
                    (0.0, 0.0)
                };
                let (w_upper, p_upper) = if face[axis] < resolution[axis] {
                    let i = grid.cell_index(face);
                    (fluid_weight(mask, i), correction[i])
                } else {
                    (0.0, 0.0)
                };
                *value += w_upper * p_lower - w_lower * p_upper;
            });
    }

    max_correction
}

/// Drive `velocity` toward zero divergence with `2 * iterations` colour passes.
pub fn project(
    velocity: &mut MacVelocity,
    obstacles: &Field,
    pressure: &mut Field,
    correction: &mut [f32],
    grid: &Grid,
    settings: &ProjectionSettings,
) -> ProjectionReport {
    let passes = settings.iterations.saturating_mul(2);
    let mut last_correction = 0.0;
    for pass in 0..passes {
        last_correction = colour_pass(
            velocity, obstacles, pressure, correction, grid, settings, pass,
        );
    }
    ProjectionReport {
        passes,
        last_correction,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Deterministic field with zero normal velocity on the domain edges.
    fn wavy_velocity(grid: &Grid) -> MacVelocity {
        let n = grid.resolution();
        let mut velocity = MacVelocity::new(grid);
        for (axis, component) in velocity.components_mut().iter_mut().enumerate() {
            for idx in 0..component.len() {
                let [x, y, z] = component.coords(idx);
                let c = [x, y, z];
                if c[axis] == 0 || c[axis] == n[axis] {
                    continue;
                }
                let (x, y, z) = (x as f32, y as f32, z as f32);
                let value = if grid.is_3d() {
                    (0.7 * x + 1.3 * y - 0.4 * z + axis as f32).sin()
                } else if axis == 0 {
                    (0.9 * x + 1.7 * y).sin()
                } else {
                    (1.1 * x - 0.6 * y).cos()
                };
                component.as_mut_slice()[idx] = value;
            }
        }
        velocity
    }

    struct Setup {
        grid: Grid,
        velocity: MacVelocity,
        obstacles: Field,
        pressure: Field,
        correction: Vec<f32>,
    }

    impl Setup {
        fn new(grid: Grid, velocity: MacVelocity) -> Self {
            Self {
                velocity,
                obstacles: Field::cell_centered(&grid, 1.0),
                pressure: Field::cell_centered(&grid, 0.0),
                correction: vec![0.0; grid.cell_count()],
                grid,
            }
        }

        fn iterate(&mut self, iterations: u32, omega: f32) -> ProjectionReport {
            project(
                &mut self.velocity,
                &self.obstacles,
                &mut self.pressure,
                &mut self.correction,
                &self.grid,
                &ProjectionSettings::new(iterations, omega),
            )
        }

        fn pass(&mut self, pass: u32, omega: f32) -> f32 {
            colour_pass(
                &mut self.velocity,
                &self.obstacles,
                &mut self.pressure,
                &mut self.correction,
                &self.grid,
                &ProjectionSettings::new(1, omega),
                pass,
            )
        }

        fn norm(&self) -> f32 {
            divergence_norm(&self.velocity, &self.obstacles, &self.grid)
        }
    }

    fn grid_8x8() -> Grid {
        Grid::new([8, 8, 1], 1.0).unwrap()
    }

    #[test]
    fn test_parity_rule() {
        assert!(is_active([0, 0, 0], 0));
        assert!(!is_active([0, 0, 0], 1));
        assert!(is_active([1, 0, 0], 1));
        assert!(is_active([1, 1, 1], 1));
        assert!(is_active([2, 1, 1], 0));
    }

    #[test]
    fn test_divergence_decreases_each_iteration() {
        for omega in [1.0, 1.3, 1.5, 1.7] {
            let grid = grid_8x8();
            let mut setup = Setup::new(grid, wavy_velocity(&grid));
            let mut previous = setup.norm();
            assert!((previous - 7.157).abs() < 1e-2);
            for iteration in 0..10 {
                setup.iterate(1, omega);
                let norm = setup.norm();
                assert!(
                    norm < previous,
                    "omega {omega}, iteration {iteration}: {norm} >= {previous}"
                );
                previous = norm;
            }
        }
    }

    #[test]
    fn test_high_overrelaxation_converges_in_aggregate() {
        let grid = grid_8x8();
        let mut setup = Setup::new(grid, wavy_velocity(&grid));
        let h0 = setup.norm();
        setup.iterate(10, 1.9);
        let h10 = setup.norm();
        setup.iterate(10, 1.9);
        let h20 = setup.norm();
        setup.iterate(20, 1.9);
        let h40 = setup.norm();
        assert!(h10 < h0);
        assert!(h20 < h10);
        assert!(h40 < h20);
        assert!(h40 < 0.05 * h0);
    }

    #[test]
    fn test_diminishing_correction() {
        let grid = grid_8x8();
        let mut setup = Setup::new(grid, wavy_velocity(&grid));
        setup.iterate(28, 1.0);
        let deltas: Vec<f32> = (0..8).map(|p| setup.pass(p % 2, 1.0)).collect();
        for pair in deltas.windows(2) {
            assert!(pair[1] < pair[0], "{deltas:?}");
        }
    }

    #[test]
    fn test_zero_iterations_is_noop() {
        let grid = grid_8x8();
        let mut setup = Setup::new(grid, wavy_velocity(&grid));
        let before = setup.velocity.clone();
        let report = setup.iterate(0, 1.9);
        assert_eq!(report.passes, 0);
        assert_eq!(setup.velocity, before);
        assert!(setup.pressure.as_slice().iter().all(|&p| p == 0.0));
    }

    #[test]
    fn test_pass_count() {
        let grid = grid_8x8();
        let mut setup = Setup::new(grid, wavy_velocity(&grid));
        assert_eq!(setup.iterate(20, 1.9).passes, 40);
    }

    #[test]
    fn test_single_pass_zeroes_active_cells() {
        // With omega = 1 each active cell is made exactly divergence-free
        let grid = grid_8x8();
        let mut setup = Setup::new(grid, wavy_velocity(&grid));
        setup.pass(0, 1.0);
        for idx in 0..grid.cell_count() {
            let cell = grid.cell_coords(idx);
            if is_active(cell, 0) {
                assert!(divergence(&setup.velocity, &grid, cell).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_enclosed_cell_unchanged() {
        let grid = Grid::new([5, 5, 1], 1.0).unwrap();
        let mut setup = Setup::new(grid, wavy_velocity(&grid));
        // Fluid cell (2, 2) surrounded by solids
        for cell in [[1, 2, 0], [3, 2, 0], [2, 1, 0], [2, 3, 0]] {
            setup.obstacles.set(cell, 0.0);
        }
        let before = setup.velocity.clone();
        let flux_before = divergence(&before, &grid, [2, 2, 0]);
        setup.iterate(10, 1.9);

        assert_eq!(divergence(&setup.velocity, &grid, [2, 2, 0]), flux_before);
        assert_eq!(setup.pressure.get([2, 2, 0]), 0.0);
        for axis in 0..2 {
            let mut upper = [2, 2, 0];
            upper[axis] += 1;
            let c = setup.velocity.component(axis);
            assert_eq!(c.get([2, 2, 0]), before.component(axis).get([2, 2, 0]));
            assert_eq!(c.get(upper), before.component(axis).get(upper));
        }
    }

    #[test]
    fn test_solid_faces_never_change() {
        let grid = grid_8x8();
        let mut setup = Setup::new(grid, wavy_velocity(&grid));
        setup.obstacles.set([3, 4, 0], 0.0);
        let before = setup.velocity.clone();
        setup.iterate(20, 1.7);
        for axis in 0..2 {
            let mut upper = [3, 4, 0];
            upper[axis] += 1;
            let c = setup.velocity.component(axis);
            assert_eq!(c.get([3, 4, 0]), before.component(axis).get([3, 4, 0]));
            assert_eq!(c.get(upper), before.component(axis).get(upper));
        }
        assert_eq!(setup.pressure.get([3, 4, 0]), 0.0);
    }

    #[test]
    fn test_domain_edges_untouched() {
        let grid = grid_8x8();
        let mut setup = Setup::new(grid, wavy_velocity(&grid));
        setup.velocity.component_mut(0).set([0, 3, 0], 0.75);
        setup.iterate(5, 1.5);
        assert_eq!(setup.velocity.component(0).get([0, 3, 0]), 0.75);
        assert_eq!(setup.velocity.component(1).get([2, 8, 0]), 0.0);
    }

    #[test]
    fn test_pressure_accumulates_correction() {
        let grid = grid_8x8();
        let mut setup = Setup::new(grid, wavy_velocity(&grid));
        let settings = ProjectionSettings::new(1, 1.0).with_pressure(1.0, 1.0, 0.5);
        assert_eq!(settings.pressure_scale, 2.0);

        let flux = divergence(&setup.velocity, &grid, [1, 1, 0]);
        colour_pass(
            &mut setup.velocity,
            &setup.obstacles,
            &mut setup.pressure,
            &mut setup.correction,
            &grid,
            &settings,
            0,
        );
        // Interior cell: four fluid neighbors
        let expected = 2.0 * -flux / 4.0;
        assert!((setup.pressure.get([1, 1, 0]) - expected).abs() < 1e-5);
        // Inactive colour untouched
        assert_eq!(setup.pressure.get([1, 0, 0]), 0.0);
    }

    #[test]
    fn test_converges_in_3d() {
        let grid = Grid::new([4, 4, 4], 1.0).unwrap();
        let mut setup = Setup::new(grid, wavy_velocity(&grid));
        let h0 = setup.norm();
        setup.iterate(10, 1.5);
        assert!(setup.norm() < 0.05 * h0);
    }

    #[test]
    fn test_scales_with_spacing() {
        let grid = Grid::new([8, 8, 1], 0.5).unwrap();
        let velocity = wavy_velocity(&grid);
        let cell = [3, 2, 0];
        let flux = cell_flux(&velocity, cell);
        assert!((divergence(&velocity, &grid, cell) - flux * 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_correction_independent_of_spacing() {
        // Correction works on face flux, so divergence = flux / h never enters it
        for h in [1.0, 1.1, 2.5] {
            let grid = Grid::new([8, 8, 1], h).unwrap();
            let mut setup = Setup::new(grid, wavy_velocity(&grid));
            let cell = [3, 3, 0];
            let flux = cell_flux(&setup.velocity, cell);
            assert!((divergence(&setup.velocity, &grid, cell) * h - flux).abs() < 1e-5);

            let largest = setup.pass(0, 1.5);
            let c = setup.correction[grid.cell_index(cell)];
            assert!((c - (-1.5 * flux / 4.0)).abs() < 1e-6, "h = {h}: {c}");
            assert!(largest >= c.abs());
            // An edge cell has three fluid neighbors
            let edge = [2, 0, 0];
            let edge_flux = cell_flux(&wavy_velocity(&grid), edge);
            let c = setup.correction[grid.cell_index(edge)];
            assert!((c - (-1.5 * edge_flux / 3.0)).abs() < 1e-6, "h = {h}: {c}");
        }
    }

    #[test]
    fn test_divergence_measures_skip_solids() {
        let grid = Grid::new([4, 4, 1], 0.5).unwrap();
        let mut velocity = MacVelocity::new(&grid);
        // Flow from (1, 1) into (2, 1)
        velocity.component_mut(0).set([2, 1, 0], 1.0);
        let mut obstacles = Field::cell_centered(&grid, 1.0);

        assert!((divergence_norm(&velocity, &obstacles, &grid) - 8.0f32.sqrt()).abs() < 1e-5);
        assert_eq!(max_divergence(&velocity, &obstacles, &grid), 2.0);

        obstacles.set([1, 1, 0], 0.0);
        assert!((divergence_norm(&velocity, &obstacles, &grid) - 2.0).abs() < 1e-5);
        assert_eq!(max_divergence(&velocity, &obstacles, &grid), 2.0);

        obstacles.set([2, 1, 0], 0.0);
        assert_eq!(divergence_norm(&velocity, &obstacles, &grid), 0.0);
        assert_eq!(max_divergence(&velocity, &obstacles, &grid), 0.0);
    }

    fn random_velocity(grid: &Grid, values: &[f32]) -> MacVelocity {
        let n = grid.resolution();
        let mut velocity = MacVelocity::new(grid);
        let mut source = values.iter().cycle();
        for (axis, component) in velocity.components_mut().iter_mut().enumerate() {
            for idx in 0..component.len() {
                let c = component.coords(idx);
                let value = source.next().copied().unwrap_or(0.0);
                if c[axis] != 0 && c[axis] != n[axis] {
                    component.as_mut_slice()[idx] = value;
                }
            }
        }
        velocity
    }

    proptest! {
        #[test]
        fn prop_projection_reduces_divergence(
            nx in 3usize..10,
            ny in 3usize..10,
            omega in 1.0f32..1.9,
            values in prop::collection::vec(-1.0f32..1.0, 220),
        ) {
            let grid = Grid::new([nx, ny, 1], 1.0).unwrap();
            let mut setup = Setup::new(grid, random_velocity(&grid, &values));
            let h0 = setup.norm();
            prop_assume!(h0 > 1e-3);

            setup.iterate(10, omega);
            let h10 = setup.norm();
            setup.iterate(30, omega);
            let h40 = setup.norm();

            prop_assert!(h10 < h0, "h10 {} >= h0 {}", h10, h0);
            prop_assert!(h40 < 0.25 * h0, "h40 {} >= h0 / 4 ({})", h40, h0);
        }
    }
}
