//! Body forces.

use rayon::prelude::*;

use super::{Field, Grid, MacVelocity, fluid_weight};

/// Whether either cell beside `face` is an obstacle. Cells outside the
/// domain do not count.
#[inline]
fn touches_solid(mask: &[f32], grid: &Grid, axis: usize, face: [usize; 3]) -> bool {
    let upper = (face[axis] < grid.resolution()[axis]).then_some(face);
    let lower = face[axis].checked_sub(1).map(|l| {
        let mut cell = face;
        cell[axis] = l;
        cell
    });
    [lower, upper]
        .into_iter()
        .flatten()
        .any(|cell| fluid_weight(mask, grid.cell_index(cell)) <= 0.0)
}

/// Add `gravity * dt` to each velocity face that does not touch an obstacle.
///
/// Domain-edge faces still receive the force; extrapolation applies the
/// boundary condition to them afterwards.
pub fn apply_body_force(
    velocity: &mut MacVelocity,
    obstacles: &Field,
    grid: &Grid,
    gravity: [f32; 3],
    dt: f32,
) {
    let mask = obstacles.as_slice();
    for (axis, component) in velocity.components_mut().iter_mut().enumerate() {
        let delta = gravity[axis] * dt;
        if delta == 0.0 {
            continue;
        }
        let layout = component.layout();
        component
            .as_mut_slice()
            .par_iter_mut()
            .enumerate()
            .filter(|(idx, _)| !touches_solid(mask, grid, axis, layout.coords(*idx)))
            .for_each(|(_, v)| *v += delta);
    }
}
