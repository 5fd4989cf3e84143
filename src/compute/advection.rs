//! Semi-Lagrangian advection.
//!
//! Each sample point traces back along the velocity, `p' = p - dt * u(p)`,
//! clamps `p'` into the region covered by the advected field, and reads the
//! field there. Kernels read one buffer and write another; the borrow rules
//! keep them from aliasing.

use rayon::prelude::*;

use super::{Field, Grid, MacVelocity, fluid_weight};

#[inline]
fn backtrace(field: &Field, velocity: &MacVelocity, pos: [f32; 3], dt: f32) -> [f32; 3] {
    let v = velocity.sample(pos);
    field.clamp_position(std::array::from_fn(|a| pos[a] - dt * v[a]))
}

/// Advect every velocity component along `src` itself, writing `dst`.
///
/// Faces are advected only when both adjacent cells are fluid; faces touching
/// a solid or the domain edge are copied.
pub fn advect_velocity(
    src: &MacVelocity,
    dst: &mut MacVelocity,
    obstacles: &Field,
    grid: &Grid,
    dt: f32,
    interpolate: bool,
) {
    let mask = obstacles.as_slice();
    let n = grid.resolution();

    for (axis, out) in dst.components_mut().iter_mut().enumerate() {
        let component = src.component(axis);
        let layout = component.layout();
        let input = component.as_slice();

        out.as_mut_slice()
            .par_iter_mut()
            .enumerate()
            .for_each(|(idx, value)| {
                let face = layout.coords(idx);
                let interior = face[axis] > 0 && face[axis] < n[axis];
                let fluid = interior && {
                    let mut lower = face;
                    lower[axis] -= 1;
                    fluid_weight(mask, grid.cell_index(lower)) > 0.0
                        && fluid_weight(mask, grid.cell_index(face)) > 0.0
                };
                *value = if fluid {
                    let pos = layout.position(face);
                    component.sample(backtrace(component, src, pos, dt), interpolate)
                } else {
                    input[idx]
                };
            });
    }
}

/// Advect a cell-centered scalar along `velocity`, writing `dst`.
///
/// Solid cells are copied.
pub fn advect_scalar(
    src: &Field,
    dst: &mut Field,
    velocity: &MacVelocity,
    obstacles: &Field,
    dt: f32,
    interpolate: bool,
) {
    let mask = obstacles.as_slice();
    let layout = src.layout();
    let input = src.as_slice();

    dst.as_mut_slice()
        .par_iter_mut()
        .enumerate()
        .for_each(|(idx, value)| {
            *value = if fluid_weight(mask, idx) > 0.0 {
                let pos = layout.position(layout.coords(idx));
                src.sample(backtrace(src, velocity, pos, dt), interpolate)
            } else {
                input[idx]
            };
        });
}
