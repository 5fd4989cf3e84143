//! Velocity extrapolation into solids and domain edges.
//!
//! Every face with `c[axis] < n[axis]` belongs to the cell with the same
//! coordinates (it is that cell's lower face). Faces of solid cells take the
//! matching face of the first fluid neighbor in the order
//! -x, +x, -y, +y, -z, +z. A fluid cell sitting on top of a solid (along the
//! face axis) copies its own upper face into the shared face. Faces on the
//! domain edge then follow the boundary condition of their axis.

use rayon::prelude::*;

use super::{Field, Grid, MacVelocity, Side, fluid_weight};
use crate::schema::{Boundaries, BoundaryCondition};

const SEARCH_ORDER: [(usize, Side); 6] = [
    (0, Side::Lower),
    (0, Side::Upper),
    (1, Side::Lower),
    (1, Side::Upper),
    (2, Side::Lower),
    (2, Side::Upper),
];

#[inline]
fn is_solid(mask: &[f32], grid: &Grid, cell: [usize; 3]) -> bool {
    fluid_weight(mask, grid.cell_index(cell)) <= 0.0
}

/// Face value after pulling from the fluid side when it borders a solid.
#[inline]
fn pulled(component: &Field, mask: &[f32], grid: &Grid, axis: usize, face: [usize; 3]) -> f32 {
    let n = grid.resolution();
    if face[axis] < n[axis] && is_solid(mask, grid, face) {
        return SEARCH_ORDER
            .iter()
            .filter_map(|&(a, side)| grid.neighbor(face, a, side))
            .find(|&neighbor| !is_solid(mask, grid, neighbor))
            .map_or_else(|| component.get(face), |neighbor| component.get(neighbor));
    }

    // Owner is fluid: a solid below it hands the face to the fluid side
    let solid_below = face[axis] > 0 && face[axis] < n[axis] && {
        let mut lower = face;
        lower[axis] -= 1;
        is_solid(mask, grid, lower)
    };
    if solid_below {
        let mut far = face;
        far[axis] += 1;
        return component.get(far);
    }
    component.get(face)
}

/// Copy valid velocity from `src` into solid and edge faces, writing every
/// face of `dst`. The caller swaps afterwards.
pub fn extrapolate(
    src: &MacVelocity,
    dst: &mut MacVelocity,
    obstacles: &Field,
    grid: &Grid,
    boundaries: &Boundaries,
) {
    let mask = obstacles.as_slice();
    let n = grid.resolution();

    for (axis, out) in dst.components_mut().iter_mut().enumerate() {
        let component = src.component(axis);
        let layout = component.layout();
        let condition = boundaries.axis(axis);
        let last = n[axis];

        out.as_mut_slice()
            .par_iter_mut()
            .enumerate()
            .for_each(|(idx, value)| {
                let face = layout.coords(idx);
                let on_edge = face[axis] == 0 || face[axis] == last;
                *value = if !on_edge {
                    pulled(component, mask, grid, axis, face)
                } else {
                    match condition {
                        BoundaryCondition::Wall => 0.0,
                        BoundaryCondition::Open => {
                            let mut inner = face;
                            inner[axis] = if face[axis] == 0 { 1.min(last) } else { last - 1 };
                            if inner[axis] == 0 || inner[axis] == last {
                                component.get(inner)
                            } else {
                                pulled(component, mask, grid, axis, inner)
                            }
                        }
                    }
                };
            });
    }
}
