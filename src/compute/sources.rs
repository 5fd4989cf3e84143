//! Density and velocity sources injected at the start of a frame.

use rayon::prelude::*;

use super::{Grid, SmokeFields};
use crate::schema::Emitter;

/// Emitter resolved to world coordinates.
#[derive(Debug, Clone, Copy)]
struct Source {
    center: [f32; 3],
    radius_sq: f32,
    density: f32,
    velocity: Option<[f32; 3]>,
}

impl Source {
    fn resolve(emitter: &Emitter, grid: &Grid) -> Self {
        let extent = grid.extent();
        let min_extent = extent[..grid.dims()]
            .iter()
            .copied()
            .fold(f32::INFINITY, f32::min);
        let radius = emitter.radius * min_extent;
        Self {
            center: std::array::from_fn(|a| emitter.center[a] * extent[a]),
            radius_sq: radius * radius,
            density: emitter.density,
            velocity: emitter.velocity,
        }
    }

    #[inline]
    fn covers(&self, pos: [f32; 3], dims: usize) -> bool {
        let dist_sq: f32 = (0..dims).map(|a| (pos[a] - self.center[a]).powi(2)).sum();
        dist_sq <= self.radius_sq
    }
}

/// Write emitter density into covered fluid cells and emitter velocity into
/// covered faces.
///
/// Density never decreases: covered cells get `max(density, emitter.density)`.
/// Solid cells are skipped.
pub fn inject_sources(fields: &mut SmokeFields, emitters: &[Emitter]) {
    if emitters.is_empty() {
        return;
    }

    let grid = *fields.grid();
    let dims = grid.dims();
    let sources: Vec<Source> = emitters.iter().map(|e| Source::resolve(e, &grid)).collect();

    {
        let (density, _, obstacles) = fields.density_pass();
        let mask = obstacles.as_slice();
        let layout = density.current().layout();
        density
            .current_mut()
            .as_mut_slice()
            .par_iter_mut()
            .enumerate()
            .for_each(|(idx, d)| {
                if mask[idx] <= 0.0 {
                    return;
                }
                let pos = layout.position(layout.coords(idx));
                for source in sources.iter().filter(|s| s.covers(pos, dims)) {
                    *d = d.max(source.density);
                }
            });
    }

    if sources.iter().all(|s| s.velocity.is_none()) {
        return;
    }

    for (axis, component) in fields.velocity_mut().components_mut().iter_mut().enumerate() {
        let layout = component.layout();
        component
            .as_mut_slice()
            .par_iter_mut()
            .enumerate()
            .for_each(|(idx, v)| {
                let pos = layout.position(layout.coords(idx));
                for source in &sources {
                    if let Some(velocity) = source.velocity.filter(|_| source.covers(pos, dims)) {
                        *v = velocity[axis];
                    }
                }
            });
    }
}
