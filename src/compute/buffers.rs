//! Simulation buffers - Double buffering and the complete field set.

use super::{Field, Grid, MacVelocity};
use crate::schema::{DEFAULT_PRESSURE, Scene};

/// A "current" and a "next" instance of the same buffer.
///
/// Kernels that cannot update in place read `current` and write `next`;
/// [`DoubleBuffer::swap`] then promotes `next`. After a swap the previous
/// contents stay readable through [`DoubleBuffer::previous`] until the next
/// kernel overwrites them.
#[derive(Debug, Clone)]
pub struct DoubleBuffer<T> {
    current: T,
    next: T,
}

impl<T: Clone> DoubleBuffer<T> {
    pub fn new(value: T) -> Self {
        Self {
            next: value.clone(),
            current: value,
        }
    }
}

impl<T> DoubleBuffer<T> {
    #[inline]
    pub fn current(&self) -> &T {
        &self.current
    }

    #[inline]
    pub fn current_mut(&mut self) -> &mut T {
        &mut self.current
    }

    #[inline]
    pub fn next_mut(&mut self) -> &mut T {
        &mut self.next
    }

    /// Contents of the buffer that was current before the last swap.
    #[inline]
    pub fn previous(&self) -> &T {
        &self.next
    }

    /// Read-only `current` with writable `next`.
    #[inline]
    pub fn split(&mut self) -> (&T, &mut T) {
        (&self.current, &mut self.next)
    }

    /// Promote `next` to `current` (no allocation, just pointer swap).
    #[inline]
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.current, &mut self.next);
    }

    /// Mutable access to both instances.
    #[inline]
    pub fn both_mut(&mut self) -> (&mut T, &mut T) {
        (&mut self.current, &mut self.next)
    }
}

/// Every buffer the solver owns, allocated once per grid resolution.
#[derive(Debug, Clone)]
pub struct SmokeFields {
    grid: Grid,
    velocity: DoubleBuffer<MacVelocity>,
    pressure: Field,
    obstacles: Field,
    density: DoubleBuffer<Field>,
    /// Per-cell correction scratch for the projection.
    correction: Vec<f32>,
    initial_density: Vec<f32>,
}

impl SmokeFields {
    /// Allocate all buffers for `grid` and apply the scene.
    pub fn new(grid: Grid, scene: &Scene) -> Self {
        let resolution = grid.resolution();
        let mut obstacles = Field::cell_centered(&grid, 1.0);
        obstacles
            .as_mut_slice()
            .copy_from_slice(&scene.obstacle_mask(resolution));

        let initial_density = scene.density(resolution);
        let mut density = Field::cell_centered(&grid, 0.0);
        density.as_mut_slice().copy_from_slice(&initial_density);

        Self {
            grid,
            velocity: DoubleBuffer::new(MacVelocity::new(&grid)),
            pressure: Field::cell_centered(&grid, DEFAULT_PRESSURE),
            obstacles,
            density: DoubleBuffer::new(density),
            correction: vec![0.0; grid.cell_count()],
            initial_density,
        }
    }

    /// Restore lifecycle defaults: zero velocity, default pressure and the
    /// initial density. The obstacle mask is left untouched.
    pub fn reset(&mut self) {
        let (current, next) = self.velocity.both_mut();
        current.fill(0.0);
        next.fill(0.0);

        self.pressure.fill(DEFAULT_PRESSURE);

        let (current, next) = self.density.both_mut();
        current.as_mut_slice().copy_from_slice(&self.initial_density);
        next.as_mut_slice().copy_from_slice(&self.initial_density);

        self.correction.fill(0.0);
    }

    #[inline]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Current velocity.
    #[inline]
    pub fn velocity(&self) -> &MacVelocity {
        self.velocity.current()
    }

    #[inline]
    pub fn velocity_mut(&mut self) -> &mut MacVelocity {
        self.velocity.current_mut()
    }

    #[inline]
    pub fn velocity_buffers(&mut self) -> &mut DoubleBuffer<MacVelocity> {
        &mut self.velocity
    }

    #[inline]
    pub fn pressure(&self) -> &Field {
        &self.pressure
    }

    #[inline]
    pub fn pressure_mut(&mut self) -> &mut Field {
        &mut self.pressure
    }

    #[inline]
    pub fn obstacles(&self) -> &Field {
        &self.obstacles
    }

    /// Edit the obstacle mask. Only valid between frames.
    #[inline]
    pub fn obstacles_mut(&mut self) -> &mut Field {
        &mut self.obstacles
    }

    /// Current density.
    #[inline]
    pub fn density(&self) -> &Field {
        self.density.current()
    }

    #[inline]
    pub fn density_mut(&mut self) -> &mut Field {
        self.density.current_mut()
    }

    /// Density as configured by the scene.
    #[inline]
    pub fn initial_density(&self) -> &[f32] {
        &self.initial_density
    }

    /// Borrow the buffers the projection needs at once.
    pub fn projection_buffers(&mut self) -> (&mut MacVelocity, &Field, &mut Field, &mut [f32]) {
        (
            self.velocity.current_mut(),
            &self.obstacles,
            &mut self.pressure,
            &mut self.correction,
        )
    }

    /// Borrow velocity buffers together with the read-only mask.
    pub fn velocity_pass(&mut self) -> (&mut DoubleBuffer<MacVelocity>, &Field) {
        (&mut self.velocity, &self.obstacles)
    }

    /// Borrow density buffers with the velocity and mask.
    pub fn density_pass(&mut self) -> (&mut DoubleBuffer<Field>, &DoubleBuffer<MacVelocity>, &Field) {
        (&mut self.density, &self.velocity, &self.obstacles)
    }
}
