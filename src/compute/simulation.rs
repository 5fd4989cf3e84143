//! Smoke simulation - Per-frame kernel sequence and buffer lifecycle.

use super::{
    Field, Grid, MacVelocity, ProjectionReport, ProjectionSettings, SmokeFields, advect_scalar,
    advect_velocity, apply_body_force, extrapolate, inject_sources, max_divergence, project,
};
use crate::schema::{ConfigError, Controller, DEFAULT_PRESSURE, FieldName, Scene, SmokeParams};

/// Read access to one named buffer.
#[derive(Debug, Clone, Copy)]
pub enum FieldView<'a> {
    Scalar(&'a Field),
    Vector(&'a MacVelocity),
}

/// Summary of one stepped frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    /// Time step used.
    pub dt: f32,
    pub projection: ProjectionReport,
    /// Largest fluid-cell divergence right after projection.
    pub residual: f32,
}

/// What [`SmokeSimulation::step`] did with a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameOutcome {
    Stepped(FrameReport),
    /// The frame was spent reinitializing the fields.
    Reset,
}

/// Grid-based incompressible smoke solver.
///
/// Owns every buffer; receives a fresh [`SmokeParams`] each frame.
#[derive(Debug, Clone)]
pub struct SmokeSimulation {
    scene: Scene,
    fields: SmokeFields,
    visualize: FieldName,
    frame: u64,
    time: f32,
}

impl SmokeSimulation {
    /// Validate `params` and allocate buffers for its grid.
    pub fn new(params: &SmokeParams, scene: Scene) -> Result<Self, ConfigError> {
        params.validate()?;
        let grid = Grid::new(params.resolution, params.spacing)?;
        log::info!(
            "Allocating {}x{}x{} smoke grid (h = {})",
            grid.nx,
            grid.ny,
            grid.nz,
            grid.h
        );
        Ok(Self {
            fields: SmokeFields::new(grid, &scene),
            scene,
            visualize: params.visualize,
            frame: 0,
            time: 0.0,
        })
    }

    /// Advance one frame.
    ///
    /// Order: sources, forces, projection, extrapolation, velocity advection,
    /// density advection. A pending reset request replaces the whole frame
    /// and is cleared in `params`.
    pub fn step(
        &mut self,
        params: &mut SmokeParams,
        frame_dt: f32,
    ) -> Result<FrameOutcome, ConfigError> {
        params.validate()?;
        let dt = params.dt(frame_dt);
        if !dt.is_finite() || dt < 0.0 {
            return Err(ConfigError::InvalidTimeStep(dt));
        }
        self.ensure_grid(params)?;
        self.visualize = params.visualize;

        if params.reset {
            self.reset();
            params.reset = false;
            return Ok(FrameOutcome::Reset);
        }

        let grid = *self.fields.grid();

        inject_sources(&mut self.fields, &params.emitters);
        if !params.warm_start_pressure {
            self.fields.pressure_mut().fill(DEFAULT_PRESSURE);
        }

        let settings = ProjectionSettings::new(params.iterations, params.overrelaxation)
            .with_pressure(params.fluid_density, grid.h, dt);
        let (velocity, obstacles, pressure, correction) = self.fields.projection_buffers();
        apply_body_force(velocity, obstacles, &grid, params.gravity, dt);
        let projection = project(velocity, obstacles, pressure, correction, &grid, &settings);
        let residual = max_divergence(velocity, obstacles, &grid);

        {
            let (buffers, obstacles) = self.fields.velocity_pass();
            let (src, dst) = buffers.split();
            extrapolate(src, dst, obstacles, &grid, &params.boundaries);
            buffers.swap();

            let (src, dst) = buffers.split();
            advect_velocity(src, dst, obstacles, &grid, dt, params.interpolate);
            buffers.swap();
        }

        {
            // Density follows this frame's velocity before self-advection
            let (density, velocity, obstacles) = self.fields.density_pass();
            let (src, dst) = density.split();
            advect_scalar(src, dst, velocity.previous(), obstacles, dt, params.interpolate);
            density.swap();
        }

        self.frame += 1;
        self.time += dt;

        log::debug!(
            "Frame {}: dt = {:.4}, {} passes, last correction = {:.3e}, residual = {:.3e}",
            self.frame,
            dt,
            projection.passes,
            projection.last_correction,
            residual
        );

        Ok(FrameOutcome::Stepped(FrameReport {
            dt,
            projection,
            residual,
        }))
    }

    /// Update `controller`, then step with its parameters.
    pub fn run_frame<C: Controller + ?Sized>(
        &mut self,
        controller: &mut C,
        frame_dt: f32,
    ) -> Result<FrameOutcome, ConfigError> {
        controller.update(frame_dt);
        self.step(controller.parameters_mut(), frame_dt)
    }

    /// Reinitialize velocity, pressure and density. The obstacle mask is kept.
    pub fn reset(&mut self) {
        log::info!("Resetting simulation after {} frames", self.frame);
        self.fields.reset();
        self.frame = 0;
        self.time = 0.0;
    }

    /// Reallocate when the grid in `params` differs from the current one.
    fn ensure_grid(&mut self, params: &SmokeParams) -> Result<(), ConfigError> {
        let current = self.fields.grid();
        if current.resolution() == params.resolution && current.h == params.spacing {
            return Ok(());
        }
        let grid = Grid::new(params.resolution, params.spacing)?;
        log::info!(
            "Grid changed from {:?} (h = {}) to {:?} (h = {}), reallocating",
            current.resolution(),
            current.h,
            grid.resolution(),
            grid.h
        );
        self.fields = SmokeFields::new(grid, &self.scene);
        self.frame = 0;
        self.time = 0.0;
        Ok(())
    }

    /// Current buffer for `name`.
    pub fn field(&self, name: FieldName) -> FieldView<'_> {
        match name {
            FieldName::Velocity => FieldView::Vector(self.fields.velocity()),
            FieldName::Pressure => FieldView::Scalar(self.fields.pressure()),
            FieldName::Density => FieldView::Scalar(self.fields.density()),
            FieldName::Obstacles => FieldView::Scalar(self.fields.obstacles()),
        }
    }

    /// Field selected by the last parameter record.
    pub fn visualized(&self) -> FieldView<'_> {
        self.field(self.visualize)
    }

    /// Cell-centered image of a field in row-major order. Velocity renders
    /// as speed.
    pub fn render_scalar(&self, name: FieldName) -> Vec<f32> {
        match self.field(name) {
            FieldView::Scalar(field) => field.as_slice().to_vec(),
            FieldView::Vector(velocity) => {
                let grid = self.fields.grid();
                (0..grid.cell_count())
                    .map(|idx| {
                        let v = velocity.cell_velocity(grid.cell_coords(idx));
                        v.iter().map(|c| c * c).sum::<f32>().sqrt()
                    })
                    .collect()
            }
        }
    }

    #[inline]
    pub fn fields(&self) -> &SmokeFields {
        &self.fields
    }

    /// Mutable buffers. Edits must happen between frames.
    #[inline]
    pub fn fields_mut(&mut self) -> &mut SmokeFields {
        &mut self.fields
    }

    #[inline]
    pub fn grid(&self) -> &Grid {
        self.fields.grid()
    }

    #[inline]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Frames stepped since allocation or the last reset.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Simulated time since allocation or the last reset.
    #[inline]
    pub fn time(&self) -> f32 {
        self.time
    }
}
