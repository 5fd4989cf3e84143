//! Parameter sources driving the simulation frame by frame.

use super::SmokeParams;

/// Capability interface for whatever owns the parameters (GUI, script, tests).
///
/// The simulation never reads process-wide state: each frame it asks the
/// controller to update and then steps with the controller's parameters.
pub trait Controller {
    /// Advance the controller by the measured frame delta.
    fn update(&mut self, dt: f32);

    /// Current parameter record.
    fn parameters(&self) -> &SmokeParams;

    /// Mutable access, used to clear the edge-triggered reset flag.
    fn parameters_mut(&mut self) -> &mut SmokeParams;
}

/// A bare parameter record is a static controller.
impl Controller for SmokeParams {
    fn update(&mut self, _dt: f32) {}

    fn parameters(&self) -> &SmokeParams {
        self
    }

    fn parameters_mut(&mut self) -> &mut SmokeParams {
        self
    }
}

/// Controller that requests a reset at a fixed frame interval.
#[derive(Debug, Clone)]
pub struct ScriptedController {
    params: SmokeParams,
    reset_every: Option<u64>,
    frames: u64,
    elapsed: f32,
}

impl ScriptedController {
    pub fn new(params: SmokeParams) -> Self {
        Self {
            params,
            reset_every: None,
            frames: 0,
            elapsed: 0.0,
        }
    }

    /// Request a reset every `frames` frames (0 disables).
    pub fn with_reset_every(mut self, frames: u64) -> Self {
        self.reset_every = (frames > 0).then_some(frames);
        self
    }

    /// Request a reset on the next frame.
    pub fn request_reset(&mut self) {
        self.params.reset = true;
    }

    /// Frames seen so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Accumulated wall-clock time.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }
}

impl Controller for ScriptedController {
    fn update(&mut self, dt: f32) {
        self.frames += 1;
        self.elapsed += dt;
        if self.reset_every.is_some_and(|every| self.frames % every == 0) {
            self.params.reset = true;
        }
    }

    fn parameters(&self) -> &SmokeParams {
        &self.params
    }

    fn parameters_mut(&mut self) -> &mut SmokeParams {
        &mut self.params
    }
}
