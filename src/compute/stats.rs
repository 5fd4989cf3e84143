//! Field statistics for monitoring a running simulation.

use rayon::prelude::*;

use super::{SmokeSimulation, max_divergence};

/// Statistics about the current simulation state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationStats {
    pub frame: u64,
    pub time: f32,
    pub total_density: f32,
    /// Largest cell-centered speed.
    pub max_speed: f32,
    /// Largest absolute divergence over fluid cells.
    pub max_divergence: f32,
    pub mean_pressure: f32,
    /// Every buffer holds only finite values.
    pub finite: bool,
}

impl SimulationStats {
    /// Compute statistics from the simulation's current buffers.
    pub fn from_simulation(sim: &SmokeSimulation) -> Self {
        let fields = sim.fields();
        let grid = *fields.grid();
        let velocity = fields.velocity();

        let max_speed = (0..grid.cell_count())
            .into_par_iter()
            .map(|idx| {
                let v = velocity.cell_velocity(grid.cell_coords(idx));
                v.iter().map(|c| c * c).sum::<f32>().sqrt()
            })
            .reduce(|| 0.0, f32::max);

        let pressure = fields.pressure();
        let finite = velocity.is_finite() && pressure.is_finite() && fields.density().is_finite();
        if !finite {
            log::warn!("Non-finite values in simulation buffers at frame {}", sim.frame());
        }

        Self {
            frame: sim.frame(),
            time: sim.time(),
            total_density: fields.density().sum(),
            max_speed,
            max_divergence: max_divergence(velocity, fields.obstacles(), &grid),
            mean_pressure: pressure.sum() / pressure.len() as f32,
            finite,
        }
    }

    /// Whether the state should be reset: non-finite buffers or a speed above
    /// `speed_limit`.
    pub fn is_unstable(&self, speed_limit: f32) -> bool {
        !self.finite || self.max_speed > speed_limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DEFAULT_PRESSURE, Scene, SmokeParams};

    fn params() -> SmokeParams {
        SmokeParams {
            resolution: [8, 6, 1],
            spacing: 1.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_initial_stats() {
        let sim = SmokeSimulation::new(&params(), Scene::default()).unwrap();
        let stats = SimulationStats::from_simulation(&sim);
        assert_eq!(stats.frame, 0);
        assert_eq!(stats.total_density, 48.0);
        assert_eq!(stats.max_speed, 0.0);
        assert_eq!(stats.max_divergence, 0.0);
        assert_eq!(stats.mean_pressure, DEFAULT_PRESSURE);
        assert!(stats.finite);
        assert!(!stats.is_unstable(100.0));
    }

    #[test]
    fn test_detects_non_finite() {
        let mut sim = SmokeSimulation::new(&params(), Scene::default()).unwrap();
        sim.fields_mut().velocity_mut().component_mut(0).set([2, 2, 0], f32::NAN);
        let stats = SimulationStats::from_simulation(&sim);
        assert!(!stats.finite);
        assert!(stats.is_unstable(f32::INFINITY));
    }

    #[test]
    fn test_speed_limit() {
        let mut sim = SmokeSimulation::new(&params(), Scene::default()).unwrap();
        sim.fields_mut().velocity_mut().component_mut(1).fill(-12.0);
        let stats = SimulationStats::from_simulation(&sim);
        assert_eq!(stats.max_speed, 12.0);
        assert!(stats.is_unstable(10.0));
        assert!(!stats.is_unstable(20.0));
    }
}
