//! Conservation monitoring.
//!
//! Tracks total kinetic energy against its initial value to catch collision
//! operators that inject energy and to report accumulated drift.

use crate::core::particle::DIM;
use crate::core::Particle;
use crate::error::{Error, Result};

/// Total kinetic energy: sum of 1/2 m |v|^2.
pub fn total_kinetic_energy(particles: &[Particle]) -> f64 {
    particles.iter().map(Particle::kinetic_energy).sum()
}

/// Total linear momentum: sum of m v.
pub fn total_momentum(particles: &[Particle]) -> [f64; DIM] {
    particles.iter().fold([0.0; DIM], |acc, p| {
        let m = p.momentum();
        [acc[0] + m[0], acc[1] + m[1]]
    })
}

/// Energy drift tracker.
#[derive(Debug, Clone)]
pub struct ConservationMonitor {
    /// Kinetic energy when monitoring started.
    pub baseline_energy: f64,
    /// Tolerated relative energy increase.
    pub tolerance: f64,
    /// Largest |E - E0| / |E0| seen so far.
    pub max_energy_error: f64,
}

impl ConservationMonitor {
    pub fn new(particles: &[Particle], tolerance: f64) -> Self {
        Self {
            baseline_energy: total_kinetic_energy(particles),
            tolerance,
            max_energy_error: 0.0,
        }
    }

    /// Signed energy error relative to the baseline (absolute when the baseline is ~0).
    pub fn energy_error(&self, particles: &[Particle]) -> f64 {
        let energy = total_kinetic_energy(particles);
        if self.baseline_energy.abs() > 1e-300 {
            (energy - self.baseline_energy) / self.baseline_energy.abs()
        } else {
            energy - self.baseline_energy
        }
    }

    /// Record the current drift; an energy gain beyond `tolerance` is an invariant violation.
    pub fn check(&mut self, particles: &[Particle]) -> Result<f64> {
        let err = self.energy_error(particles);
        self.max_energy_error = self.max_energy_error.max(err.abs());
        if err > self.tolerance {
            return Err(Error::InvariantViolation(format!(
                "kinetic energy grew by a relative {err:e} (baseline {}, tolerance {:e})",
                self.baseline_energy, self.tolerance
            )));
        }
        Ok(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn disk(v: [f64; DIM], mass: f64) -> Particle {
        Particle::new(1, [0.01, 0.01], v, 0.0015, mass).unwrap()
    }

    #[test]
    fn totals() {
        let ps = vec![disk([1.0, 0.0], 2.0), disk([0.0, -3.0], 1.0)];
        assert_relative_eq!(total_kinetic_energy(&ps), 1.0 + 4.5);
        assert_eq!(total_momentum(&ps), [2.0, -3.0]);
    }

    #[test]
    fn energy_gain_is_violation() {
        let mut ps = vec![disk([1.0, 0.0], 1.0)];
        let mut mon = ConservationMonitor::new(&ps, 1e-9);
        assert!(mon.check(&ps).is_ok());
        ps[0].v = [1.1, 0.0];
        assert!(matches!(mon.check(&ps), Err(Error::InvariantViolation(_))));
    }

    #[test]
    fn energy_loss_is_recorded_not_fatal() -> Result<()> {
        let mut ps = vec![disk([1.0, 0.0], 1.0)];
        let mut mon = ConservationMonitor::new(&ps, 1e-9);
        ps[0].v = [0.5, 0.0];
        let err = mon.check(&ps)?;
        assert_relative_eq!(err, -0.75);
        assert_relative_eq!(mon.max_energy_error, 0.75);
        Ok(())
    }
}
