//! Run configuration.
//!
//! `SimConfig` can be built in code, parsed from TOML, or assembled by the CLI
//! from its positional arguments. `validate` is the single gate for
//! `Error::Configuration`.

use crate::core::geometry::DEFAULT_ENCLOSURE;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Default disk radius.
pub const DEFAULT_RADIUS: f64 = 0.0015;
/// Default disk mass.
pub const DEFAULT_MASS: f64 = 1.0;
/// Default initial speed.
pub const DEFAULT_SPEED: f64 = 0.01;

/// Restitution coefficients for boundary collisions. Disk-disk collisions are always elastic.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Restitution {
    /// Applied to the normal velocity component on wall hits.
    pub wall: f64,
    /// Applied to the normal velocity component on corner hits.
    pub corner_normal: f64,
    /// Applied to the tangential velocity component on corner hits.
    pub corner_tangential: f64,
}

impl Default for Restitution {
    fn default() -> Self {
        Self {
            wall: 1.0,
            corner_normal: 1.0,
            corner_tangential: 1.0,
        }
    }
}

impl Restitution {
    /// True if every coefficient is exactly 1 (energy-conserving boundaries).
    pub fn is_elastic(&self) -> bool {
        self.wall == 1.0 && self.corner_normal == 1.0 && self.corner_tangential == 1.0
    }

    fn validate(&self) -> Result<()> {
        for (name, c) in [
            ("wall", self.wall),
            ("corner_normal", self.corner_normal),
            ("corner_tangential", self.corner_tangential),
        ] {
            if !c.is_finite() || c <= 0.0 || c > 1.0 {
                return Err(Error::Configuration(format!(
                    "restitution.{name} must lie in (0, 1], got {c}"
                )));
            }
        }
        Ok(())
    }
}

/// Full set of run parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    /// Simulation name; names the output directory.
    pub name: String,
    /// Number of mobile disks N.
    pub num_particles: usize,
    /// Enclosure side length E.
    pub enclosure: f64,
    /// Aperture height L, in (0, E).
    pub aperture: f64,
    /// Step budget T (number of event clusters to resolve).
    pub steps: u64,
    /// Disk radius r.
    pub radius: f64,
    /// Disk mass m.
    pub mass: f64,
    /// Initial speed magnitude v.
    pub speed: f64,
    pub restitution: Restitution,
    /// RNG seed for placement; drawn at random when absent.
    pub seed: Option<u64>,
    /// Placement retries per disk before giving up.
    pub placement_attempts: usize,
    /// Largest tolerated relative increase of total kinetic energy.
    pub energy_tolerance: f64,
    /// Verify region and overlap invariants after every step.
    pub check_invariants: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            name: "default".into(),
            num_particles: 200,
            enclosure: DEFAULT_ENCLOSURE,
            aperture: 0.05,
            steps: 1000,
            radius: DEFAULT_RADIUS,
            mass: DEFAULT_MASS,
            speed: DEFAULT_SPEED,
            restitution: Restitution::default(),
            seed: None,
            placement_attempts: 100_000,
            energy_tolerance: 1e-9,
            check_invariants: true,
        }
    }
}

impl SimConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| Error::Configuration(e.to_string()))
    }

    /// Read and parse a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Check every parameter against its accepted range.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Configuration("name must not be empty".into()));
        }
        if !self.enclosure.is_finite() || self.enclosure <= 0.0 {
            return Err(Error::Configuration(
                "enclosure must be finite and > 0".into(),
            ));
        }
        if !self.aperture.is_finite() || self.aperture <= 0.0 {
            return Err(Error::Configuration("aperture must be finite and > 0".into()));
        }
        if self.aperture >= self.enclosure {
            return Err(Error::Configuration(format!(
                "aperture {} must be narrower than the enclosure {}",
                self.aperture, self.enclosure
            )));
        }
        if self.steps < 1 {
            return Err(Error::Configuration("steps must be >= 1".into()));
        }
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(Error::Configuration("radius must be finite and > 0".into()));
        }
        if 2.0 * self.radius > self.enclosure {
            return Err(Error::Configuration(
                "enclosure must be at least 2 * radius".into(),
            ));
        }
        if 2.0 * self.radius >= self.aperture {
            return Err(Error::Configuration(format!(
                "aperture {} must be wider than a disk diameter {}",
                self.aperture,
                2.0 * self.radius
            )));
        }
        if !self.mass.is_finite() || self.mass <= 0.0 {
            return Err(Error::Configuration("mass must be finite and > 0".into()));
        }
        if !self.speed.is_finite() || self.speed < 0.0 {
            return Err(Error::Configuration("speed must be finite and >= 0".into()));
        }
        self.restitution.validate()?;
        if self.placement_attempts == 0 {
            return Err(Error::Configuration(
                "placement_attempts must be > 0".into(),
            ));
        }
        if !self.energy_tolerance.is_finite() || self.energy_tolerance <= 0.0 {
            return Err(Error::Configuration(
                "energy_tolerance must be finite and > 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() -> Result<()> {
        SimConfig::default().validate()
    }

    #[test]
    fn toml_overrides_defaults() -> Result<()> {
        let cfg = SimConfig::from_toml_str(
            r#"
            name = "narrow"
            num_particles = 50
            aperture = 0.03
            steps = 5000
            seed = 7

            [restitution]
            wall = 0.9
            "#,
        )?;
        assert_eq!(cfg.name, "narrow");
        assert_eq!(cfg.num_particles, 50);
        assert_eq!(cfg.steps, 5000);
        assert_eq!(cfg.seed, Some(7));
        assert_eq!(cfg.radius, DEFAULT_RADIUS);
        assert_eq!(cfg.restitution.wall, 0.9);
        assert_eq!(cfg.restitution.corner_normal, 1.0);
        assert!(!cfg.restitution.is_elastic());
        cfg.validate()
    }

    #[test]
    fn unknown_keys_rejected() {
        let err = SimConfig::from_toml_str("apertur = 0.02").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn aperture_wider_than_enclosure_rejected() {
        let cfg = SimConfig {
            aperture: 0.1,
            ..SimConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("narrower"));
    }

    #[test]
    fn aperture_narrower_than_a_disk_rejected() {
        let cfg = SimConfig {
            aperture: 0.003,
            radius: 0.0015,
            ..SimConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains("diameter"));

        let cfg = SimConfig {
            aperture: 0.0031,
            ..cfg
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_steps_rejected() {
        let cfg = SimConfig {
            steps: 0,
            ..SimConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn restitution_above_one_rejected() {
        let cfg = SimConfig {
            restitution: Restitution {
                corner_normal: 1.2,
                ..Restitution::default()
            },
            ..SimConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("corner_normal"));
    }
}
