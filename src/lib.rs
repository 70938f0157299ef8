//! Event-driven molecular dynamics of hard disks in a square chamber coupled
//! through a narrow aperture to a rectangular channel.
//!
//! The engine jumps from one instantaneous collision to the next: particles
//! fly ballistically between events, and every step resolves the earliest
//! cluster of simultaneous wall, corner and disk-disk collisions.
//!
//! ```no_run
//! use disksim::config::SimConfig;
//! use disksim::output::MemorySink;
//!
//! let config = SimConfig { num_particles: 50, aperture: 0.03, steps: 100, seed: Some(1), ..SimConfig::default() };
//! let mut sink = MemorySink::new();
//! let summary = disksim::run_from_config(&config, &mut sink)?;
//! assert_eq!(sink.frames.len() as u64, summary.steps + 1);
//! # Ok::<(), disksim::error::Error>(())
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod output;

#[cfg(feature = "python")]
mod python;

pub use crate::core::{run_from_config, Simulation};
