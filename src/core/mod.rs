#![allow(missing_docs)] // Doc comments live on the public items of each submodule

//! Event-driven hard-disk engine.
//!
//! Leaf-first: `particle` (kinematics and predictions), `event` (tagged event
//! records), `geometry` (domain and boundary oracle), `collision` (response
//! operators), `selector` (simultaneity clusters), `monitor` (conservation
//! checks) and `sim` (the driver loop).

pub mod collision;
pub mod event;
pub mod geometry;
pub mod monitor;
pub mod particle;
pub mod selector;
pub mod sim;

pub use event::{Event, EventKind, WallOrientation};
pub use geometry::{Domain, Obstacle, Region};
pub use particle::{Particle, EPS};
pub use selector::{Cluster, EventSelector};
pub use sim::{run_from_config, RunSummary, SimOptions, Simulation, StepReport};
