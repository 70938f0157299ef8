use numpy::ndarray::Array2;
use numpy::{IntoPyArray, PyArray1, PyArray2};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::config::SimConfig;
use crate::core::particle::DIM;
use crate::core::{Particle, Simulation};

fn py_err<E: ToString>(e: E) -> PyErr {
    PyValueError::new_err(e.to_string())
}

/// DiskSim Python-facing wrapper around the Rust Simulation core.
///
/// API:
/// - __new__(num_particles, aperture, radius=0.0015, mass=1.0, speed=0.01, seed=None)
/// - step(count) -> number of steps resolved
/// - time(), kinetic_energy()
/// - get_positions() / get_velocities() -> np.ndarray, shape (N, 2)
/// - get_collision_counts() -> np.ndarray, shape (N,)
#[pyclass]
pub struct DiskSim {
    sim: Simulation,
}

#[pymethods]
impl DiskSim {
    /// Place `num_particles` disks at random in the chamber of a domain with aperture height `aperture`.
    ///
    /// Errors: raises ValueError on invalid parameters or failed placement.
    #[new]
    #[pyo3(signature = (num_particles, aperture, radius=0.0015, mass=1.0, speed=0.01, seed=None))]
    fn new(
        num_particles: usize,
        aperture: f64,
        radius: f64,
        mass: f64,
        speed: f64,
        seed: Option<u64>,
    ) -> PyResult<Self> {
        let config = SimConfig {
            name: "python".into(),
            num_particles,
            aperture,
            radius,
            mass,
            speed,
            seed,
            ..SimConfig::default()
        };
        let sim = Simulation::from_config(&config).map_err(py_err)?;
        Ok(Self { sim })
    }

    /// Resolve up to `count` event clusters (releases the GIL during computation).
    fn step(&mut self, py: Python<'_>, count: u64) -> PyResult<u64> {
        py.detach(|| self.sim.advance_steps(count)).map_err(py_err)
    }

    /// Current simulated time.
    fn time(&self) -> f64 {
        self.sim.time()
    }

    /// Total kinetic energy.
    fn kinetic_energy(&self) -> f64 {
        self.sim.kinetic_energy()
    }

    /// Return positions as a NumPy array of shape (N, 2), dtype=float64.
    fn get_positions<'py>(&self, py: Python<'py>) -> PyResult<Py<PyArray2<f64>>> {
        let arr = self.columns(|p| p.r);
        Ok(arr.into_pyarray(py).to_owned().into())
    }

    /// Return velocities as a NumPy array of shape (N, 2), dtype=float64.
    fn get_velocities<'py>(&self, py: Python<'py>) -> PyResult<Py<PyArray2<f64>>> {
        let arr = self.columns(|p| p.v);
        Ok(arr.into_pyarray(py).to_owned().into())
    }

    /// Per-disk count of applied events, shape (N,), dtype=uint64.
    fn get_collision_counts<'py>(&self, py: Python<'py>) -> PyResult<Py<PyArray1<u64>>> {
        let counts: Vec<u64> = self
            .sim
            .particles()
            .iter()
            .map(|p| p.collision_count)
            .collect();
        Ok(counts.into_pyarray(py).to_owned().into())
    }
}

impl DiskSim {
    fn columns(&self, f: impl Fn(&Particle) -> [f64; DIM]) -> Array2<f64> {
        let n = self.sim.num_particles();
        let mut arr = Array2::<f64>::zeros((n, DIM));
        for (i, p) in self.sim.particles().iter().enumerate() {
            for (k, x) in f(p).into_iter().enumerate() {
                arr[[i, k]] = x;
            }
        }
        arr
    }
}

/// The disksim Python module entry point.
#[pymodule]
fn disksim(_py: Python<'_>, m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<DiskSim>()?;
    Ok(())
}
