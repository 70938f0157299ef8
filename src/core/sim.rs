use crate::config::{Restitution, SimConfig};
use crate::core::event::EventKind;
use crate::core::geometry::Domain;
use crate::core::monitor::{self, ConservationMonitor};
use crate::core::particle::{dot, sub, DIM, EPS};
use crate::core::selector::{self, Cluster};
use crate::core::Particle;
use crate::error::{Error, Result};
use crate::output::{Snapshot, SnapshotSink, StaticMetadata};
use rand::{rng, rngs::StdRng, Rng, SeedableRng};
use std::f64::consts::TAU;
use tracing::{debug, info, trace};

/// Engine options that are not part of the geometry or the initial state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimOptions {
    pub restitution: Restitution,
    /// Tolerated relative kinetic energy increase.
    pub energy_tolerance: f64,
    /// Verify region and overlap invariants after every step.
    pub check_invariants: bool,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            restitution: Restitution::default(),
            energy_tolerance: 1e-9,
            check_invariants: true,
        }
    }
}

impl SimOptions {
    pub fn from_config(config: &SimConfig) -> Self {
        Self {
            restitution: config.restitution,
            energy_tolerance: config.energy_tolerance,
            check_invariants: config.check_invariants,
        }
    }
}

/// Outcome of one resolved cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    /// Simulated time after the step.
    pub time: f64,
    /// Offset advanced by this step.
    pub dt: f64,
    /// Events in the cluster.
    pub events: usize,
    /// Events whose operator was applied.
    pub applied: usize,
    /// Ids of disks that struck a wall or corner, ascending.
    pub boundary_hits: Vec<u32>,
}

/// Totals for a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub steps: u64,
    pub events_applied: u64,
    pub final_time: f64,
    /// Largest relative kinetic energy drift observed.
    pub max_energy_drift: f64,
}

/// Event-driven hard-disk system in the chamber + channel domain.
///
/// Single-threaded and synchronous: each `step` recomputes every candidate
/// event, advances all disks to the earliest cluster, applies it and clamps drift.
#[derive(Debug)]
pub struct Simulation {
    time_now: f64,
    steps_taken: u64,
    events_applied: u64,
    domain: Domain,
    particles: Vec<Particle>,
    options: SimOptions,
    monitor: ConservationMonitor,
}

impl Simulation {
    /// Build a simulation from caller-provided disks.
    ///
    /// Errors: `Error::Initialization` if a disk lies outside the domain or two disks overlap.
    pub fn new(domain: Domain, particles: Vec<Particle>, options: SimOptions) -> Result<Self> {
        for p in &particles {
            if !domain.contains(p, EPS) {
                return Err(Error::Initialization(format!(
                    "particle {} does not fit in the domain at {:?}",
                    p.id, p.r
                )));
            }
        }
        if let Some((a, b)) = first_overlap(&particles) {
            return Err(Error::Initialization(format!(
                "particles {} and {} overlap",
                particles[a].id, particles[b].id
            )));
        }
        let monitor = ConservationMonitor::new(&particles, options.energy_tolerance);
        Ok(Self {
            time_now: 0.0,
            steps_taken: 0,
            events_applied: 0,
            domain,
            particles,
            options,
            monitor,
        })
    }

    /// Build a simulation with `num_particles` disks placed uniformly at random
    /// in the chamber, without overlap, moving at `speed` in random directions.
    /// Ids are 1-based in placement order.
    pub fn from_config(config: &SimConfig) -> Result<Self> {
        config.validate()?;
        let domain = Domain::new(config.enclosure, config.aperture)?;
        let seed = config.seed.unwrap_or_else(|| rng().random());
        info!(
            name = %config.name,
            n = config.num_particles,
            aperture = config.aperture,
            seed,
            "placing particles"
        );
        let mut rng = StdRng::seed_from_u64(seed);

        let radius = config.radius;
        let (lo, hi) = (radius, config.enclosure - radius);
        let mut particles: Vec<Particle> = Vec::with_capacity(config.num_particles);
        for k in 0..config.num_particles {
            let id = particle_id(k)?;
            let mut attempts = 0usize;
            let r = loop {
                if attempts >= config.placement_attempts {
                    return Err(Error::Initialization(format!(
                        "failed to place particle {id} without overlap after {attempts} attempts; try fewer particles or smaller radius"
                    )));
                }
                attempts += 1;
                let r = [rng.random_range(lo..=hi), rng.random_range(lo..=hi)];
                if !overlaps_existing(&particles, &r, radius) {
                    break r;
                }
            };
            let theta = rng.random_range(0.0..TAU);
            let v = [config.speed * theta.cos(), config.speed * theta.sin()];
            particles.push(Particle::new(id, r, v, radius, config.mass)?);
        }

        Self::new(domain, particles, SimOptions::from_config(config))
    }

    /// Returns current simulation time.
    pub fn time(&self) -> f64 {
        self.time_now
    }

    /// Steps resolved so far.
    pub fn steps_taken(&self) -> u64 {
        self.steps_taken
    }

    /// Number of particles.
    pub fn num_particles(&self) -> usize {
        self.particles.len()
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Compute total kinetic energy (diagnostic).
    pub fn kinetic_energy(&self) -> f64 {
        monitor::total_kinetic_energy(&self.particles)
    }

    /// Total linear momentum (diagnostic).
    pub fn total_momentum(&self) -> [f64; DIM] {
        monitor::total_momentum(&self.particles)
    }

    /// Largest relative kinetic energy drift seen so far.
    pub fn max_energy_drift(&self) -> f64 {
        self.monitor.max_energy_error
    }

    /// The cluster the next `step` would resolve, without changing state.
    pub fn next_cluster(&self) -> Result<Option<Cluster>> {
        selector::next_cluster(&self.domain, &self.particles)
    }

    /// Resolve the next simultaneity cluster.
    ///
    /// Returns `Ok(None)` when no event will ever occur (every disk at rest).
    pub fn step(&mut self) -> Result<Option<StepReport>> {
        let Some(cluster) = self.next_cluster()? else {
            return Ok(None);
        };

        for p in &mut self.particles {
            p.advance(cluster.dt);
        }

        let mut applied = 0usize;
        let mut boundary_hits = Vec::new();
        for ev in &cluster.events {
            if !ev.apply(&mut self.particles, &self.domain, &self.options.restitution)? {
                debug!(kind = ?ev.kind, "pair already separating; skipped");
                continue;
            }
            trace!(kind = ?ev.kind, t = self.time_now + cluster.dt, "applied");
            applied += 1;
            let i = ev.primary();
            self.particles[i].bump_collision_count();
            if let EventKind::Pair { j, .. } = ev.kind {
                self.particles[j].bump_collision_count();
            }
            if ev.is_boundary() {
                boundary_hits.push(self.particles[i].id);
            }
        }
        boundary_hits.sort_unstable();
        boundary_hits.dedup();

        for p in &mut self.particles {
            self.domain.clamp(p)?;
        }

        self.time_now += cluster.dt;
        self.steps_taken += 1;
        self.events_applied += applied as u64;

        if self.options.check_invariants {
            self.verify_invariants()?;
        }
        self.monitor.check(&self.particles)?;

        debug!(
            step = self.steps_taken,
            t = self.time_now,
            dt = cluster.dt,
            events = cluster.events.len(),
            applied,
            "cluster resolved"
        );

        Ok(Some(StepReport {
            time: self.time_now,
            dt: cluster.dt,
            events: cluster.events.len(),
            applied,
            boundary_hits,
        }))
    }

    /// Resolve up to `count` steps without emitting output. Returns the number resolved.
    pub fn advance_steps(&mut self, count: u64) -> Result<u64> {
        for done in 0..count {
            if self.step()?.is_none() {
                return Ok(done);
            }
        }
        Ok(count)
    }

    /// Emit the current state, then resolve up to `steps` steps emitting one snapshot each.
    ///
    /// Stops early, without error, if the system comes to rest.
    pub fn run<S: SnapshotSink + ?Sized>(&mut self, sink: &mut S, steps: u64) -> Result<RunSummary> {
        sink.write_snapshot(&Snapshot {
            time: self.time_now,
            boundary_hits: &[],
            particles: &self.particles,
        })?;
        let start = self.steps_taken;
        for _ in 0..steps {
            let Some(report) = self.step()? else {
                info!(t = self.time_now, "no further events; stopping early");
                break;
            };
            sink.write_snapshot(&Snapshot {
                time: report.time,
                boundary_hits: &report.boundary_hits,
                particles: &self.particles,
            })?;
        }
        sink.flush()?;

        let summary = RunSummary {
            steps: self.steps_taken - start,
            events_applied: self.events_applied,
            final_time: self.time_now,
            max_energy_drift: self.monitor.max_energy_error,
        };
        info!(
            steps = summary.steps,
            events = summary.events_applied,
            t = summary.final_time,
            drift = summary.max_energy_drift,
            "run complete"
        );
        Ok(summary)
    }

    /// Every disk inside the domain and no two disks overlapping, within `EPS`.
    pub fn verify_invariants(&self) -> Result<()> {
        for p in &self.particles {
            if !self.domain.contains(p, EPS) {
                return Err(Error::InvariantViolation(format!(
                    "particle {} left the domain: r = {:?}, v = {:?}",
                    p.id, p.r, p.v
                )));
            }
        }
        if let Some((a, b)) = first_overlap(&self.particles) {
            let (p, q) = (&self.particles[a], &self.particles[b]);
            return Err(Error::InvariantViolation(format!(
                "particles {} and {} overlap: r = {:?} / {:?}, v = {:?} / {:?}",
                p.id, q.id, p.r, q.r, p.v, q.v
            )));
        }
        Ok(())
    }
}

/// Validate `config`, build the system, write static metadata and run `config.steps` steps.
pub fn run_from_config<S: SnapshotSink + ?Sized>(
    config: &SimConfig,
    sink: &mut S,
) -> Result<RunSummary> {
    let mut sim = Simulation::from_config(config)?;
    sink.write_static(&StaticMetadata::from_config(config))?;
    sim.run(sink, config.steps)
}

// ============ Utility helpers ============

/// 1-based id for the particle placed at index `k`.
fn particle_id(k: usize) -> Result<u32> {
    k.checked_add(1)
        .and_then(|id| u32::try_from(id).ok())
        .ok_or_else(|| {
            Error::Configuration(format!("particle index {k} exceeds the u32 id range"))
        })
}

fn overlaps_existing(existing: &[Particle], r: &[f64; DIM], radius: f64) -> bool {
    existing.iter().any(|p| {
        let d = sub(r, &p.r);
        let min = radius + p.radius;
        dot(&d, &d) <= min * min
    })
}

/// First pair (i < j) closer than the sum of radii by more than `EPS`.
fn first_overlap(particles: &[Particle]) -> Option<(usize, usize)> {
    let n = particles.len();
    for i in 0..n {
        for j in (i + 1)..n {
            let (p, q) = (&particles[i], &particles[j]);
            let d = sub(&q.r, &p.r);
            let min = p.radius + q.radius - EPS;
            if dot(&d, &d) < min * min {
                return Some((i, j));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::MemorySink;
    use approx::assert_relative_eq;

    fn disk(id: u32, r: [f64; DIM], v: [f64; DIM]) -> Particle {
        Particle::new(id, r, v, 0.0015, 1.0).unwrap()
    }

    fn small_config() -> SimConfig {
        SimConfig {
            name: "unit".into(),
            num_particles: 8,
            aperture: 0.02,
            steps: 50,
            seed: Some(1234),
            ..SimConfig::default()
        }
    }

    #[test]
    fn make_small_sim_ok() -> Result<()> {
        let mut sim = Simulation::from_config(&small_config())?;
        assert_eq!(sim.num_particles(), 8);
        assert!(sim.kinetic_energy().is_finite());
        let done = sim.advance_steps(20)?;
        assert_eq!(done, 20);
        assert!(sim.time() > 0.0);
        Ok(())
    }

    #[test]
    fn ids_are_one_based() -> Result<()> {
        let sim = Simulation::from_config(&small_config())?;
        let ids: Vec<u32> = sim.particles().iter().map(|p| p.id).collect();
        assert_eq!(ids, (1..=8).collect::<Vec<_>>());
        Ok(())
    }

    #[test]
    fn placement_respects_speed_and_chamber() -> Result<()> {
        let sim = Simulation::from_config(&small_config())?;
        for p in sim.particles() {
            assert_relative_eq!(p.speed(), 0.01, epsilon = 1e-15);
            assert!(p.r[0] >= p.radius && p.r[0] <= 0.09 - p.radius);
            assert!(p.r[1] >= p.radius && p.r[1] <= 0.09 - p.radius);
        }
        Ok(())
    }

    #[test]
    fn same_seed_same_run() -> Result<()> {
        let mut a = Simulation::from_config(&small_config())?;
        let mut b = Simulation::from_config(&small_config())?;
        a.advance_steps(30)?;
        b.advance_steps(30)?;
        assert_eq!(a.particles(), b.particles());
        assert_eq!(a.time(), b.time());
        Ok(())
    }

    #[test]
    fn particle_ids_do_not_truncate() -> Result<()> {
        assert_eq!(particle_id(0)?, 1);
        assert_eq!(particle_id(u32::MAX as usize - 1)?, u32::MAX);
        assert!(matches!(
            particle_id(u32::MAX as usize),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(particle_id(usize::MAX), Err(Error::Configuration(_))));
        Ok(())
    }

    #[test]
    fn overcrowded_chamber_fails_placement() {
        let cfg = SimConfig {
            num_particles: 2000,
            radius: 0.004,
            placement_attempts: 200,
            ..small_config()
        };
        let err = Simulation::from_config(&cfg).unwrap_err();
        assert!(matches!(err, Error::Initialization(_)));
    }

    #[test]
    fn overlapping_input_rejected() -> Result<()> {
        let domain = Domain::new(0.09, 0.01)?;
        let ps = vec![
            disk(1, [0.02, 0.02], [0.0, 0.0]),
            disk(2, [0.021, 0.02], [0.0, 0.0]),
        ];
        let err = Simulation::new(domain, ps, SimOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Initialization(_)));
        Ok(())
    }

    #[test]
    fn outside_input_rejected() -> Result<()> {
        let domain = Domain::new(0.09, 0.01)?;
        let ps = vec![disk(1, [0.12, 0.02], [0.0, 0.0])];
        let err = Simulation::new(domain, ps, SimOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Initialization(_)));
        Ok(())
    }

    #[test]
    fn resting_system_stops_early() -> Result<()> {
        let domain = Domain::new(0.09, 0.01)?;
        let ps = vec![disk(1, [0.0885, 0.0385], [0.0, 0.0])];
        let mut sim = Simulation::new(domain, ps, SimOptions::default())?;
        let mut sink = MemorySink::new();
        let summary = sim.run(&mut sink, 10)?;
        assert_eq!(summary.steps, 0);
        assert_eq!(sink.frames.len(), 1);
        assert_eq!(sim.particles()[0].r, [0.0885, 0.0385]);
        Ok(())
    }

    #[test]
    fn touching_pair_at_rest_stops_early() -> Result<()> {
        let domain = Domain::new(0.09, 0.01)?;
        let ps = vec![
            disk(1, [0.02, 0.045], [0.0, 0.0]),
            disk(2, [0.023, 0.045], [0.0, 0.0]),
        ];
        let mut sim = Simulation::new(domain, ps, SimOptions::default())?;
        assert!(sim.step()?.is_none());
        assert_eq!(sim.steps_taken(), 0);
        Ok(())
    }

    #[test]
    fn touching_co_moving_pair_advances_time() -> Result<()> {
        let domain = Domain::new(0.09, 0.01)?;
        let ps = vec![
            disk(1, [0.02, 0.03], [0.01, 0.0]),
            disk(2, [0.023, 0.03], [0.01, 0.0]),
        ];
        let mut sim = Simulation::new(domain, ps, SimOptions::default())?;
        let report = sim.step()?.expect("right wall");
        assert!(report.dt > 0.0);
        assert_relative_eq!(report.time, 6.55, epsilon = 1e-9);
        assert_eq!(report.boundary_hits, vec![2]);
        Ok(())
    }

    #[test]
    fn wall_step_reports_boundary_hit() -> Result<()> {
        let domain = Domain::new(0.09, 0.01)?;
        let ps = vec![disk(1, [0.045, 0.01], [0.01, 0.0])];
        let mut sim = Simulation::new(domain, ps, SimOptions::default())?;
        let report = sim.step()?.expect("a step");
        assert_relative_eq!(report.time, 4.35, epsilon = 1e-9);
        assert_eq!(report.boundary_hits, vec![1]);
        assert_eq!(sim.particles()[0].v, [-0.01, 0.0]);
        assert_eq!(sim.particles()[0].collision_count, 1);
        Ok(())
    }

    #[test]
    fn wall_restitution_applies() -> Result<()> {
        let domain = Domain::new(0.09, 0.01)?;
        let ps = vec![disk(1, [0.045, 0.01], [0.01, 0.0])];
        let options = SimOptions {
            restitution: Restitution {
                wall: 0.5,
                ..Restitution::default()
            },
            ..SimOptions::default()
        };
        let mut sim = Simulation::new(domain, ps, options)?;
        sim.step()?;
        assert_relative_eq!(sim.particles()[0].v[0], -0.005);
        assert!(sim.max_energy_drift() > 0.7);
        Ok(())
    }

    #[test]
    fn run_from_config_writes_static_and_frames() -> Result<()> {
        let cfg = small_config();
        let mut sink = MemorySink::new();
        let summary = run_from_config(&cfg, &mut sink)?;
        assert_eq!(summary.steps, 50);
        assert_eq!(sink.frames.len(), 51);
        assert_eq!(sink.frames[0].time, 0.0);
        assert_eq!(
            sink.metadata.as_ref().map(|m| m.num_particles),
            Some(cfg.num_particles)
        );
        Ok(())
    }
}
