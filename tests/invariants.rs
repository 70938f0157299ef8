use disksim::config::SimConfig;
use disksim::core::{Simulation, EPS};
use proptest::prelude::*;

const STEPS: u64 = 500;

fn config(seed: u64, num_particles: usize, aperture: f64) -> SimConfig {
    SimConfig {
        name: "prop".into(),
        num_particles,
        aperture,
        steps: STEPS,
        seed: Some(seed),
        ..SimConfig::default()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Property: random systems stay inside the domain, never overlap,
    /// keep a monotone clock and conserve kinetic energy.
    #[test]
    fn prop_random_systems_hold_invariants(
        seed in any::<u64>(),
        num_particles in 1usize..80,
        aperture in 0.0035f64..0.085,
    ) {
        let mut sim = Simulation::from_config(&config(seed, num_particles, aperture)).unwrap();
        let energy = sim.kinetic_energy();
        let mut last = sim.time();
        for _ in 0..STEPS {
            let report = sim.step().unwrap();
            prop_assert!(report.is_some());
            prop_assert!(sim.time() >= last);
            last = sim.time();
        }
        prop_assert!(sim.verify_invariants().is_ok());
        for p in sim.particles() {
            prop_assert!(sim.domain().contains(p, EPS));
        }
        prop_assert!((sim.kinetic_energy() - energy).abs() <= 1e-9 * energy);
        prop_assert!(sim.max_energy_drift() < 1e-9);
    }

    /// Property: the same seed replays the same trajectory.
    #[test]
    fn prop_seed_replays(seed in any::<u64>()) {
        let cfg = config(seed, 10, 0.02);
        let mut a = Simulation::from_config(&cfg).unwrap();
        let mut b = Simulation::from_config(&cfg).unwrap();
        a.advance_steps(50).unwrap();
        b.advance_steps(50).unwrap();
        prop_assert_eq!(a.particles(), b.particles());
        prop_assert_eq!(a.time(), b.time());
    }
}
