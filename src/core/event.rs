use crate::config::Restitution;
use crate::core::collision;
use crate::core::geometry::Domain;
use crate::core::Particle;
use crate::error::{Error, Result};
use ordered_float::NotNan;
use std::cmp::Ordering;

/// Orientation of an axis-aligned wall, named after its normal.
///
/// - `Horizontal`: the normal is horizontal, i.e. a wall of constant x. Inverts vx.
/// - `Vertical`: the normal is vertical, i.e. a wall of constant y. Inverts vy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WallOrientation {
    Horizontal,
    Vertical,
}

/// Kinds of events that can occur in the engine. Indices refer to the
/// simulation's particle vector and to the domain's obstacle table.
///
/// Within a cluster events are applied in `order_key` order: walls, then
/// corners, then pairs, each by participant index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Disk `i` strikes an axis-aligned wall.
    Wall { i: usize, orientation: WallOrientation },
    /// Disk `i` strikes point obstacle `obstacle`.
    Corner { i: usize, obstacle: usize },
    /// Disks `i` and `j` collide (`i < j`).
    Pair { i: usize, j: usize },
}

impl EventKind {
    #[inline]
    pub(crate) fn order_key(&self) -> (u8, usize, usize) {
        match *self {
            EventKind::Wall { i, orientation } => (0, i, orientation as usize),
            EventKind::Corner { i, obstacle } => (1, i, obstacle),
            EventKind::Pair { i, j } => (2, i, j),
        }
    }
}

/// A predicted event. `time` is relative to the instant it was predicted at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub time: NotNan<f64>,
    pub kind: EventKind,
}

impl Event {
    /// Create a new event, validating that time is finite and non-negative.
    pub fn new(time: f64, kind: EventKind) -> Result<Self> {
        if !time.is_finite() {
            return Err(Error::InvalidParam("event time must be finite".into()));
        }
        if time < 0.0 {
            return Err(Error::InvalidParam("event time must be >= 0".into()));
        }
        let time = NotNan::new(time)
            .map_err(|_| Error::InvalidParam("event time cannot be NaN".into()))?;
        Ok(Self { time, kind })
    }

    /// Returns the raw f64 event time.
    #[inline]
    pub fn time_f64(&self) -> f64 {
        self.time.into_inner()
    }

    /// Index of the first (or only) mobile participant.
    #[inline]
    pub fn primary(&self) -> usize {
        match self.kind {
            EventKind::Wall { i, .. } | EventKind::Corner { i, .. } | EventKind::Pair { i, .. } => i,
        }
    }

    /// True for wall and corner events.
    #[inline]
    pub fn is_boundary(&self) -> bool {
        !matches!(self.kind, EventKind::Pair { .. })
    }

    /// Apply the collision operator for this event to the current state.
    ///
    /// Returns `Ok(false)` when a pair event is skipped because an earlier event
    /// of the same cluster already turned the pair apart.
    pub fn apply(
        &self,
        particles: &mut [Particle],
        domain: &Domain,
        restitution: &Restitution,
    ) -> Result<bool> {
        match self.kind {
            EventKind::Wall { i, orientation } => {
                let p = particle_mut(particles, i)?;
                collision::reflect_wall(p, orientation, restitution.wall);
                Ok(true)
            }
            EventKind::Corner { i, obstacle } => {
                let corner = domain.obstacle(obstacle).ok_or_else(|| {
                    Error::InvalidParam(format!("obstacle index {obstacle} out of range"))
                })?;
                let p = particle_mut(particles, i)?;
                collision::reflect_off_point(
                    p,
                    corner.pos,
                    restitution.corner_normal,
                    restitution.corner_tangential,
                );
                Ok(true)
            }
            EventKind::Pair { i, j } => {
                let (p, q) = collision::pair_mut(particles, i, j)?;
                if !collision::approaching(p, q) {
                    return Ok(false);
                }
                collision::resolve_disks(p, q);
                Ok(true)
            }
        }
    }
}

fn particle_mut(particles: &mut [Particle], i: usize) -> Result<&mut Particle> {
    let n = particles.len();
    particles
        .get_mut(i)
        .ok_or_else(|| Error::InvalidParam(format!("particle index {i} out of range (n = {n})")))
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.time.cmp(&other.time) {
            Ordering::Equal => self.kind.order_key().cmp(&other.kind.order_key()),
            o => o,
        }
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use EventKind::{Corner, Pair, Wall};

    #[test]
    fn new_event_rejects_nan_time() {
        let err = Event::new(f64::NAN, Pair { i: 1, j: 2 }).unwrap_err();
        assert!(err.to_string().contains("finite"));
    }

    #[test]
    fn new_event_rejects_infinite_and_negative_time() {
        assert!(Event::new(f64::INFINITY, Pair { i: 0, j: 1 }).is_err());
        assert!(Event::new(-1.0, Pair { i: 0, j: 1 }).is_err());
    }

    #[test]
    fn ordering_by_time() -> Result<()> {
        let e1 = Event::new(1.0, Pair { i: 0, j: 1 })?;
        let e2 = Event::new(2.0, Wall { i: 0, orientation: WallOrientation::Vertical })?;
        assert!(e1 < e2);
        Ok(())
    }

    #[test]
    fn tie_breaker_orders_walls_corners_pairs() -> Result<()> {
        let t = 5.0;
        let w = Event::new(t, Wall { i: 3, orientation: WallOrientation::Horizontal })?;
        let c = Event::new(t, Corner { i: 0, obstacle: 1 })?;
        let p = Event::new(t, Pair { i: 0, j: 1 })?;
        assert!(w < c);
        assert!(c < p);
        Ok(())
    }

    #[test]
    fn primary_and_boundary() -> Result<()> {
        let c = Event::new(0.5, Corner { i: 4, obstacle: 0 })?;
        assert_eq!(c.primary(), 4);
        assert!(c.is_boundary());
        let p = Event::new(0.5, Pair { i: 2, j: 9 })?;
        assert_eq!(p.primary(), 2);
        assert!(!p.is_boundary());
        Ok(())
    }

    #[test]
    fn apply_rejects_unknown_particle() -> Result<()> {
        let domain = Domain::new(0.09, 0.01)?;
        let mut particles = vec![Particle::new(1, [0.045, 0.045], [0.01, 0.0], 0.0015, 1.0)?];
        let e = Event::new(0.0, Wall { i: 3, orientation: WallOrientation::Horizontal })?;
        assert!(e.apply(&mut particles, &domain, &Restitution::default()).is_err());
        Ok(())
    }

    #[test]
    fn apply_skips_separating_pair() -> Result<()> {
        let domain = Domain::new(0.09, 0.01)?;
        let mut particles = vec![
            Particle::new(1, [0.02, 0.045], [-0.01, 0.0], 0.0015, 1.0)?,
            Particle::new(2, [0.023, 0.045], [0.01, 0.0], 0.0015, 1.0)?,
        ];
        let e = Event::new(0.0, Pair { i: 0, j: 1 })?;
        assert!(!e.apply(&mut particles, &domain, &Restitution::default())?);
        assert_eq!(particles[0].v, [-0.01, 0.0]);
        Ok(())
    }
}
