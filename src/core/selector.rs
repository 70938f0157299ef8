//! Global event selection.
//!
//! Every step all candidates are recomputed from the current state: one
//! boundary event per mobile disk and one event per approaching unordered
//! pair (i < j).
//! The minimum-time event is popped together with every event that falls
//! within the simultaneity tolerance.

use crate::core::collision;
use crate::core::event::{Event, EventKind};
use crate::core::geometry::Domain;
use crate::core::particle::EPS;
use crate::core::Particle;
use crate::error::Result;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Events firing together at offset `dt` from the current time.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    /// Offset of the cluster from the current simulated time.
    pub dt: f64,
    /// Events in application order (see `EventKind`).
    pub events: Vec<Event>,
}

/// Min-queue of candidate events for one selection cycle.
#[derive(Debug, Default)]
pub struct EventSelector {
    pq: BinaryHeap<Reverse<Event>>,
}

impl EventSelector {
    /// Collect every candidate event for the current state.
    pub fn collect(domain: &Domain, particles: &[Particle]) -> Result<Self> {
        let n = particles.len();
        let mut pq = BinaryHeap::with_capacity(n + n * n.saturating_sub(1) / 2);

        for (i, p) in particles.iter().enumerate() {
            if let Some(ev) = domain.next_boundary_event(i, p)? {
                pq.push(Reverse(ev));
            }
        }

        for i in 0..n {
            for j in (i + 1)..n {
                let (p, q) = (&particles[i], &particles[j]);
                // Touching pairs with no closing speed would win every cycle without changing anything.
                if !collision::approaching(p, q) {
                    continue;
                }
                let t = p.time_to_collision(q);
                if t.is_finite() {
                    pq.push(Reverse(Event::new(t, EventKind::Pair { i, j })?));
                }
            }
        }

        Ok(Self { pq })
    }

    /// Number of pending candidates.
    pub fn len(&self) -> usize {
        self.pq.len()
    }

    /// True if no candidate event exists.
    pub fn is_empty(&self) -> bool {
        self.pq.is_empty()
    }

    /// Pop the earliest event and every event simultaneous with it.
    pub fn pop_cluster(&mut self) -> Option<Cluster> {
        let Reverse(first) = self.pq.pop()?;
        let t0 = first.time_f64();
        let mut events = vec![first];
        while let Some(Reverse(next)) = self.pq.peek() {
            if !simultaneous(t0, next.time_f64()) {
                break;
            }
            if let Some(Reverse(ev)) = self.pq.pop() {
                events.push(ev);
            }
        }
        events.sort_by_key(|e| e.kind.order_key());
        Some(Cluster { dt: t0, events })
    }
}

/// Relative simultaneity test: |t - t0| <= EPS * max(1, |t0|, |t|).
#[inline]
pub fn simultaneous(t0: f64, t: f64) -> bool {
    (t - t0).abs() <= EPS * 1f64.max(t0.abs()).max(t.abs())
}

/// Next cluster of events for the given state, or `None` if nothing will ever happen.
pub fn next_cluster(domain: &Domain, particles: &[Particle]) -> Result<Option<Cluster>> {
    Ok(EventSelector::collect(domain, particles)?.pop_cluster())
}
