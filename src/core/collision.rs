//! Collision response operators.
//!
//! Each operator mutates velocities only; positions are left at the contact
//! configuration reached by the driver's advance.

use crate::core::event::WallOrientation;
use crate::core::particle::{dot, sub, DIM};
use crate::core::Particle;
use crate::error::{Error, Result};

/// Axis-aligned wall reflection with restitution `c` along the wall normal.
pub fn reflect_wall(p: &mut Particle, orientation: WallOrientation, c: f64) {
    match orientation {
        WallOrientation::Horizontal => p.v[0] = -c * p.v[0],
        WallOrientation::Vertical => p.v[1] = -c * p.v[1],
    }
}

/// Reflection off a fixed point obstacle.
///
/// With n the unit vector from the obstacle to the disk center and t = (-n_y, n_x):
/// v' = (-c_n v.n) n + (c_t v.t) t. No-op if the center sits on the point.
pub fn reflect_off_point(p: &mut Particle, point: [f64; DIM], c_n: f64, c_t: f64) {
    let d = sub(&p.r, &point);
    let norm = dot(&d, &d).sqrt();
    if norm == 0.0 {
        return;
    }
    let n = [d[0] / norm, d[1] / norm];
    let t = [-n[1], n[0]];
    let vn = -c_n * dot(&p.v, &n);
    let vt = c_t * dot(&p.v, &t);
    p.v = [vn * n[0] + vt * t[0], vn * n[1] + vt * t[1]];
}

/// Elastic impulse exchange between two disks in contact.
///
/// J = 2 m_p m_q (dr.dv) / (sigma (m_p + m_q)), applied along dr / sigma.
/// Conserves linear momentum and kinetic energy. No-op if sigma = 0.
pub fn resolve_disks(p: &mut Particle, q: &mut Particle) {
    let dr = sub(&q.r, &p.r);
    let dv = sub(&q.v, &p.v);
    let sigma = p.radius + q.radius;
    if sigma == 0.0 {
        return;
    }
    let (mp, mq) = (p.mass, q.mass);
    let j = 2.0 * mp * mq * dot(&dr, &dv) / (sigma * (mp + mq));
    let jx = j * dr[0] / sigma;
    let jy = j * dr[1] / sigma;
    p.v[0] += jx / mp;
    p.v[1] += jy / mp;
    q.v[0] -= jx / mq;
    q.v[1] -= jy / mq;
}

/// True if the two disks are closing on each other (dr.dv < 0).
#[inline]
pub fn approaching(p: &Particle, q: &Particle) -> bool {
    dot(&sub(&q.r, &p.r), &sub(&q.v, &p.v)) < 0.0
}

/// Borrow two distinct particles mutably.
pub(crate) fn pair_mut(
    particles: &mut [Particle],
    i: usize,
    j: usize,
) -> Result<(&mut Particle, &mut Particle)> {
    let n = particles.len();
    if i == j || i >= n || j >= n {
        return Err(Error::InvalidParam(format!(
            "invalid particle pair ({i}, {j}) for n = {n}"
        )));
    }
    if i < j {
        let (head, tail) = particles.split_at_mut(j);
        Ok((&mut head[i], &mut tail[0]))
    } else {
        let (head, tail) = particles.split_at_mut(i);
        Ok((&mut tail[0], &mut head[j]))
    }
}
