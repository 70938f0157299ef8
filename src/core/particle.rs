use crate::error::{Error, Result};

/// Fixed spatial dimension (2D).
pub const DIM: usize = 2;

/// Shared numerical tolerance.
///
/// Used for clamping after integration, for clustering simultaneous events and
/// for admitting near-grazing predictions.
pub const EPS: f64 = 1e-10;

/// A mobile hard disk.
///
/// Fields:
/// - `id`: stable identifier (1-based for generated systems)
/// - `r`: center position [x, y]
/// - `v`: velocity [vx, vy]
/// - `radius`: disk radius (> 0)
/// - `mass`: disk mass (> 0)
/// - `collision_count`: incremented each time the disk takes part in an applied event
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    /// Stable particle identifier.
    pub id: u32,
    /// Position (x, y).
    pub r: [f64; DIM],
    /// Velocity (vx, vy).
    pub v: [f64; DIM],
    /// Disk radius (> 0).
    pub radius: f64,
    /// Mass (> 0).
    pub mass: f64,
    /// Collision participation counter.
    pub collision_count: u64,
}

impl Particle {
    /// Create a new particle after validating invariants.
    ///
    /// Errors:
    /// - `Error::InvalidParam` if `radius` or `mass` is non-positive or any component is NaN/inf.
    pub fn new(id: u32, r: [f64; DIM], v: [f64; DIM], radius: f64, mass: f64) -> Result<Self> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(Error::InvalidParam("radius must be finite and > 0".into()));
        }
        if !mass.is_finite() || mass <= 0.0 {
            return Err(Error::InvalidParam("mass must be finite and > 0".into()));
        }
        if !r.iter().all(|x| x.is_finite()) {
            return Err(Error::InvalidParam("position must be finite".into()));
        }
        if !v.iter().all(|x| x.is_finite()) {
            return Err(Error::InvalidParam("velocity must be finite".into()));
        }
        Ok(Self {
            id,
            r,
            v,
            radius,
            mass,
            collision_count: 0,
        })
    }

    /// Increment the collision counter.
    #[inline]
    pub fn bump_collision_count(&mut self) {
        self.collision_count = self.collision_count.saturating_add(1);
    }

    /// Returns the particle's kinetic energy: 1/2 m |v|^2.
    #[inline]
    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.mass * dot(&self.v, &self.v)
    }

    /// Linear momentum m v.
    #[inline]
    pub fn momentum(&self) -> [f64; DIM] {
        [self.mass * self.v[0], self.mass * self.v[1]]
    }

    /// Speed |v|.
    #[inline]
    pub fn speed(&self) -> f64 {
        dot(&self.v, &self.v).sqrt()
    }

    /// Center position after ballistic flight of `dt`.
    #[inline]
    pub fn position_after(&self, dt: f64) -> [f64; DIM] {
        [self.r[0] + self.v[0] * dt, self.r[1] + self.v[1] * dt]
    }

    /// Straight-line integration: r += v dt.
    #[inline]
    pub fn advance(&mut self, dt: f64) {
        self.r = self.position_after(dt);
    }

    /// A copy of this particle moved ballistically by `dt`. Used to project
    /// predictions from a future crossing point.
    pub fn advanced(&self, dt: f64) -> Self {
        let mut p = self.clone();
        p.advance(dt);
        p
    }

    /// Smallest t >= 0 at which the disk edge touches the vertical line `x = line`.
    ///
    /// Returns +inf when the line is unreachable (moving away or parallel).
    pub fn time_to_vertical_line(&self, line: f64) -> f64 {
        time_to_line(self.r[0], self.v[0], self.radius, line)
    }

    /// Smallest t >= 0 at which the disk edge touches the horizontal line `y = line`.
    pub fn time_to_horizontal_line(&self, line: f64) -> f64 {
        time_to_line(self.r[1], self.v[1], self.radius, line)
    }

    /// Time until contact with another mobile disk, +inf if they never touch.
    ///
    /// Symmetric: `p.time_to_collision(q) == q.time_to_collision(p)`.
    pub fn time_to_collision(&self, other: &Particle) -> f64 {
        let dr = sub(&other.r, &self.r);
        let dv = sub(&other.v, &self.v);
        let sigma = self.radius + other.radius;
        if dot(&dv, &dv) == 0.0 {
            // No relative motion: either touching now or never.
            return if dot(&dr, &dr) <= sigma * sigma {
                0.0
            } else {
                f64::INFINITY
            };
        }
        contact_time(&dr, &dv, sigma)
    }

    /// Time until the disk edge reaches a fixed point obstacle (sigma = radius).
    ///
    /// A disk at rest never strikes anything, even if it already touches the point.
    pub fn time_to_point(&self, point: [f64; DIM]) -> f64 {
        let dr = sub(&point, &self.r);
        let dv = [-self.v[0], -self.v[1]];
        if dot(&dv, &dv) == 0.0 {
            return f64::INFINITY;
        }
        contact_time(&dr, &dv, self.radius)
    }
}

/// Edge-to-line time along one axis. Edges already past the line by no more
/// than `EPS` are treated as touching now.
fn time_to_line(pos: f64, vel: f64, radius: f64, line: f64) -> f64 {
    if vel > 0.0 {
        let edge = pos + radius;
        if line >= edge - EPS {
            return ((line - edge) / vel).max(0.0);
        }
    } else if vel < 0.0 {
        let edge = pos - radius;
        if line <= edge + EPS {
            return ((line - edge) / vel).max(0.0);
        }
    }
    f64::INFINITY
}

/// Earliest root of |dr + dv t| = sigma for an approaching pair (dv != 0).
fn contact_time(dr: &[f64; DIM], dv: &[f64; DIM], sigma: f64) -> f64 {
    let rv = dot(dr, dv);
    if rv >= 0.0 {
        return f64::INFINITY;
    }
    let vv = dot(dv, dv);
    let rr = dot(dr, dr);
    let c = rr - sigma * sigma;
    let d = rv * rv - vv * c;
    if d < 0.0 {
        return f64::INFINITY;
    }
    // Same root as -(rv + sqrt(d)) / vv, written without the cancellation.
    let t = c / (-rv + d.sqrt());
    if t >= 0.0 {
        t
    } else if rr.sqrt() >= sigma - EPS {
        0.0
    } else {
        f64::INFINITY
    }
}

#[inline]
pub(crate) fn dot(a: &[f64; DIM], b: &[f64; DIM]) -> f64 {
    a[0] * b[0] + a[1] * b[1]
}

#[inline]
pub(crate) fn sub(a: &[f64; DIM], b: &[f64; DIM]) -> [f64; DIM] {
    [a[0] - b[0], a[1] - b[1]]
}
