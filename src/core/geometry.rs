//! Chamber + channel geometry and the next-boundary-event oracle.
//!
//! The occupiable region is the chamber C = [0, E] x [0, E] joined to the
//! channel H = [E, 2E] x [(E - L)/2, (E + L)/2] through an aperture on x = E.
//! The two aperture endpoints are zero-radius point obstacles.

use crate::core::event::{Event, EventKind, WallOrientation};
use crate::core::particle::{dot, sub, DIM, EPS};
use crate::core::Particle;
use crate::error::{Error, Result};
use tracing::warn;

/// Default enclosure side length E.
pub const DEFAULT_ENCLOSURE: f64 = 0.09;

/// A fixed point obstacle (aperture corner).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    /// Index in the domain's obstacle table.
    pub id: usize,
    /// Position (x, y).
    pub pos: [f64; DIM],
}

/// Which part of the domain holds a disk center.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// x < E
    Chamber,
    /// E <= x <= 2E
    Channel,
}

/// Boundary struck first by a disk, as predicted by the oracle.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Boundary {
    Wall(WallOrientation),
    Corner(usize),
}

type Hit = Option<(f64, Boundary)>;

/// Lower aperture corner index in the obstacle table.
pub const CORNER_LO: usize = 0;
/// Upper aperture corner index in the obstacle table.
pub const CORNER_HI: usize = 1;

/// Static domain geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct Domain {
    enclosure: f64,
    aperture: f64,
    obstacles: [Obstacle; 2],
}

impl Domain {
    /// Build a domain with enclosure side `enclosure` (E) and aperture height `aperture` (L).
    ///
    /// Errors: `Error::Configuration` unless E > 0 and 0 < L < E.
    pub fn new(enclosure: f64, aperture: f64) -> Result<Self> {
        if !enclosure.is_finite() || enclosure <= 0.0 {
            return Err(Error::Configuration(
                "enclosure must be finite and > 0".into(),
            ));
        }
        if !aperture.is_finite() || aperture <= 0.0 || aperture >= enclosure {
            return Err(Error::Configuration(format!(
                "aperture must lie in (0, {enclosure}), got {aperture}"
            )));
        }
        let lo = (enclosure - aperture) / 2.0;
        let hi = (enclosure + aperture) / 2.0;
        Ok(Self {
            enclosure,
            aperture,
            obstacles: [
                Obstacle {
                    id: CORNER_LO,
                    pos: [enclosure, lo],
                },
                Obstacle {
                    id: CORNER_HI,
                    pos: [enclosure, hi],
                },
            ],
        })
    }

    /// Enclosure side length E.
    pub fn enclosure(&self) -> f64 {
        self.enclosure
    }

    /// Aperture height L.
    pub fn aperture(&self) -> f64 {
        self.aperture
    }

    /// Aperture endpoints (y_lo, y_hi) on x = E. Also the channel's bottom and top walls.
    pub fn aperture_bounds(&self) -> (f64, f64) {
        (self.obstacles[CORNER_LO].pos[1], self.obstacles[CORNER_HI].pos[1])
    }

    /// Range of center y for which a disk of `radius` fits through the aperture.
    /// Empty (lo > hi) when the disk is wider than the aperture.
    pub fn aperture_band(&self, radius: f64) -> (f64, f64) {
        let (lo, hi) = self.aperture_bounds();
        (lo + radius, hi - radius)
    }

    /// The point obstacle table.
    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    /// Look up a point obstacle by index.
    pub fn obstacle(&self, id: usize) -> Option<&Obstacle> {
        self.obstacles.get(id)
    }

    /// Region holding the disk center.
    ///
    /// Errors: `Error::InvariantViolation` if the center is outside C u H.
    pub fn region(&self, p: &Particle) -> Result<Region> {
        let [x, y] = p.r;
        let e = self.enclosure;
        let (lo, hi) = self.aperture_bounds();
        if (-EPS..e).contains(&x) && y >= -EPS && y <= e + EPS {
            return Ok(Region::Chamber);
        }
        if x >= e && x <= 2.0 * e + EPS && y >= lo - EPS && y <= hi + EPS {
            return Ok(Region::Channel);
        }
        Err(Error::InvariantViolation(format!(
            "particle {} is out of bounds: r = {:?}, v = {:?}",
            p.id, p.r, p.v
        )))
    }

    /// Next wall or corner event for particle `i`, or `None` if it never strikes
    /// a boundary (at rest).
    pub fn next_boundary_event(&self, i: usize, p: &Particle) -> Result<Option<Event>> {
        let wall = match self.region(p)? {
            Region::Chamber => self.from_chamber(p),
            Region::Channel => self.from_channel(p),
        };
        let hit = earliest(wall, self.nearest_corner(p));
        match hit {
            Some((t, Boundary::Wall(orientation))) => {
                Ok(Some(Event::new(t, EventKind::Wall { i, orientation })?))
            }
            Some((t, Boundary::Corner(obstacle))) => {
                Ok(Some(Event::new(t, EventKind::Corner { i, obstacle })?))
            }
            None => Ok(None),
        }
    }

    /// Earliest wall contact for a center in the chamber (x < E).
    fn from_chamber(&self, p: &Particle) -> Hit {
        let e = self.enclosure;
        let [x, y] = p.r;
        let [vx, vy] = p.v;
        let floor_or_ceiling = earliest(
            hit(p.time_to_horizontal_line(0.0), Boundary::Wall(WallOrientation::Vertical)),
            hit(p.time_to_horizontal_line(e), Boundary::Wall(WallOrientation::Vertical)),
        );
        if vx <= 0.0 {
            return earliest(
                hit(p.time_to_vertical_line(0.0), Boundary::Wall(WallOrientation::Horizontal)),
                floor_or_ceiling,
            );
        }

        // The edge reaches x = E before the center: solid wall unless the
        // contact point is in the opening. Infinite when the edge is already through.
        let t_right = p.time_to_vertical_line(e);
        if t_right.is_finite() {
            if let Some((t_y, _)) = floor_or_ceiling {
                if t_y < t_right {
                    return floor_or_ceiling;
                }
            }
            let y_right = y + vy * t_right;
            let (lo, hi) = self.aperture_bounds();
            if y_right <= lo || y_right >= hi {
                return hit(t_right, Boundary::Wall(WallOrientation::Horizontal));
            }
        }

        let t_cross = (e - x) / vx;
        let y_cross = y + vy * t_cross;
        let (band_lo, band_hi) = self.aperture_band(p.radius);
        if y_cross >= band_lo && y_cross <= band_hi {
            let mut entry = p.advanced(t_cross);
            entry.r[0] = e;
            return self
                .from_channel(&entry)
                .map(|(t, boundary)| (t + t_cross, boundary));
        }

        // The contact point on x = E lies inside the opening (or the edge is
        // already through it): one of the corners is struck before the center crosses.
        match self.nearest_corner(p) {
            Some(corner) => earliest(Some(corner), floor_or_ceiling),
            None => {
                warn!(
                    id = p.id,
                    x, y, vx, vy, "no corner contact predicted for a blocked aperture crossing"
                );
                earliest(
                    hit(t_right, Boundary::Wall(WallOrientation::Horizontal)),
                    floor_or_ceiling,
                )
            }
        }
    }

    /// Earliest wall contact for a center in the channel (x >= E).
    fn from_channel(&self, p: &Particle) -> Hit {
        let e = self.enclosure;
        let [x, y] = p.r;
        let [vx, vy] = p.v;
        let (lo, hi) = self.aperture_bounds();
        let channel_walls = earliest(
            hit(p.time_to_horizontal_line(lo), Boundary::Wall(WallOrientation::Vertical)),
            hit(p.time_to_horizontal_line(hi), Boundary::Wall(WallOrientation::Vertical)),
        );
        if vx >= 0.0 {
            return earliest(
                hit(
                    p.time_to_vertical_line(2.0 * e),
                    Boundary::Wall(WallOrientation::Horizontal),
                ),
                channel_walls,
            );
        }

        let t_back = (x - e) / -vx;
        if let Some((t_y, _)) = channel_walls {
            if t_y < t_back {
                return channel_walls;
            }
        }
        let y_back = y + vy * t_back;
        let (band_lo, band_hi) = self.aperture_band(p.radius);
        if y_back < band_lo || y_back > band_hi {
            // The aperture acts as a wall.
            return hit(t_back, Boundary::Wall(WallOrientation::Horizontal));
        }
        let mut exit = p.advanced(t_back);
        exit.r[0] = e;
        self.from_chamber(&exit)
            .map(|(t, boundary)| (t + t_back, boundary))
    }

    fn nearest_corner(&self, p: &Particle) -> Hit {
        self.obstacles
            .iter()
            .map(|o| hit(p.time_to_point(o.pos), Boundary::Corner(o.id)))
            .fold(None, earliest)
    }

    /// Nearest legal center position for `p`, snapping each violated constraint
    /// onto its boundary.
    fn project(&self, p: &Particle) -> Result<[f64; DIM]> {
        let e = self.enclosure;
        let r = p.radius;
        let (lo, hi) = self.aperture_bounds();
        let mut pos = p.r;
        pos[0] = pos[0].clamp(r, 2.0 * e - r);
        if pos[0] < e {
            pos[1] = pos[1].clamp(r, e - r);
            if (pos[1] <= lo || pos[1] >= hi) && pos[0] > e - r {
                pos[0] = e - r;
            }
            for o in &self.obstacles {
                let d = sub(&pos, &o.pos);
                let dist = dot(&d, &d).sqrt();
                if dist < r {
                    if dist == 0.0 {
                        return Err(self.violation(p, "center sits on an aperture corner"));
                    }
                    pos = [o.pos[0] + d[0] * r / dist, o.pos[1] + d[1] * r / dist];
                }
            }
        } else {
            let (band_lo, band_hi) = self.aperture_band(r);
            if band_lo > band_hi {
                return Err(self.violation(p, "disk is wider than the channel"));
            }
            pos[1] = pos[1].clamp(band_lo, band_hi);
        }
        Ok(pos)
    }

    /// Drift clamp: snap `p` back into the legal region.
    ///
    /// Returns the displacement applied. Errors with `InvariantViolation` if the
    /// disk was outside the legal region by more than `EPS`.
    pub fn clamp(&self, p: &mut Particle) -> Result<f64> {
        let pos = self.project(p)?;
        let d = sub(&pos, &p.r);
        let moved = dot(&d, &d).sqrt();
        if moved > EPS {
            return Err(self.violation(
                p,
                &format!("outside the legal region by {moved:e}"),
            ));
        }
        p.r = pos;
        Ok(moved)
    }

    /// True if the disk lies inside C u H (solid-disk constraint) within `tol`.
    pub fn contains(&self, p: &Particle, tol: f64) -> bool {
        match self.project(p) {
            Ok(pos) => {
                let d = sub(&pos, &p.r);
                dot(&d, &d).sqrt() <= tol
            }
            Err(_) => false,
        }
    }

    fn violation(&self, p: &Particle, what: &str) -> Error {
        Error::InvariantViolation(format!(
            "particle {} {what}: r = {:?}, v = {:?}, radius = {}",
            p.id, p.r, p.v, p.radius
        ))
    }
}

#[inline]
fn hit(t: f64, boundary: Boundary) -> Hit {
    t.is_finite().then_some((t, boundary))
}

/// Earlier of two candidates; the first wins ties.
#[inline]
fn earliest(a: Hit, b: Hit) -> Hit {
    match (a, b) {
        (Some(x), Some(y)) => Some(if y.0 < x.0 { y } else { x }),
        (x, None) => x,
        (None, y) => y,
    }
}
