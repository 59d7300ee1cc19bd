//! Line-of-sight validation against an obstacle mask
//!
//! The physics collaborator answers one question: is there anything solid
//! between two points? [`ObstacleQuery`] is that seam. [`ObstacleMask`] is a
//! plain geometric implementation for levels that describe their own walls.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Answers segment-vs-obstacle queries
pub trait ObstacleQuery {
    fn has_obstacle_between(&self, a: Vec2, b: Vec2) -> bool;
}

/// True when nothing blocks the straight segment from `a` to `b`
#[inline]
pub fn line_of_sight(query: &dyn ObstacleQuery, a: Vec2, b: Vec2) -> bool {
    !query.has_obstacle_between(a, b)
}

/// A solid shape on the obstacle layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Obstacle {
    Circle { center: Vec2, radius: f32 },
    /// Axis-aligned box
    Rect { min: Vec2, max: Vec2 },
}

impl Obstacle {
    /// Does the segment `a -> b` touch this shape?
    pub fn intersects_segment(&self, a: Vec2, b: Vec2) -> bool {
        match *self {
            Obstacle::Circle { center, radius } => {
                let closest = closest_point_on_segment(a, b, center);
                (center - closest).length_squared() < radius * radius
            }
            Obstacle::Rect { min, max } => segment_hits_rect(a, b, min, max),
        }
    }
}

/// Closest point to `p` on the segment `a -> b`
pub fn closest_point_on_segment(a: Vec2, b: Vec2, p: Vec2) -> Vec2 {
    let line = b - a;
    let len_sq = line.length_squared();
    if len_sq < 1e-8 {
        return a; // Degenerate segment
    }
    let t = ((p - a).dot(line) / len_sq).clamp(0.0, 1.0);
    a + line * t
}

/// Slab test for a segment against an axis-aligned box
fn segment_hits_rect(a: Vec2, b: Vec2, min: Vec2, max: Vec2) -> bool {
    let dir = b - a;
    let mut t_min = 0.0_f32;
    let mut t_max = 1.0_f32;

    for axis in 0..2 {
        let (origin, d, lo, hi) = (a[axis], dir[axis], min[axis], max[axis]);
        if d.abs() < 1e-8 {
            // Parallel to this slab: must start inside it
            if origin < lo || origin > hi {
                return false;
            }
        } else {
            let inv = 1.0 / d;
            let mut t0 = (lo - origin) * inv;
            let mut t1 = (hi - origin) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return false;
            }
        }
    }
    true
}

/// The level's static obstacle layer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObstacleMask {
    pub obstacles: Vec<Obstacle>,
}

impl ObstacleMask {
    pub fn new(obstacles: Vec<Obstacle>) -> Self {
        Self { obstacles }
    }
}

impl ObstacleQuery for ObstacleMask {
    fn has_obstacle_between(&self, a: Vec2, b: Vec2) -> bool {
        self.obstacles.iter().any(|o| o.intersects_segment(a, b))
    }
}

/// An open field; every connection is possible
#[derive(Debug, Clone, Copy, Default)]
pub struct NoObstacles;

impl ObstacleQuery for NoObstacles {
    fn has_obstacle_between(&self, _a: Vec2, _b: Vec2) -> bool {
        false
    }
}
