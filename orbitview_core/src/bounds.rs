//! Enclosing box of all bodies and their trails.

use serde::{Deserialize, Serialize};

use crate::trails::TrailStore;
use crate::types::{Body, Vec2};

/// Axis-aligned box in simulation space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Bounds {
    fn around(center: Vec2, radius: f64) -> Self {
        Self {
            min_x: center.x - radius,
            max_x: center.x + radius,
            min_y: center.y - radius,
            max_y: center.y + radius,
        }
    }
    
    fn include(&mut self, center: Vec2, radius: f64) {
        self.min_x = self.min_x.min(center.x - radius);
        self.max_x = self.max_x.max(center.x + radius);
        self.min_y = self.min_y.min(center.y - radius);
        self.max_y = self.max_y.max(center.y + radius);
    }
    
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }
    
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
    
    pub fn center(&self) -> Vec2 {
        Vec2::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }
    
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }
}

/// Smallest box containing every body circle and every stored trail point.
///
/// Returns `None` for an empty snapshot so the camera keeps its last target.
pub fn compute(bodies: &[Body], trails: &TrailStore) -> Option<Bounds> {
    let (first, rest) = bodies.split_first()?;
    let mut bounds = Bounds::around(first.position, first.radius);
    
    for body in rest {
        bounds.include(body.position, body.radius);
    }
    for trail in trails.iter() {
        for point in trail.positions() {
            bounds.include(*point, 0.0);
        }
    }
    
    Some(bounds)
}
