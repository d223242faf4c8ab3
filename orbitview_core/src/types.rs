//! Snapshot data model shared with the simulation collaborator.
//!
//! The core only reads these values. Field names follow the wire shape the
//! simulation emits (`id, mass, position, velocity, radius, color`).

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

/// Identifier of a body within a snapshot.
pub type BodyId = u32;

/// A 2D position or velocity in simulation space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };
    
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
    
    pub fn distance(&self, other: &Vec2) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
    
    pub fn scaled(self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }
}

impl std::ops::Add for Vec2 {
    type Output = Vec2;
    
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Vec2;
    
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl From<Vec2> for Point2<f64> {
    fn from(v: Vec2) -> Self {
        Point2::new(v.x, v.y)
    }
}

impl From<Point2<f64>> for Vec2 {
    fn from(p: Point2<f64>) -> Self {
        Vec2::new(p.x, p.y)
    }
}

impl From<Vector2<f64>> for Vec2 {
    fn from(v: Vector2<f64>) -> Self {
        Vec2::new(v.x, v.y)
    }
}

/// One point mass as delivered in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    /// Unique within a snapshot, stable while the body persists
    pub id: BodyId,
    
    /// Display-only in the viewer
    pub mass: f64,
    
    pub position: Vec2,
    
    pub velocity: Vec2,
    
    /// Circle radius in simulation units (> 0)
    pub radius: f64,
    
    /// "#RRGGBB"
    pub color: String,
}

impl Body {
    /// Convenience constructor for a body at rest.
    pub fn at_rest(id: BodyId, position: Vec2, radius: f64, color: &str) -> Self {
        Self {
            id,
            mass: 1.0,
            position,
            velocity: Vec2::ZERO,
            radius,
            color: color.to_string(),
        }
    }
    
    /// Returns true if `point` lies inside or on the body's circle.
    pub fn contains(&self, point: Vec2) -> bool {
        self.position.distance(&point) <= self.radius
    }
}

/// Opaque RGB color decoded from a body's hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb { r: 255, g: 255, b: 255 };
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
    
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
    
    /// Decodes "#RRGGBB" (the leading '#' is optional).
    ///
    /// Input is not validated: a channel whose two characters are missing or
    /// not hex decodes to 0.
    pub fn from_hex(s: &str) -> Self {
        let hex = s.strip_prefix('#').unwrap_or(s);
        let channel = |i: usize| {
            hex.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .unwrap_or(0)
        };
        Self::new(channel(0), channel(2), channel(4))
    }
    
    pub fn with_alpha(self, a: f64) -> Rgba {
        Rgba {
            r: self.r,
            g: self.g,
            b: self.b,
            a: a.clamp(0.0, 1.0),
        }
    }
}

/// RGB plus a straight alpha in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Rgba {
    pub fn opaque(rgb: Rgb) -> Self {
        rgb.with_alpha(1.0)
    }
    
    pub fn rgb(&self) -> Rgb {
        Rgb::new(self.r, self.g, self.b)
    }
}
