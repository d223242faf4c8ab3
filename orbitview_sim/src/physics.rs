//! Ground-truth n-body physics.
//!
//! The physics engine produces the snapshots the viewer consumes:
//! - Pairwise Newtonian gravity with a close-range distance clamp
//! - Semi-implicit Euler integration at a fixed step
//! - Impulse-based collision response with positional correction

use nalgebra::Vector2;
use orbitview_core::{Body, BodyId, Vec2};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::debug;

/// Gravitational constant in simulation units.
pub const GRAVITY: f64 = 6.67430e-1;

/// Base integration step in seconds, before the time multiplier.
pub const TIME_STEP: f64 = 0.01;

const RESTITUTION: f64 = 0.7;

/// Fraction of the overlap removed per collision.
const CORRECTION_PERCENT: f64 = 0.4;

/// Gravity treats bodies closer than this fraction of their summed radii as
/// being exactly that far apart.
const CLAMP_FACTOR: f64 = 0.8;

/// Partial edit of one body; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BodyPatch {
    pub mass: Option<f64>,
    pub position_x: Option<f64>,
    pub position_y: Option<f64>,
    pub velocity_x: Option<f64>,
    pub velocity_y: Option<f64>,
    pub radius: Option<f64>,
    pub color: Option<String>,
}

impl BodyPatch {
    fn apply(self, body: &mut Body) {
        if let Some(m) = self.mass {
            body.mass = m;
        }
        if let Some(px) = self.position_x {
            body.position.x = px;
        }
        if let Some(py) = self.position_y {
            body.position.y = py;
        }
        if let Some(vx) = self.velocity_x {
            body.velocity.x = vx;
        }
        if let Some(vy) = self.velocity_y {
            body.velocity.y = vy;
        }
        if let Some(r) = self.radius {
            body.radius = r;
        }
        if let Some(c) = self.color {
            body.color = c;
        }
    }
}

/// A set of gravitating bodies and the clock that advances them.
#[derive(Debug, Clone)]
pub struct NBodySystem {
    bodies: Vec<Body>,
    initial: Vec<Body>,
    time_step: f64,
    time_multiplier: f64,
    gravity: f64,
    running: bool,
    elapsed: f64,
}

impl NBodySystem {
    /// Creates a stopped system; `reset` returns to these bodies.
    pub fn new(bodies: Vec<Body>) -> Self {
        Self {
            initial: bodies.clone(),
            bodies,
            time_step: TIME_STEP,
            time_multiplier: 1.0,
            gravity: GRAVITY,
            running: false,
            elapsed: 0.0,
        }
    }
    
    /// Sun, four planets on circular orbits and two moons around body 3.
    pub fn solar_system() -> Self {
        let sun_mass = 8.0e3;
        let mut bodies = vec![Body {
            id: 1,
            mass: sun_mass,
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            radius: 25.0,
            color: "#ffcc00".to_string(),
        }];
        
        let planets = [
            (1.0e3, 120.0, 10.0, "#ff9999"),
            (1.5e3, 200.0, 12.0, "#3366ff"),
            (3.0e3, 350.0, 18.0, "#ff6600"),
            (2.0e3, 450.0, 15.0, "#33ccff"),
        ];
        for (i, &(mass, distance, radius, color)) in planets.iter().enumerate() {
            let angle = 2.0 * PI * i as f64 / planets.len() as f64;
            bodies.push(orbiting(
                (i + 2) as BodyId,
                mass,
                radius,
                color,
                &bodies[0],
                distance,
                angle,
            ));
        }
        
        let moons = [(100.0, 35.0, 4.0, "#cccccc"), (50.0, 25.0, 3.0, "#aaaaaa")];
        let host = bodies[2].clone();
        for (i, &(mass, distance, radius, color)) in moons.iter().enumerate() {
            let angle = PI * i as f64 / moons.len() as f64;
            let id = (bodies.len() + 1) as BodyId;
            bodies.push(orbiting(id, mass, radius, color, &host, distance, angle));
        }
        
        Self::new(bodies)
    }
    
    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }
    
    /// Owned copy of the current bodies, as delivered to a viewer.
    pub fn snapshot(&self) -> Vec<Body> {
        self.bodies.clone()
    }
    
    pub fn is_running(&self) -> bool {
        self.running
    }
    
    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }
    
    pub fn time_multiplier(&self) -> f64 {
        self.time_multiplier
    }
    
    pub fn set_time_multiplier(&mut self, multiplier: f64) {
        self.time_multiplier = multiplier;
    }
    
    /// Simulated seconds since the last reset.
    pub fn elapsed_time(&self) -> f64 {
        self.elapsed
    }
    
    /// Restores the initial bodies, stops the clock and zeroes elapsed time.
    pub fn reset(&mut self) {
        self.bodies = self.initial.clone();
        self.time_multiplier = 1.0;
        self.running = false;
        self.elapsed = 0.0;
    }
    
    /// Applies `patch` to body `id`. Returns false if no such body exists.
    pub fn update_body(&mut self, id: BodyId, patch: BodyPatch) -> bool {
        match self.bodies.iter_mut().find(|b| b.id == id) {
            Some(body) => {
                patch.apply(body);
                true
            }
            None => false,
        }
    }
    
    /// Removes body `id` and returns it.
    pub fn remove_body(&mut self, id: BodyId) -> Option<Body> {
        let index = self.bodies.iter().position(|b| b.id == id)?;
        Some(self.bodies.remove(index))
    }
    
    /// Adds or replaces a body.
    pub fn insert_body(&mut self, body: Body) {
        match self.bodies.iter_mut().find(|b| b.id == body.id) {
            Some(existing) => *existing = body,
            None => self.bodies.push(body),
        }
    }
    
    /// Total linear momentum.
    pub fn momentum(&self) -> Vector2<f64> {
        self.bodies
            .iter()
            .map(|b| Vector2::new(b.velocity.x, b.velocity.y) * b.mass)
            .sum()
    }
    
    /// Advances one step. Does nothing (and returns false) while stopped.
    pub fn step(&mut self) -> bool {
        if !self.running {
            return false;
        }
        let dt = self.time_step * self.time_multiplier;
        let forces = self.forces();
        
        for (body, force) in self.bodies.iter_mut().zip(forces) {
            let acceleration = force / body.mass;
            body.velocity.x += acceleration.x * dt;
            body.velocity.y += acceleration.y * dt;
            body.position.x += body.velocity.x * dt;
            body.position.y += body.velocity.y * dt;
        }
        
        let collisions = self.resolve_collisions();
        if collisions > 0 {
            debug!(collisions, t = self.elapsed, "collisions resolved");
        }
        
        self.elapsed += dt;
        true
    }
    
    fn forces(&self) -> Vec<Vector2<f64>> {
        let mut forces = vec![Vector2::zeros(); self.bodies.len()];
        
        for i in 0..self.bodies.len() {
            for j in (i + 1)..self.bodies.len() {
                let (a, b) = (&self.bodies[i], &self.bodies[j]);
                let delta = Vector2::new(b.position.x - a.position.x, b.position.y - a.position.y);
                let dist = delta.norm();
                if dist == 0.0 {
                    continue;
                }
                let clamped = dist.max((a.radius + b.radius) * CLAMP_FACTOR);
                let magnitude = self.gravity * a.mass * b.mass / (clamped * clamped);
                let force = delta * (magnitude / dist);
                
                forces[i] += force;
                forces[j] -= force;
            }
        }
        forces
    }
    
    /// Detects all overlapping pairs first, then applies their impulses and
    /// corrections together. Returns the number of pairs resolved.
    fn resolve_collisions(&mut self) -> usize {
        let mut corrections = Vec::new();
        
        for i in 0..self.bodies.len() {
            for j in (i + 1)..self.bodies.len() {
                let (a, b) = (&self.bodies[i], &self.bodies[j]);
                let distance = a.position.distance(&b.position);
                let reach = a.radius + b.radius;
                if distance >= reach {
                    continue;
                }
                
                let normal = Vector2::new(b.position.x - a.position.x, b.position.y - a.position.y)
                    / distance.max(0.001);
                let relative = Vector2::new(b.velocity.x - a.velocity.x, b.velocity.y - a.velocity.y);
                let approach = relative.dot(&normal);
                // Already separating
                if approach >= 0.0 {
                    continue;
                }
                
                let (inv_a, inv_b) = (1.0 / a.mass, 1.0 / b.mass);
                let inv_sum = inv_a + inv_b;
                let impulse = normal * (-(1.0 + RESTITUTION) * approach / inv_sum);
                let correction = normal * ((reach - distance) * CORRECTION_PERCENT);
                
                corrections.push((
                    i,
                    j,
                    -impulse * inv_a,
                    impulse * inv_b,
                    -correction * (inv_a / inv_sum),
                    correction * (inv_b / inv_sum),
                ));
            }
        }
        
        let count = corrections.len();
        for (i, j, dv_i, dv_j, dp_i, dp_j) in corrections {
            nudge(&mut self.bodies[i], dv_i, dp_i);
            nudge(&mut self.bodies[j], dv_j, dp_j);
        }
        count
    }
}

impl Default for NBodySystem {
    fn default() -> Self {
        Self::solar_system()
    }
}

fn nudge(body: &mut Body, dv: Vector2<f64>, dp: Vector2<f64>) {
    body.velocity.x += dv.x;
    body.velocity.y += dv.y;
    body.position.x += dp.x;
    body.position.y += dp.y;
}

/// A body on a circular orbit around `host`, starting at `angle`.
fn orbiting(
    id: BodyId,
    mass: f64,
    radius: f64,
    color: &str,
    host: &Body,
    distance: f64,
    angle: f64,
) -> Body {
    let speed = (GRAVITY * host.mass / distance).sqrt();
    Body {
        id,
        mass,
        position: Vec2::new(
            host.position.x + angle.cos() * distance,
            host.position.y + angle.sin() * distance,
        ),
        velocity: Vec2::new(
            host.velocity.x - angle.sin() * speed,
            host.velocity.y + angle.cos() * speed,
        ),
        radius,
        color: color.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    
    #[test]
    fn test_solar_system_layout() {
        let system = NBodySystem::solar_system();
        let ids: Vec<BodyId> = system.bodies().iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6, 7]);
        
        let sun = &system.bodies()[0];
        assert_eq!(sun.color, "#ffcc00");
        assert_eq!(sun.radius, 25.0);
        
        // Planet 2 sits at 120 on the +x axis moving along +y
        let first = &system.bodies()[1];
        assert_relative_eq!(first.position.x, 120.0);
        assert_relative_eq!(first.velocity.y, (GRAVITY * 8.0e3 / 120.0).sqrt());
        
        // Moons orbit body 3 at 35 and 25
        let host = system.bodies()[2].position;
        assert_relative_eq!(system.bodies()[5].position.distance(&host), 35.0, epsilon = 1e-9);
        assert_relative_eq!(system.bodies()[6].position.distance(&host), 25.0, epsilon = 1e-9);
    }
    
    #[test]
    fn test_step_requires_running() {
        let mut system = NBodySystem::solar_system();
        let before = system.snapshot();
        
        assert!(!system.step());
        assert_eq!(system.bodies(), before.as_slice());
        assert_eq!(system.elapsed_time(), 0.0);
        
        system.set_running(true);
        assert!(system.step());
        assert_ne!(system.bodies(), before.as_slice());
        assert_relative_eq!(system.elapsed_time(), TIME_STEP);
    }
    
    #[test]
    fn test_time_multiplier_scales_step() {
        let mut system = NBodySystem::solar_system();
        system.set_running(true);
        system.set_time_multiplier(2.5);
        system.step();
        assert_relative_eq!(system.elapsed_time(), 0.025);
    }
    
    #[test]
    fn test_gravity_conserves_momentum() {
        let mut system = NBodySystem::solar_system();
        system.set_running(true);
        let initial = system.momentum();
        for _ in 0..500 {
            system.step();
        }
        let drift = (system.momentum() - initial).norm();
        assert!(drift < 1e-6, "momentum drifted by {drift}");
    }
    
    #[test]
    fn test_head_on_collision_separates_bodies() {
        let mut a = Body::at_rest(1, Vec2::new(-4.0, 0.0), 5.0, "#ffffff");
        let mut b = Body::at_rest(2, Vec2::new(4.0, 0.0), 5.0, "#ffffff");
        a.velocity = Vec2::new(10.0, 0.0);
        b.velocity = Vec2::new(-10.0, 0.0);
        let mut system = NBodySystem::new(vec![a, b]);
        system.set_running(true);
        system.step();
        
        let bodies = system.bodies();
        assert!(bodies[0].velocity.x < 0.0);
        assert!(bodies[1].velocity.x > 0.0);
        // Equal masses: the exchange is symmetric
        assert_relative_eq!(bodies[0].velocity.x, -bodies[1].velocity.x, epsilon = 1e-9);
    }
    
    #[test]
    fn test_update_body_applies_only_given_fields() {
        let mut system = NBodySystem::solar_system();
        let before = system.bodies()[2].clone();
        
        let patch = BodyPatch {
            mass: Some(42.0),
            color: Some("#00ff00".to_string()),
            ..BodyPatch::default()
        };
        assert!(system.update_body(3, patch));
        
        let after = &system.bodies()[2];
        assert_eq!(after.mass, 42.0);
        assert_eq!(after.color, "#00ff00");
        assert_eq!(after.position, before.position);
        assert_eq!(after.radius, before.radius);
        
        assert!(!system.update_body(99, BodyPatch::default()));
    }
    
    #[test]
    fn test_reset_restores_initial_state() {
        let mut system = NBodySystem::solar_system();
        let initial = system.snapshot();
        system.set_running(true);
        system.set_time_multiplier(3.0);
        system.remove_body(7);
        for _ in 0..10 {
            system.step();
        }
        
        system.reset();
        assert_eq!(system.bodies(), initial.as_slice());
        assert!(!system.is_running());
        assert_eq!(system.elapsed_time(), 0.0);
        assert_eq!(system.time_multiplier(), 1.0);
    }
    
    fn random_body() -> impl Strategy<Value = (f64, f64, f64, f64, f64, f64)> {
        (
            -200.0..200.0f64,
            -200.0..200.0f64,
            -50.0..50.0f64,
            -50.0..50.0f64,
            1.0..100.0f64,
            2.0..15.0f64,
        )
    }
    
    proptest! {
        #[test]
        fn prop_momentum_survives_gravity_and_collisions(
            specs in prop::collection::vec(random_body(), 2..6),
            steps in 1usize..60,
        ) {
            let bodies = specs
                .iter()
                .enumerate()
                .map(|(i, &(x, y, vx, vy, mass, radius))| Body {
                    id: i as BodyId,
                    mass,
                    position: Vec2::new(x, y),
                    velocity: Vec2::new(vx, vy),
                    radius,
                    color: "#ffffff".to_string(),
                })
                .collect();
            let mut system = NBodySystem::new(bodies);
            system.set_running(true);
            let initial = system.momentum();
            let scale: f64 = specs.iter().map(|s| s.4 * (s.2.abs() + s.3.abs())).sum();
            
            for _ in 0..steps {
                system.step();
            }
            let drift = (system.momentum() - initial).norm();
            prop_assert!(drift <= 1e-9 * (1.0 + scale) * steps as f64, "drift {}", drift);
        }
    }
}
