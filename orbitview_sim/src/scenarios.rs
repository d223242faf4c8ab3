//! Scenes the harness can drive the viewer with.

use crate::context::SimContext;
use crate::physics::{NBodySystem, GRAVITY};
use orbitview_core::{Body, BodyId, Vec2};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal, Uniform};

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// Sun, planets and moons on circular orbits
    Solar,
    
    /// Seeded random cluster around a heavy core
    Cluster,
    
    /// Solar scene where one planet drops out of snapshots periodically
    Flicker,
}

/// Body removed from every `period`-th snapshot and restored on the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlickerPlan {
    pub body: BodyId,
    pub period: u64,
}

impl FlickerPlan {
    /// True if the body is absent from snapshot number `index`.
    pub fn hidden_at(&self, index: u64) -> bool {
        self.period > 0 && index % self.period == self.period - 1
    }
}

/// Everything a run needs from a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioSetup {
    pub system: NBodySystem,
    pub flicker: Option<FlickerPlan>,
}

const CLUSTER_SIZE: usize = 24;
const CLUSTER_SPREAD: f64 = 180.0;
const CLUSTER_PALETTE: [&str; 6] = ["#ff9999", "#3366ff", "#ff6600", "#33ccff", "#99ff66", "#cc66ff"];

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![ScenarioId::Solar, ScenarioId::Cluster, ScenarioId::Flicker]
    }
    
    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Solar => "solar",
            ScenarioId::Cluster => "cluster",
            ScenarioId::Flicker => "flicker",
        }
    }
    
    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Solar => "Sun, 4 planets and 2 moons on circular orbits",
            ScenarioId::Cluster => "24 seeded bodies orbiting a heavy core",
            ScenarioId::Flicker => "Solar scene with body 3 missing from every 5th snapshot",
        }
    }
    
    /// Builds the initial system (seeded scenarios draw from `ctx`).
    pub fn build(&self, ctx: &SimContext) -> ScenarioSetup {
        match self {
            ScenarioId::Solar => ScenarioSetup {
                system: NBodySystem::solar_system(),
                flicker: None,
            },
            ScenarioId::Cluster => ScenarioSetup {
                system: NBodySystem::new(cluster(ctx)),
                flicker: None,
            },
            ScenarioId::Flicker => ScenarioSetup {
                system: NBodySystem::solar_system(),
                flicker: Some(FlickerPlan { body: 3, period: 5 }),
            },
        }
    }
}

fn cluster(ctx: &SimContext) -> Vec<Body> {
    let mut rng = ctx.rng(1);
    let core_mass = 5.0e3;
    let mut bodies = vec![Body {
        id: 1,
        mass: core_mass,
        position: Vec2::ZERO,
        velocity: Vec2::ZERO,
        radius: 20.0,
        color: "#ffcc00".to_string(),
    }];
    
    let masses = Uniform::new(20.0, 200.0);
    
    while bodies.len() <= CLUSTER_SIZE {
        let x: f64 = rng.sample(StandardNormal);
        let y: f64 = rng.sample(StandardNormal);
        let position = Vec2::new(x, y).scaled(CLUSTER_SPREAD);
        let r = position.distance(&Vec2::ZERO);
        // Keep clear of the core
        if r < 60.0 {
            continue;
        }
        let mass = masses.sample(&mut rng);
        let speed = (GRAVITY * core_mass / r).sqrt();
        let tangent = Vec2::new(-position.y / r, position.x / r);
        let color = CLUSTER_PALETTE[rng.gen_range(0..CLUSTER_PALETTE.len())];
        
        bodies.push(Body {
            id: (bodies.len() + 1) as BodyId,
            mass,
            position,
            velocity: tangent.scaled(speed),
            radius: 2.0 + mass.sqrt() / 2.0,
            color: color.to_string(),
        });
    }
    bodies
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;
    
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "solar" | "solar_system" | "default" => Ok(ScenarioId::Solar),
            "cluster" => Ok(ScenarioId::Cluster),
            "flicker" => Ok(ScenarioId::Flicker),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_names_round_trip() {
        for scenario in ScenarioId::all() {
            assert_eq!(scenario.name().parse::<ScenarioId>(), Ok(scenario));
        }
        assert!("nebula".parse::<ScenarioId>().is_err());
    }
    
    #[test]
    fn test_cluster_is_seeded() {
        let a = ScenarioId::Cluster.build(&SimContext::new(9)).system;
        let b = ScenarioId::Cluster.build(&SimContext::new(9)).system;
        let c = ScenarioId::Cluster.build(&SimContext::new(10)).system;
        
        assert_eq!(a.bodies().len(), CLUSTER_SIZE + 1);
        assert_eq!(a.bodies(), b.bodies());
        assert_ne!(a.bodies(), c.bodies());
        assert!(a.bodies()[1..].iter().all(|body| body.position.distance(&Vec2::ZERO) >= 60.0));
    }
    
    #[test]
    fn test_flicker_hides_every_fifth_snapshot() {
        let plan = ScenarioId::Flicker
            .build(&SimContext::new(1))
            .flicker
            .unwrap();
        let hidden: Vec<u64> = (0..12).filter(|i| plan.hidden_at(*i)).collect();
        assert_eq!(hidden, vec![4, 9]);
    }
}
