//! Turtle physics (C3): a pure per-tick update over one turtle's state.

use serde::{Deserialize, Serialize};

use crate::terrain::{TerrainSegment, TerrainType};
use crate::{DRAIN_BASE, RECOVERY_RATE, SPEED_SCALE};

/// Input roster entry. Stats are non-negative; `genome` is opaque here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurtleSpec {
    pub id: String,
    pub name: String,
    pub genome: String,
    pub speed: f64,
    pub max_energy: f64,
    pub recovery: f64,
    pub swim: f64,
    pub climb: f64,
}

/// Per-tick turtle state. Invariants (monotonic `x`, energy clamp, rest
/// coupling, finish latch) are enforced entirely by [`step`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurtleState {
    pub id: String,
    pub name: String,
    pub genome: String,
    pub x: f64,
    pub y: f64,
    pub angle: f64,
    pub current_energy: f64,
    pub max_energy: f64,
    pub is_resting: bool,
    pub finished: bool,
    pub rank: Option<u32>,
    speed: f64,
    recovery: f64,
    swim: f64,
    climb: f64,
}

impl TurtleState {
    pub fn from_spec(spec: &TurtleSpec, lane: f64) -> Self {
        Self {
            id: spec.id.clone(),
            name: spec.name.clone(),
            genome: spec.genome.clone(),
            x: 0.0,
            y: lane,
            angle: 0.0,
            current_energy: spec.max_energy,
            max_energy: spec.max_energy,
            is_resting: false,
            finished: false,
            rank: None,
            speed: spec.speed,
            recovery: spec.recovery,
            swim: spec.swim,
            climb: spec.climb,
        }
    }
}

/// Forward-speed multiplier for this turtle on this terrain type.
/// `water`/`rock` depend on the turtle's own `swim`/`climb`; everything
/// else is a fixed design-level constant.
pub fn terrain_multiplier(terrain_type: TerrainType, swim: f64, climb: f64) -> f64 {
    match terrain_type {
        TerrainType::Water => swim / 10.0,
        TerrainType::Rock => climb / 10.0,
        other => other.base_multiplier().expect("non-stat-dependent terrain"),
    }
}

/// One deterministic physics tick for a single turtle, given the segment
/// under its current `x`. `dt_ticks` is normally `1` but is exposed so the
/// orchestrator can express catch-up in whole ticks without changing the
/// per-tick math (see spec section 4.5's backpressure policy, which drops
/// surplus rather than compressing it into a fractional tick).
pub fn step(
    turtle: &mut TurtleState,
    segment: TerrainSegment,
    track_length: f64,
    resume_threshold: f64,
    dt_ticks: f64,
) {
    if turtle.finished {
        return;
    }

    if turtle.is_resting {
        turtle.current_energy =
            (turtle.current_energy + turtle.recovery * RECOVERY_RATE * dt_ticks)
                .min(turtle.max_energy);
        if turtle.current_energy >= resume_threshold * turtle.max_energy {
            turtle.is_resting = false;
        }
        return;
    }

    let multiplier = terrain_multiplier(segment.terrain_type, turtle.swim, turtle.climb);
    let base = turtle.speed * multiplier;
    let dx = base * SPEED_SCALE * dt_ticks;
    turtle.x += dx;

    let drain = DRAIN_BASE * segment.terrain_type.drain_difficulty() * dt_ticks;
    turtle.current_energy -= drain;
    if turtle.current_energy <= 0.0 {
        turtle.current_energy = 0.0;
        turtle.is_resting = true;
    }

    if turtle.x >= track_length {
        turtle.x = track_length;
        turtle.finished = true;
    }
}
