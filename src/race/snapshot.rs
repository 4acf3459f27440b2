use serde::{Deserialize, Serialize};

use crate::terrain::TerrainSegment;
use crate::turtle::TurtleState;

/// Complete, read-only picture of race state at a specific tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceSnapshot {
    pub tick: u64,
    pub elapsed_ms: u64,
    pub track_length: f64,
    pub turtles: Vec<TurtleState>,
    pub terrain_ahead: Vec<TerrainSegment>,
    pub finished: bool,
    pub winner_id: Option<String>,
}
