use crate::race::snapshot::RaceSnapshot;
use crate::terrain::Terrain;
use crate::turtle::{self, TurtleSpec, TurtleState};

/// Owns the mutable race state and advances it one deterministic tick at a
/// time (C4). No wall-clock, no randomness beyond the seeded terrain that
/// built `terrain`.
#[derive(Debug, Clone)]
pub struct Race {
    terrain: Terrain,
    turtles: Vec<TurtleState>,
    tick: u64,
    finish_order: Vec<String>,
    finished: bool,
    resume_threshold: f64,
    max_ticks: u64,
    physics_hz: u32,
}

impl Race {
    pub fn new(
        specs: &[TurtleSpec],
        terrain: Terrain,
        resume_threshold: f64,
        max_ticks: u64,
        physics_hz: u32,
    ) -> Self {
        let mut turtles: Vec<TurtleState> = specs
            .iter()
            .enumerate()
            .map(|(i, spec)| TurtleState::from_spec(spec, i as f64))
            .collect();
        turtles.sort_by(|a, b| a.id.cmp(&b.id));
        Self {
            terrain,
            turtles,
            tick: 0,
            finish_order: Vec::new(),
            finished: false,
            resume_threshold,
            max_ticks,
            physics_hz,
        }
    }

    /// Rebuilds initial state from a fresh roster and track: all energies
    /// full, nobody resting or finished, tick reset to zero.
    pub fn reset(&mut self, specs: &[TurtleSpec], terrain: Terrain) {
        let rebuilt = Self::new(
            specs,
            terrain,
            self.resume_threshold,
            self.max_ticks,
            self.physics_hz,
        );
        *self = rebuilt;
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn track_length(&self) -> f64 {
        self.terrain.track_length()
    }

    /// Advances every unfinished turtle by one tick, assigns ranks to any
    /// turtle that crossed the line this tick, and latches `finished` once
    /// every turtle has crossed or the safety cap is hit.
    pub fn step(&mut self) {
        if self.finished {
            return;
        }
        self.tick += 1;

        let track_length = self.terrain.track_length();
        let mut just_finished: Vec<usize> = Vec::new();
        for (idx, turtle) in self.turtles.iter_mut().enumerate() {
            if turtle.finished {
                continue;
            }
            let segment = self.terrain.terrain_at(turtle.x);
            let was_finished = turtle.finished;
            turtle::step(turtle, segment, track_length, self.resume_threshold, 1.0);
            if turtle.finished && !was_finished {
                just_finished.push(idx);
            }
        }

        just_finished.sort_by(|&a, &b| {
            self.turtles[b]
                .x
                .partial_cmp(&self.turtles[a].x)
                .unwrap()
                .then_with(|| self.turtles[a].id.cmp(&self.turtles[b].id))
        });
        for idx in just_finished {
            self.finish_order.push(self.turtles[idx].id.clone());
            self.turtles[idx].rank = Some(self.finish_order.len() as u32);
        }

        let all_finished = self.turtles.iter().all(|t| t.finished);
        if all_finished || self.tick >= self.max_ticks {
            self.finished = true;
        }
    }

    /// Builds a `RaceSnapshot` reflecting current state. The leader's `x`
    /// anchors the `terrain_ahead` window.
    pub fn snapshot(&self, segments_ahead: usize) -> RaceSnapshot {
        let leader_x = self
            .turtles
            .iter()
            .map(|t| t.x)
            .fold(0.0_f64, f64::max);
        let winner_id = self
            .turtles
            .iter()
            .find(|t| t.rank == Some(1))
            .map(|t| t.id.clone());
        RaceSnapshot {
            tick: self.tick,
            elapsed_ms: self.tick * 1000 / self.physics_hz as u64,
            track_length: self.terrain.track_length(),
            turtles: self.turtles.clone(),
            terrain_ahead: self.terrain.segments_after(leader_x, segments_ahead),
            finished: self.finished,
            winner_id,
        }
    }

    pub fn finish_order(&self) -> &[String] {
        &self.finish_order
    }

    /// Checks the invariants `step` is supposed to uphold on its own
    /// (finite, non-negative position; energy within `[0, max_energy]`).
    /// The orchestrator treats a violation as fatal (spec section 7):
    /// engine corruption, not a recoverable per-tick condition.
    pub fn check_invariants(&self) -> Result<(), String> {
        for turtle in &self.turtles {
            if !turtle.x.is_finite() || turtle.x < 0.0 {
                return Err(format!(
                    "turtle {} has an invalid position x={}",
                    turtle.id, turtle.x
                ));
            }
            if !turtle.current_energy.is_finite()
                || turtle.current_energy < 0.0
                || turtle.current_energy > turtle.max_energy
            {
                return Err(format!(
                    "turtle {} energy {} is outside [0, {}]",
                    turtle.id, turtle.current_energy, turtle.max_energy
                ));
            }
        }
        Ok(())
    }
}
