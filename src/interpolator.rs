//! Client-side buffered interpolator (C8). Pure per-frame computation: no
//! cancellation, no network I/O. Grounded in the teacher's `Room`/`Actor`
//! separation of "own the buffer" from "drain it" (`gameroom/actor.rs`),
//! here specialized to a ring of `(received_at, snapshot)` pairs instead of
//! an event channel.

use std::collections::VecDeque;

use crate::race::RaceSnapshot;
use crate::turtle::TurtleState;

/// Milliseconds by which the render clock lags behind wall time, absorbing
/// network jitter.
pub const RENDER_DELAY_MS: u64 = 100;

#[derive(Debug, Clone)]
struct Entry {
    received_at: u64,
    snapshot: RaceSnapshot,
}

/// An interpolated turtle state for one display frame.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolatedTurtle {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub angle: f64,
    pub energy: f64,
    pub is_resting: bool,
    pub finished: bool,
}

/// What a frame renders: either a fully interpolated scene, or a frozen
/// snapshot (buffer underflow or a stalled stream — never extrapolated).
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Interpolated(Vec<InterpolatedTurtle>),
    Frozen(Vec<InterpolatedTurtle>),
    Empty,
}

/// Bounded ring of recently-arrived snapshots, tagged with local arrival
/// time. Entries are expected in non-decreasing `received_at` order because
/// the transport preserves per-session delivery order.
pub struct Interpolator {
    buffer: VecDeque<Entry>,
    capacity: usize,
    render_delay_ms: u64,
    last_tick: Option<u64>,
}

impl Interpolator {
    pub fn new(capacity: usize, render_delay_ms: u64) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            render_delay_ms,
            last_tick: None,
        }
    }

    /// Appends a newly-arrived snapshot, flushing the buffer first on a
    /// course change (a decreasing tick, signaling a race reset).
    pub fn push(&mut self, received_at: u64, snapshot: RaceSnapshot) {
        if let Some(last) = self.last_tick {
            if snapshot.tick < last {
                self.buffer.clear();
            }
        }
        self.last_tick = Some(snapshot.tick);
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(Entry {
            received_at,
            snapshot,
        });
    }

    /// Renders one frame for wall-clock time `now`.
    pub fn render(&self, now: u64) -> Frame {
        if self.buffer.is_empty() {
            return Frame::Empty;
        }
        let render_time = now.saturating_sub(self.render_delay_ms);

        if render_time < self.buffer[0].received_at {
            return Frame::Frozen(snap_all(&self.buffer[0].snapshot));
        }

        for pair in self.buffer.iter().collect::<Vec<_>>().windows(2) {
            let (prev, next) = (pair[0], pair[1]);
            if prev.received_at <= render_time && render_time < next.received_at {
                return Frame::Interpolated(lerp_turtles(prev, next, render_time));
            }
        }

        Frame::Frozen(snap_all(&self.buffer.back().unwrap().snapshot))
    }
}

fn snap_all(snapshot: &RaceSnapshot) -> Vec<InterpolatedTurtle> {
    snapshot.turtles.iter().map(snap_one).collect()
}

fn snap_one(t: &TurtleState) -> InterpolatedTurtle {
    InterpolatedTurtle {
        id: t.id.clone(),
        x: t.x,
        y: t.y,
        angle: t.angle,
        energy: t.current_energy,
        is_resting: t.is_resting,
        finished: t.finished,
    }
}

fn lerp_turtles(prev: &Entry, next: &Entry, render_time: u64) -> Vec<InterpolatedTurtle> {
    let span = (next.received_at - prev.received_at).max(1) as f64;
    let t = ((render_time - prev.received_at) as f64 / span).clamp(0.0, 1.0);
    next.snapshot
        .turtles
        .iter()
        .map(|n| match prev.snapshot.turtles.iter().find(|p| p.id == n.id) {
            Some(p) => InterpolatedTurtle {
                id: n.id.clone(),
                x: lerp(p.x, n.x, t),
                y: lerp(p.y, n.y, t),
                angle: lerp(p.angle, n.angle, t),
                energy: lerp(p.current_energy, n.current_energy, t),
                is_resting: n.is_resting,
                finished: n.finished,
            },
            None => snap_one(n),
        })
        .collect()
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::TerrainSegment;

    fn turtle(id: &str, x: f64, energy: f64) -> TurtleState {
        TurtleState {
            id: id.into(),
            name: id.into(),
            genome: String::new(),
            x,
            y: 0.0,
            angle: 0.0,
            current_energy: energy,
            max_energy: 100.0,
            is_resting: false,
            finished: false,
            rank: None,
        }
    }

    fn snapshot(tick: u64, x: f64, energy: f64) -> RaceSnapshot {
        RaceSnapshot {
            tick,
            elapsed_ms: tick * 1000 / 60,
            track_length: 1500.0,
            turtles: vec![turtle("A", x, energy)],
            terrain_ahead: Vec::<TerrainSegment>::new(),
            finished: false,
            winner_id: None,
        }
    }

    #[test]
    fn interpolates_between_bracketing_snapshots() {
        let mut interp = Interpolator::new(32, 100);
        interp.push(0, snapshot(1, 0.0, 100.0));
        interp.push(50, snapshot(2, 10.0, 90.0));
        match interp.render(125) {
            Frame::Interpolated(turtles) => {
                let a = turtles.iter().find(|t| t.id == "A").unwrap();
                assert!((a.x - 5.0).abs() < 1e-9);
                assert!((a.energy - 95.0).abs() < 1e-9);
            }
            other => panic!("expected interpolated frame, got {other:?}"),
        }
    }

    #[test]
    fn underflow_freezes_oldest_without_extrapolation() {
        let mut interp = Interpolator::new(32, 100);
        interp.push(1000, snapshot(1, 0.0, 100.0));
        match interp.render(1050) {
            Frame::Frozen(turtles) => {
                assert_eq!(turtles[0].x, 0.0);
                assert!(turtles[0].x.is_finite());
                assert!(turtles[0].energy >= 0.0);
            }
            other => panic!("expected frozen frame, got {other:?}"),
        }
    }

    #[test]
    fn stalled_stream_freezes_on_newest_without_extrapolation() {
        let mut interp = Interpolator::new(32, 100);
        interp.push(0, snapshot(1, 0.0, 100.0));
        interp.push(50, snapshot(2, 10.0, 90.0));
        match interp.render(10_000) {
            Frame::Frozen(turtles) => assert_eq!(turtles[0].x, 10.0),
            other => panic!("expected frozen frame, got {other:?}"),
        }
    }

    #[test]
    fn buffer_overflow_drops_oldest() {
        let mut interp = Interpolator::new(2, 100);
        interp.push(0, snapshot(1, 0.0, 100.0));
        interp.push(50, snapshot(2, 10.0, 90.0));
        interp.push(100, snapshot(3, 20.0, 80.0));
        assert_eq!(interp.buffer.len(), 2);
        assert_eq!(interp.buffer[0].snapshot.tick, 2);
    }

    #[test]
    fn course_change_flushes_buffer() {
        let mut interp = Interpolator::new(32, 100);
        interp.push(0, snapshot(10, 5.0, 50.0));
        interp.push(50, snapshot(11, 6.0, 49.0));
        interp.push(100, snapshot(1, 0.0, 100.0));
        assert_eq!(interp.buffer.len(), 1);
        assert_eq!(interp.buffer[0].snapshot.tick, 1);
    }

    #[test]
    fn missing_counterpart_snaps_to_next() {
        let mut interp = Interpolator::new(32, 100);
        let mut s1 = snapshot(1, 0.0, 100.0);
        s1.turtles.clear();
        interp.push(0, s1);
        interp.push(50, snapshot(2, 10.0, 90.0));
        match interp.render(125) {
            Frame::Interpolated(turtles) => assert_eq!(turtles[0].x, 10.0),
            other => panic!("expected interpolated frame, got {other:?}"),
        }
    }
}
