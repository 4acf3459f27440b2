//! Orchestrator (C5): drives a single race engine at a fixed physics rate,
//! owns the idle/running/finished lifecycle, applies the speed multiplier,
//! and hands broadcast-rate snapshots to the connection bus.
//!
//! Grounded in the teacher's `Room::run` fixed async loop (`gameroom/
//! room.rs`) generalized from a turn-by-turn poker loop into a fixed-step
//! physics accumulator, and `Casino::start`/`close` (`hosting/casino.rs`)
//! for the lifecycle edges.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::bus::Bus;
use crate::config::Config;
use crate::errors::ErrorKind;
use crate::race::Race;
use crate::results::ResultSink;
use crate::roster::RosterProvider;
use crate::terrain::TerrainType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Idle,
    Running,
    Finished,
}

const ALLOWED_SPEEDS: [u32; 3] = [1, 2, 4];
const GRACE_PERIOD: Duration = Duration::from_secs(2);
const SEGMENTS_AHEAD: usize = 5;

struct RunningRace {
    race: Race,
    race_id: u64,
}

/// Owns at most one live race at a time. All mutation happens on the
/// driver task; external callers only issue commands and read the
/// lifecycle state.
pub struct Orchestrator {
    config: Config,
    bus: Arc<Bus>,
    roster: Arc<dyn RosterProvider>,
    sink: Arc<dyn ResultSink>,
    lifecycle: RwLock<Lifecycle>,
    current: RwLock<Option<RunningRace>>,
    speed_multiplier: AtomicU32,
    next_race_id: AtomicU64,
}

impl Orchestrator {
    pub fn new(
        config: Config,
        bus: Arc<Bus>,
        roster: Arc<dyn RosterProvider>,
        sink: Arc<dyn ResultSink>,
    ) -> Self {
        Self {
            config,
            bus,
            roster,
            sink,
            lifecycle: RwLock::new(Lifecycle::Idle),
            current: RwLock::new(None),
            speed_multiplier: AtomicU32::new(1),
            next_race_id: AtomicU64::new(1),
        }
    }

    pub async fn lifecycle(&self) -> Lifecycle {
        *self.lifecycle.read().await
    }

    pub fn speed_multiplier(&self) -> u32 {
        self.speed_multiplier.load(Ordering::Relaxed)
    }

    /// `IDLE -> RUNNING`. Duplicate `start` while already `RUNNING` is
    /// idempotent: a no-op with an informational `state` error, rather than
    /// a restart (an explicit call on spec section 9's open question).
    pub async fn start(self: &Arc<Self>) -> Result<(), ErrorKind> {
        {
            let lifecycle = self.lifecycle.read().await;
            if *lifecycle == Lifecycle::Running {
                return Err(ErrorKind::State);
            }
        }

        let specs = self.roster.load_roster().await.map_err(|e| {
            log::error!("roster_unavailable: {e}");
            ErrorKind::Persistence
        })?;

        let terrain = crate::terrain::generate(
            self.config.track_length,
            &[
                TerrainType::Grass,
                TerrainType::Water,
                TerrainType::Rock,
                TerrainType::Sand,
                TerrainType::Mud,
                TerrainType::Boost,
            ],
            None,
            self.next_race_id.load(Ordering::Relaxed),
        )
        .map_err(|e| {
            log::error!("terrain generation failed: {e}");
            ErrorKind::Fatal
        })?;

        let race_id = self.next_race_id.fetch_add(1, Ordering::Relaxed);
        let race = Race::new(
            &specs,
            terrain,
            self.config.resume_threshold,
            self.config.max_ticks,
            self.config.physics_hz,
        );
        *self.current.write().await = Some(RunningRace { race, race_id });
        self.speed_multiplier.store(1, Ordering::Relaxed);
        *self.lifecycle.write().await = Lifecycle::Running;
        self.bus
            .publish_meta(
                self.config.track_length,
                self.config.physics_hz,
                self.config.broadcast_hz,
                0,
                None,
            )
            .await;
        log::info!("race {race_id} started with {} turtles", specs.len());

        let driver = self.clone();
        tokio::spawn(async move { driver.drive(race_id).await });
        Ok(())
    }

    /// Any state `-> IDLE`. Discards the engine and clears the bus's last
    /// snapshot.
    pub async fn stop(&self) -> Result<(), ErrorKind> {
        let had_race = self.current.write().await.take().is_some();
        *self.lifecycle.write().await = Lifecycle::Idle;
        self.bus.clear_meta().await;
        if !had_race {
            return Err(ErrorKind::State);
        }
        log::info!("race stopped");
        Ok(())
    }

    /// Only affects the time-to-tick conversion; ticks stay deterministic.
    pub fn set_speed(&self, value: u32) -> Result<(), ErrorKind> {
        if !ALLOWED_SPEEDS.contains(&value) {
            return Err(ErrorKind::BadRequest);
        }
        self.speed_multiplier.store(value, Ordering::Relaxed);
        Ok(())
    }

    /// The fixed-step driver loop for one race. Exits at the next tick
    /// boundary after `stop` swaps the race out or the engine finishes.
    async fn drive(self: Arc<Self>, race_id: u64) {
        let interval = self.config.tick_interval();
        let mut accumulator = Duration::ZERO;
        let mut last = Instant::now();

        loop {
            tokio::time::sleep(Duration::from_millis(1)).await;

            let multiplier = self.speed_multiplier() as f64;
            let now = Instant::now();
            let elapsed = now.duration_since(last);
            last = now;
            accumulator += Duration::from_secs_f64(elapsed.as_secs_f64() * multiplier);

            let max_catchup = interval * self.config.max_catchup_ticks;
            if accumulator > max_catchup {
                log::warn!(
                    "clock_lag: dropping surplus beyond {} ticks",
                    self.config.max_catchup_ticks
                );
                accumulator = interval * self.config.max_catchup_ticks.min(1);
            }

            let mut ticked = false;
            while accumulator >= interval {
                let mut current = self.current.write().await;
                let Some(running) = current.as_mut() else {
                    return;
                };
                if running.race_id != race_id {
                    return;
                }

                let step_outcome = panic::catch_unwind(AssertUnwindSafe(|| running.race.step()));
                ticked = true;
                accumulator -= interval;

                let violation = match step_outcome {
                    Ok(()) => running.race.check_invariants().err(),
                    Err(_) => Some("engine panicked while stepping".to_string()),
                };
                if let Some(reason) = violation {
                    drop(current);
                    self.abort(race_id, &reason).await;
                    return;
                }

                let just_finished = running.race.is_finished();
                drop(current);

                if just_finished {
                    self.finish(race_id).await;
                    return;
                }
            }

            if ticked {
                self.maybe_broadcast(race_id).await;
            }
        }
    }

    async fn maybe_broadcast(&self, race_id: u64) {
        let ticks_per_broadcast = self.config.ticks_per_broadcast();
        let current = self.current.read().await;
        let Some(running) = current.as_ref() else {
            return;
        };
        if running.race_id != race_id {
            return;
        }
        if running.race.tick() % ticks_per_broadcast != 0 {
            return;
        }
        let snapshot = running.race.snapshot(SEGMENTS_AHEAD);
        drop(current);
        self.bus
            .publish_meta(
                self.config.track_length,
                self.config.physics_hz,
                self.config.broadcast_hz,
                snapshot.tick,
                Some(Arc::new(snapshot.clone())),
            )
            .await;
        self.bus.broadcast(snapshot).await;
    }

    /// A fatal invariant violation (spec section 7): every attached session
    /// gets `ServerMessage::Error{kind: Fatal, ..}` ahead of anything
    /// queued and is closed, and the orchestrator drops straight back to
    /// `Idle` without a result-sink write, since there is no trustworthy
    /// finish order to record.
    async fn abort(&self, race_id: u64, reason: &str) {
        log::error!("race {race_id} aborted: {reason}");
        self.current.write().await.take();
        self.bus.clear_meta().await;
        self.bus.abort(reason.to_string()).await;
        *self.lifecycle.write().await = Lifecycle::Idle;
    }

    async fn finish(&self, race_id: u64) {
        let (finish_order, elapsed_ms, snapshot) = {
            let current = self.current.read().await;
            let Some(running) = current.as_ref() else {
                return;
            };
            let snapshot = running.race.snapshot(SEGMENTS_AHEAD);
            (
                running.race.finish_order().to_vec(),
                snapshot.elapsed_ms,
                snapshot,
            )
        };

        self.bus
            .publish_meta(
                self.config.track_length,
                self.config.physics_hz,
                self.config.broadcast_hz,
                snapshot.tick,
                Some(Arc::new(snapshot.clone())),
            )
            .await;
        self.bus.broadcast(snapshot).await;
        *self.lifecycle.write().await = Lifecycle::Finished;

        let sink_result = crate::retry::with_backoff(|| {
            self.sink.record_race_result(race_id, &finish_order, elapsed_ms)
        })
        .await;
        if let Err(e) = sink_result {
            log::error!("persistence: failed to record race {race_id}: {e}");
        }

        tokio::time::sleep(GRACE_PERIOD).await;
        self.current.write().await.take();
        self.bus.clear_meta().await;
        *self.lifecycle.write().await = Lifecycle::Idle;
        log::info!("race {race_id} back to idle");
    }
}
