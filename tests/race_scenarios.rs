//! End-to-end scenarios run directly against the public `race`/`orchestrator`/
//! `bus` API, without a network transport.

use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;

use turtle_race::bus::Bus;
use turtle_race::orchestrator::{Lifecycle, Orchestrator};
use turtle_race::race::Race;
use turtle_race::results::ResultSink;
use turtle_race::roster::RosterProvider;
use turtle_race::terrain::{Terrain, TerrainSegment, TerrainType};
use turtle_race::turtle::TurtleSpec;
use turtle_race::Config;

fn flat_track(terrain_type: TerrainType, len: f64) -> Terrain {
    Terrain::new(vec![TerrainSegment {
        start_distance: 0.0,
        end_distance: len,
        terrain_type,
    }])
    .unwrap()
}

fn spec(id: &str, speed: f64, swim: f64, climb: f64) -> TurtleSpec {
    TurtleSpec {
        id: id.into(),
        name: id.into(),
        genome: String::new(),
        speed,
        max_energy: 100.0,
        recovery: 5.0,
        swim,
        climb,
    }
}

/// Scenario: a single turtle on plain grass crosses the line, finishes
/// first, and the clock never runs backward.
#[test]
fn single_turtle_grass_sprint() {
    let mut race = Race::new(
        &[spec("A", 50.0, 10.0, 10.0)],
        flat_track(TerrainType::Grass, 1500.0),
        0.3,
        18_000,
        60,
    );
    while !race.is_finished() {
        race.step();
    }
    let snapshot = race.snapshot(5);
    assert!(snapshot.finished);
    assert_eq!(snapshot.winner_id.as_deref(), Some("A"));
    assert_eq!(race.finish_order(), ["A"]);
}

/// Scenario: three turtles with distinct speeds finish in speed order, with
/// ranks assigned 1, 2, 3.
#[test]
fn three_turtle_ordered_finish() {
    let specs = [
        spec("A", 50.0, 10.0, 10.0),
        spec("B", 40.0, 10.0, 10.0),
        spec("C", 30.0, 10.0, 10.0),
    ];
    let mut race = Race::new(&specs, flat_track(TerrainType::Grass, 1500.0), 0.3, 18_000, 60);
    while !race.is_finished() {
        race.step();
    }
    assert_eq!(race.finish_order(), ["A", "B", "C"]);
    let snapshot = race.snapshot(0);
    let ranked: Vec<_> = snapshot
        .turtles
        .iter()
        .map(|t| (t.id.clone(), t.rank))
        .collect();
    assert!(ranked.contains(&("A".to_string(), Some(1))));
    assert!(ranked.contains(&("B".to_string(), Some(2))));
    assert!(ranked.contains(&("C".to_string(), Some(3))));
}

/// Scenario: a low-energy, low-recovery turtle must rest at least once
/// before crossing the line, and resumes only once energy clears the
/// resume threshold.
#[test]
fn energy_exhaustion_forces_a_rest_then_recovery() {
    let mut spec = spec("A", 50.0, 10.0, 10.0);
    spec.max_energy = 5.0;
    spec.recovery = 2.0;
    let mut race = Race::new(&[spec], flat_track(TerrainType::Grass, 1500.0), 0.3, 18_000, 60);

    let mut rested_at_least_once = false;
    let mut ticks = 0;
    while !race.is_finished() && ticks < 18_000 {
        race.step();
        ticks += 1;
        if race.snapshot(0).turtles[0].is_resting {
            rested_at_least_once = true;
        }
    }
    assert!(rested_at_least_once, "a 5-energy turtle must rest at least once");
    assert!(race.is_finished());
    assert_eq!(race.finish_order(), ["A"]);
}

/// Scenario: on rock terrain, the high-climb turtle beats the low-climb
/// turtle despite identical base speed.
#[test]
fn terrain_specialist_outpaces_generalist_on_rock() {
    let mountaineer = spec("A", 40.0, 10.0, 40.0);
    let flatlander = spec("B", 40.0, 10.0, 4.0);
    let mut race = Race::new(
        &[mountaineer, flatlander],
        flat_track(TerrainType::Rock, 1500.0),
        0.3,
        18_000,
        60,
    );
    while !race.is_finished() {
        race.step();
    }
    assert_eq!(race.finish_order()[0], "A");
}

/// Scenario: a session attaching mid-race receives the in-progress tick and
/// snapshot immediately, rather than waiting for the next broadcast.
#[tokio::test]
async fn late_joiner_syncs_to_in_progress_race() {
    let bus = Arc::new(Bus::new(4));
    let mut race = Race::new(
        &[spec("A", 50.0, 10.0, 10.0)],
        flat_track(TerrainType::Grass, 1500.0),
        0.3,
        18_000,
        60,
    );
    for _ in 0..120 {
        race.step();
    }
    let snapshot = race.snapshot(3);
    bus.publish_meta(1500.0, 60, 30, snapshot.tick, Some(Arc::new(snapshot.clone())))
        .await;

    let (_, _, sync) = bus.attach().await;
    match sync {
        turtle_race::protocol::ServerMessage::Sync {
            current_tick,
            snapshot: Some(s),
            ..
        } => {
            assert_eq!(current_tick, snapshot.tick);
            assert_eq!(s.tick, snapshot.tick);
        }
        other => panic!("expected populated sync message, got {other:?}"),
    }
}

/// Scenario: a client that never drains its mailbox never blocks the
/// broadcaster or other sessions; its queue just saturates to the latest
/// snapshots.
#[tokio::test]
async fn slow_client_never_blocks_broadcast() {
    let bus = Bus::new(2);
    let (_, slow_mailbox, _) = bus.attach().await;
    let (_, fast_mailbox, _) = bus.attach().await;

    for tick in 1..=10u64 {
        let snapshot = turtle_race::race::RaceSnapshot {
            tick,
            elapsed_ms: tick * 1000 / 60,
            track_length: 1500.0,
            turtles: Vec::new(),
            terrain_ahead: Vec::new(),
            finished: false,
            winner_id: None,
        };
        bus.broadcast(snapshot).await;
    }

    assert_eq!(tick_of(slow_mailbox.pop().await), 9);
    assert_eq!(tick_of(slow_mailbox.pop().await), 10);
    assert_eq!(tick_of(fast_mailbox.pop().await), 9);
}

fn tick_of(delivery: turtle_race::bus::Delivery) -> u64 {
    match delivery {
        turtle_race::bus::Delivery::Snapshot(s) => s.tick,
        turtle_race::bus::Delivery::Fatal(m) => panic!("expected a snapshot, got fatal: {m}"),
    }
}

struct FixedRoster(Vec<TurtleSpec>);

#[async_trait]
impl RosterProvider for FixedRoster {
    async fn load_roster(&self) -> anyhow::Result<Vec<TurtleSpec>> {
        Ok(self.0.clone())
    }
}

struct RecordingSink(Arc<StdMutex<Vec<u64>>>);

#[async_trait]
impl ResultSink for RecordingSink {
    async fn record_race_result(
        &self,
        race_id: u64,
        _finish_order: &[String],
        _elapsed_ms: u64,
    ) -> anyhow::Result<()> {
        self.0.lock().unwrap().push(race_id);
        Ok(())
    }
}

/// Orchestrator-level smoke test: starting a race with a short safety cap
/// drives it to completion and back to idle without any transport layer.
#[tokio::test]
async fn orchestrator_drives_a_short_race_to_completion() {
    let mut config = Config::default();
    config.max_ticks = 10;
    config.physics_hz = 60;
    config.broadcast_hz = 30;

    let bus = Arc::new(Bus::new(4));
    let roster = Arc::new(FixedRoster(vec![spec("A", 0.0, 10.0, 10.0)]));
    let results = Arc::new(StdMutex::new(Vec::new()));
    let sink = Arc::new(RecordingSink(results.clone()));
    let orchestrator = Arc::new(Orchestrator::new(config, bus, roster, sink));

    orchestrator.start().await.unwrap();
    assert_eq!(orchestrator.lifecycle().await, Lifecycle::Running);

    for _ in 0..50 {
        if orchestrator.lifecycle().await == Lifecycle::Idle {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }

    assert_eq!(orchestrator.lifecycle().await, Lifecycle::Idle);
    assert_eq!(results.lock().unwrap().len(), 1);
}
