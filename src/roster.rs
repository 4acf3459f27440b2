//! Roster provider: the narrow interface onto an external roster store.
//! Mirrors how the teacher keeps `Player` decision-making behind a trait so
//! `Fish` (a CPU stand-in) and `Client` (a real network player) are
//! interchangeable — here `StaticRoster` stands in for a real roster
//! backend until one is wired in.

use async_trait::async_trait;

use crate::turtle::TurtleSpec;

#[async_trait]
pub trait RosterProvider: Send + Sync {
    /// Called exactly once per `start` transition. May fail with
    /// `roster_unavailable`; the orchestrator surfaces that as a
    /// `persistence` error and refuses the transition.
    async fn load_roster(&self) -> anyhow::Result<Vec<TurtleSpec>>;
}

/// Fixed demo roster. Standalone deployments without a real roster store
/// wire this in by default.
pub struct StaticRoster {
    specs: Vec<TurtleSpec>,
}

impl Default for StaticRoster {
    fn default() -> Self {
        Self {
            specs: vec![
                TurtleSpec {
                    id: "A".into(),
                    name: "Ayu".into(),
                    genome: "B1-S2-P0-C228B22".into(),
                    speed: 50.0,
                    max_energy: 100.0,
                    recovery: 5.0,
                    swim: 10.0,
                    climb: 10.0,
                },
                TurtleSpec {
                    id: "B".into(),
                    name: "Bolt".into(),
                    genome: "B2-S1-P3-CFF8C00".into(),
                    speed: 45.0,
                    max_energy: 90.0,
                    recovery: 6.0,
                    swim: 15.0,
                    climb: 5.0,
                },
                TurtleSpec {
                    id: "C".into(),
                    name: "Crag".into(),
                    genome: "B0-S0-P1-C8B4513".into(),
                    speed: 45.0,
                    max_energy: 110.0,
                    recovery: 4.0,
                    swim: 5.0,
                    climb: 15.0,
                },
            ],
        }
    }
}

#[async_trait]
impl RosterProvider for StaticRoster {
    async fn load_roster(&self) -> anyhow::Result<Vec<TurtleSpec>> {
        Ok(self.specs.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_roster_has_unique_ids() {
        let roster = StaticRoster::default();
        let specs = roster.load_roster().await.unwrap();
        let mut ids: Vec<_> = specs.iter().map(|s| s.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), specs.len());
    }
}
