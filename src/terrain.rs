//! Terrain model (C2): an immutable, contiguous partition of the track.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerrainType {
    Grass,
    Water,
    Rock,
    Sand,
    Mud,
    Boost,
}

impl TerrainType {
    /// Forward-speed multiplier. `water`/`rock` depend on the turtle's own
    /// `swim`/`climb` stats, so those two variants return `None` here and
    /// are resolved by [`crate::turtle`] against the specific turtle.
    pub fn base_multiplier(self) -> Option<f64> {
        match self {
            TerrainType::Grass => Some(1.0),
            TerrainType::Sand => Some(0.9),
            TerrainType::Mud => Some(0.7),
            TerrainType::Boost => Some(1.3),
            TerrainType::Water | TerrainType::Rock => None,
        }
    }

    /// Additive energy-drain difficulty multiplier.
    pub fn drain_difficulty(self) -> f64 {
        match self {
            TerrainType::Grass => 1.0,
            TerrainType::Water => 1.3,
            TerrainType::Rock => 1.4,
            TerrainType::Sand => 1.1,
            TerrainType::Mud => 1.5,
            TerrainType::Boost => 0.8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerrainSegment {
    pub start_distance: f64,
    pub end_distance: f64,
    pub terrain_type: TerrainType,
}

/// Immutable, half-open, contiguous cover of `[0, track_length]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Terrain {
    segments: Vec<TerrainSegment>,
    track_length: f64,
}

impl Terrain {
    pub fn new(segments: Vec<TerrainSegment>) -> anyhow::Result<Self> {
        if segments.is_empty() {
            anyhow::bail!("terrain must have at least one segment");
        }
        for pair in segments.windows(2) {
            if (pair[0].end_distance - pair[1].start_distance).abs() > 1e-9 {
                anyhow::bail!("terrain segments must be contiguous");
            }
        }
        if segments[0].start_distance != 0.0 {
            anyhow::bail!("terrain must start at distance 0");
        }
        let track_length = segments.last().unwrap().end_distance;
        Ok(Self {
            segments,
            track_length,
        })
    }

    pub fn track_length(&self) -> f64 {
        self.track_length
    }

    pub fn segments(&self) -> &[TerrainSegment] {
        &self.segments
    }

    /// O(log n) binary search over segment starts. Distances at or beyond
    /// the track length clamp to the final segment.
    pub fn terrain_at(&self, distance: f64) -> TerrainSegment {
        if distance >= self.track_length {
            return *self.segments.last().unwrap();
        }
        let idx = match self
            .segments
            .binary_search_by(|seg| seg.start_distance.partial_cmp(&distance).unwrap())
        {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        self.segments[idx]
    }

    /// Up to `limit` contiguous segments starting with the one containing
    /// `distance`.
    pub fn segments_after(&self, distance: f64, limit: usize) -> Vec<TerrainSegment> {
        let start = self.terrain_at(distance);
        let start_idx = self
            .segments
            .iter()
            .position(|s| s.start_distance == start.start_distance)
            .unwrap_or(0);
        self.segments[start_idx..]
            .iter()
            .take(limit)
            .copied()
            .collect()
    }
}

/// Deterministic when seeded: segment lengths sampled from a bounded
/// uniform distribution, normalized so the last segment ends exactly at
/// `track_length`.
pub fn generate(
    track_length: f64,
    types: &[TerrainType],
    weights: Option<&[f64]>,
    seed: u64,
) -> anyhow::Result<Terrain> {
    if types.is_empty() {
        anyhow::bail!("must supply at least one terrain type");
    }
    const MIN_SEGMENT: f64 = 50.0;
    const MAX_SEGMENT: f64 = 300.0;

    let mut rng = SmallRng::seed_from_u64(seed);
    let mut segments = Vec::new();
    let mut cursor = 0.0;
    while cursor < track_length {
        let terrain_type = weighted_choice(types, weights, &mut rng);
        let remaining = track_length - cursor;
        let len = rng.random_range(MIN_SEGMENT..=MAX_SEGMENT).min(remaining);
        let end = if remaining - len < MIN_SEGMENT {
            track_length
        } else {
            cursor + len
        };
        segments.push(TerrainSegment {
            start_distance: cursor,
            end_distance: end,
            terrain_type,
        });
        cursor = end;
    }
    Terrain::new(segments)
}

fn weighted_choice(
    types: &[TerrainType],
    weights: Option<&[f64]>,
    rng: &mut SmallRng,
) -> TerrainType {
    match weights {
        Some(weights) if weights.len() == types.len() => {
            let total: f64 = weights.iter().sum();
            let mut pick = rng.random_range(0.0..total);
            for (ty, w) in types.iter().zip(weights) {
                if pick < *w {
                    return *ty;
                }
                pick -= w;
            }
            *types.last().unwrap()
        }
        _ => types[rng.random_range(0..types.len())],
    }
}
