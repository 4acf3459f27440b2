use std::env;
use std::str::FromStr;

/// Tunable parameters enumerated in the spec's configuration table.
/// Loaded from the environment with `TURTLE_RACE_` prefixed names,
/// falling back to the documented defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub physics_hz: u32,
    pub broadcast_hz: u32,
    pub render_delay_ms: u64,
    pub snapshot_buffer_size: usize,
    pub per_session_queue_size: usize,
    pub write_timeout_ms: u64,
    pub max_catchup_ticks: u32,
    pub max_ticks: u64,
    pub track_length: f64,
    pub resume_threshold: f64,
    pub bind_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            physics_hz: 60,
            broadcast_hz: 30,
            render_delay_ms: 100,
            snapshot_buffer_size: 32,
            per_session_queue_size: 4,
            write_timeout_ms: 2000,
            max_catchup_ticks: 10,
            max_ticks: 18_000,
            track_length: 1500.0,
            resume_threshold: 0.3,
            bind_addr: "127.0.0.1:8080".to_string(),
        }
    }
}

impl Config {
    /// Reads `TURTLE_RACE_*` environment variables over the defaults and
    /// validates cross-field invariants. Fallible rather than panicking,
    /// since a malformed deployment env shouldn't crash mid-process.
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        let config = Self {
            physics_hz: env_or("TURTLE_RACE_PHYSICS_HZ", defaults.physics_hz)?,
            broadcast_hz: env_or("TURTLE_RACE_BROADCAST_HZ", defaults.broadcast_hz)?,
            render_delay_ms: env_or("TURTLE_RACE_RENDER_DELAY_MS", defaults.render_delay_ms)?,
            snapshot_buffer_size: env_or(
                "TURTLE_RACE_SNAPSHOT_BUFFER_SIZE",
                defaults.snapshot_buffer_size,
            )?,
            per_session_queue_size: env_or(
                "TURTLE_RACE_PER_SESSION_QUEUE_SIZE",
                defaults.per_session_queue_size,
            )?,
            write_timeout_ms: env_or("TURTLE_RACE_WRITE_TIMEOUT_MS", defaults.write_timeout_ms)?,
            max_catchup_ticks: env_or(
                "TURTLE_RACE_MAX_CATCHUP_TICKS",
                defaults.max_catchup_ticks,
            )?,
            max_ticks: env_or("TURTLE_RACE_MAX_TICKS", defaults.max_ticks)?,
            track_length: env_or("TURTLE_RACE_TRACK_LENGTH", defaults.track_length)?,
            resume_threshold: env_or("TURTLE_RACE_RESUME_THRESHOLD", defaults.resume_threshold)?,
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
        };
        config.validate()
    }

    fn validate(self) -> anyhow::Result<Self> {
        if self.physics_hz == 0 || self.broadcast_hz == 0 {
            anyhow::bail!("physics_hz and broadcast_hz must be nonzero");
        }
        if self.physics_hz % self.broadcast_hz != 0 {
            anyhow::bail!(
                "physics_hz ({}) must be an integer multiple of broadcast_hz ({})",
                self.physics_hz,
                self.broadcast_hz
            );
        }
        Ok(self)
    }

    /// Engine ticks between broadcast snapshots.
    pub fn ticks_per_broadcast(&self) -> u64 {
        (self.physics_hz / self.broadcast_hz) as u64
    }

    /// Duration of a single physics tick.
    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.physics_hz as f64)
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> anyhow::Result<T> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| anyhow::anyhow!("{key} could not be parsed")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_table() {
        let config = Config::default();
        assert_eq!(config.physics_hz, 60);
        assert_eq!(config.broadcast_hz, 30);
        assert_eq!(config.ticks_per_broadcast(), 2);
    }

    #[test]
    fn rejects_non_dividing_broadcast_hz() {
        let mut config = Config::default();
        config.broadcast_hz = 13;
        assert!(config.validate().is_err());
    }
}
