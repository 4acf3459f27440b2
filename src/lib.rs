pub mod bus;
pub mod config;
pub mod errors;
pub mod genome;
pub mod interpolator;
pub mod orchestrator;
pub mod protocol;
pub mod race;
pub mod results;
pub mod retry;
pub mod roster;
pub mod terrain;
pub mod turtle;

#[cfg(feature = "server")]
pub mod server;

pub use config::Config;

/// Energy accrued per tick, per point of `recovery`, while a turtle rests.
pub const RECOVERY_RATE: f64 = 0.05;

/// `dx` per tick, per point of effective `speed`, on unmodified terrain.
/// Calibrated so a reference stat-50 turtle covers the default 1500-unit
/// track in ~30s at the default `physics_hz` of 60.
pub const SPEED_SCALE: f64 = 1.0 / 60.0;

/// Energy drained per tick on unmodified (grass) terrain, before the
/// per-terrain difficulty multiplier from [`turtle::terrain_difficulty`].
pub const DRAIN_BASE: f64 = 0.05;

/// initialize logging; mirrors the teacher's combined term+file logger.
#[cfg(feature = "server")]
pub fn init_logging() -> anyhow::Result<()> {
    use std::time::{SystemTime, UNIX_EPOCH};

    std::fs::create_dir_all("logs")?;
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    let secs = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
    let file = simplelog::WriteLogger::new(
        log::LevelFilter::Debug,
        config.clone(),
        std::fs::File::create(format!("logs/{secs}.log"))?,
    );
    let term = simplelog::TermLogger::new(
        log::LevelFilter::Info,
        config,
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
    simplelog::CombinedLogger::init(vec![term, file])
        .map_err(|e| anyhow::anyhow!("initialize logger: {e}"))
}
