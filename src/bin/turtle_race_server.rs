//! Binary entry point: wires config, bus, roster, result sink, and
//! orchestrator, then hands them to the hosting server. Grounded in the
//! teacher's `bin/hosting.rs` wiring of `Casino`/`Server::run`.

use std::sync::Arc;

use turtle_race::bus::Bus;
use turtle_race::orchestrator::Orchestrator;
use turtle_race::results::LoggingSink;
use turtle_race::roster::StaticRoster;
use turtle_race::server::Server;
use turtle_race::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    turtle_race::init_logging()?;

    let config = Config::from_env()?;
    log::info!("loaded configuration: {config:?}");

    let bus = Arc::new(Bus::new(config.per_session_queue_size));
    let roster = Arc::new(StaticRoster::default());
    let sink = Arc::new(LoggingSink);
    let orchestrator = Arc::new(Orchestrator::new(
        config.clone(),
        bus.clone(),
        roster,
        sink,
    ));

    Server::run(config, orchestrator, bus).await?;
    Ok(())
}
