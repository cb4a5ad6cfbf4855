//! # Example: Forecast update loop
//!
//! Reads the forecast from a JSON file, logs the daily summaries, and keeps
//! refreshing on the day/night cadence until Ctrl-C.
//!
//! ```text
//! cargo run --example forecast_loop -- forecast.json [weatherbox.toml]
//! RUST_LOG=weatherbox=debug cargo run --example forecast_loop -- forecast.json
//! ```
//!
//! Edit or delete the JSON file while it runs to watch the retry ladder kick in.

use std::sync::Arc;

use weatherbox::{
    Config, HealthTracker, JsonFileSource, LogRenderer, LogWriter, Renderer, Subscribe,
    UpdateCoordinator, logging,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init(logging::DEFAULT_DIRECTIVE);

    let mut args = std::env::args().skip(1);
    let forecast = args.next().unwrap_or_else(|| "forecast.json".to_string());
    let cfg = match args.next() {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let health = Arc::new(HealthTracker::new());
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter), health.clone()];

    let coordinator = UpdateCoordinator::builder(cfg)
        .with_subscribers(subs)
        .build(
            Arc::new(JsonFileSource::new(&forecast)),
            Arc::new(Renderer::Log(LogRenderer::default())),
        )?;

    tracing::info!(source = %forecast, "forecast loop starting");
    let cycles = coordinator.run_until_signal().await?;

    let snap = health.snapshot().await;
    tracing::info!(
        cycles,
        phase = snap.phase.as_label(),
        failures = snap.consecutive_failures,
        failed = snap.failed,
        "forecast loop stopped"
    );
    Ok(())
}
