//! Runner binary: drives the simulation headless or against a wall clock.
//!
//! Usage: `piageon-runner [config.json]`. The config path may also come from
//! `PIAGEON_CONFIG`; without one the built-in defaults are used. Set
//! `PIAGEON_LOG_JSON=1` for JSON log lines.

mod telemetry;

use anyhow::{bail, Context, Result};
use piageon_core::RunnerConfig;
use piageon_world::{HeadlessRun, MetricsObserver, Simulation};
use std::path::PathBuf;
use tokio::signal;
use tokio::time::{interval, Duration, Instant, MissedTickBehavior};
use tracing::info;

const CONFIG_ENV: &str = "PIAGEON_CONFIG";
const JSON_LOG_ENV: &str = "PIAGEON_LOG_JSON";

fn load_config() -> Result<RunnerConfig> {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

    match path {
        Some(path) => RunnerConfig::from_path(&path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => {
            let config = RunnerConfig::default();
            config.validate()?;
            Ok(config)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config()?;

    let json_logs = std::env::var(JSON_LOG_ENV).map(|v| v == "1").unwrap_or(false);
    telemetry::init_telemetry(config.otel_endpoint.as_deref(), json_logs)?;

    info!(
        agents = config.sim.world.agent_count,
        frame_rate = config.frame_rate,
        realtime = config.realtime,
        "Starting Piageon runner"
    );

    let result = if config.realtime {
        run_realtime(&config).await
    } else {
        run_headless(&config)
    };

    telemetry::shutdown_telemetry();
    result
}

fn run_headless(config: &RunnerConfig) -> Result<()> {
    let Some(frames) = config.max_frames else {
        bail!("headless runs need max_frames; set realtime to run until interrupted");
    };

    let mut simulation = Simulation::new(config.sim.clone())?;
    simulation.add_observer(Box::new(MetricsObserver::new(config.report_every)));

    let summary = HeadlessRun::new(config.sim.clone(), frames, config.frame_dt())
        .with_report_every(config.report_every)
        .execute_with(simulation)?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn run_realtime(config: &RunnerConfig) -> Result<()> {
    let mut simulation = Simulation::new(config.sim.clone())?;
    simulation.add_observer(Box::new(MetricsObserver::new(config.report_every)));

    let mut ticker = interval(Duration::from_secs_f32(config.frame_dt()));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let mut last = Instant::now();
    let mut frames = 0u64;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = Instant::now();
                let dt = now.duration_since(last).as_secs_f32();
                last = now;

                simulation.tick(dt);
                frames += 1;

                if config.max_frames.is_some_and(|max| frames >= max) {
                    info!(frames, "Frame limit reached");
                    break;
                }
            }
            _ = &mut shutdown => {
                break;
            }
        }
    }

    let stats = simulation.population_stats();
    info!(
        frames,
        simulated_secs = simulation.sim_time(),
        alive = stats.alive,
        leaders = stats.leaders,
        kills = simulation.totals().kills,
        conversions = simulation.totals().conversions,
        "Realtime run stopped"
    );
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
