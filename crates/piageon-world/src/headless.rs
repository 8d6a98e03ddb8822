//! Fixed-length runs without a renderer.

use crate::population::Simulation;
use crate::snapshot::{PopulationStats, RunTotals};
use chrono::{DateTime, Utc};
use piageon_core::{FactionCounts, Result, RunId, SimConfig};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// A run of `frames` ticks at a constant frame delta
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadlessRun {
    pub run_id: RunId,
    pub config: SimConfig,
    pub frames: u64,
    pub frame_dt: f32,
    /// Log progress every this many frames; 0 disables progress logs
    pub report_every: u64,
}

impl HeadlessRun {
    pub fn new(config: SimConfig, frames: u64, frame_dt: f32) -> Self {
        Self {
            run_id: RunId::new(),
            config,
            frames,
            frame_dt,
            report_every: 0,
        }
    }

    pub fn with_report_every(mut self, report_every: u64) -> Self {
        self.report_every = report_every;
        self
    }

    /// Build a simulation from the config and run it to completion
    pub fn execute(self) -> Result<RunSummary> {
        let simulation = Simulation::new(self.config.clone())?;
        self.execute_with(simulation)
    }

    /// Run an already-constructed simulation, e.g. one with observers attached
    #[instrument(skip(self, simulation), fields(run_id = %self.run_id, frames = self.frames))]
    pub fn execute_with(self, mut simulation: Simulation) -> Result<RunSummary> {
        let started_at = Utc::now();
        info!("Starting headless run for {} frames", self.frames);

        for frame in 1..=self.frames {
            simulation.tick(self.frame_dt);

            if self.report_every > 0 && frame % self.report_every == 0 {
                let counts = simulation.faction_counts();
                info!(
                    "Frame {}/{}: {} alive, {} kills, {} conversions",
                    frame,
                    self.frames,
                    counts.total(),
                    simulation.totals().kills,
                    simulation.totals().conversions
                );
            }
        }

        let summary = RunSummary {
            run_id: self.run_id,
            started_at,
            frames: self.frames,
            simulated_secs: simulation.sim_time(),
            final_counts: simulation.faction_counts(),
            final_stats: simulation.population_stats(),
            totals: simulation.totals(),
        };
        summary.log();
        Ok(summary)
    }
}

/// Outcome of a headless run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub frames: u64,
    pub simulated_secs: f64,
    pub final_counts: FactionCounts,
    pub final_stats: PopulationStats,
    pub totals: RunTotals,
}

impl RunSummary {
    fn log(&self) {
        info!(
            event = "run_summary",
            run_id = %self.run_id,
            frames = self.frames,
            simulated_secs = self.simulated_secs,
            alive = self.final_stats.alive,
            leaders = self.final_stats.leaders,
            kills = self.totals.kills,
            conversions = self.totals.conversions,
            self_kills = self.totals.self_kills,
            self_destructs = self.totals.self_destructs,
            promotions = self.totals.promotions,
            respawns = self.totals.respawns,
            "Headless run complete"
        );
        for (faction, count) in self.final_counts.iter() {
            info!(faction = faction.as_str(), count, "Final faction count");
        }
    }
}
