//! Push-style hooks for hosts that want per-tick notifications.

use crate::snapshot::{PopulationStats, TickReport};
use piageon_core::Faction;
use tracing::{event, info, Level};

pub trait SimulationObserver {
    fn on_tick(&mut self, report: &TickReport, stats: &PopulationStats);

    fn on_reset(&mut self, _stats: &PopulationStats) {}
}

/// Logs population gauges every `every` ticks
pub struct MetricsObserver {
    every: u64,
}

impl MetricsObserver {
    pub fn new(every: u64) -> Self {
        Self { every: every.max(1) }
    }

    fn emit(&self, tick: u64, stats: &PopulationStats) {
        info!(
            event = "population_metrics",
            tick = tick,
            total_population = stats.total,
            alive = stats.alive,
            dying = stats.dying,
            leaders = stats.leaders,
            mean_age = stats.mean_age,
            mean_fitness = stats.fitness.mean,
            best_fitness = stats.fitness.best,
            dominant_faction = stats.dominant_faction().map(Faction::as_str),
            "Population metrics snapshot"
        );

        event!(
            Level::INFO,
            gauge_name = "population_alive",
            gauge_value = stats.alive,
            tick = tick,
            "Population gauge"
        );

        for (faction, count) in stats.factions.iter() {
            event!(
                Level::INFO,
                gauge_name = "faction_population",
                gauge_value = count,
                faction = faction.as_str(),
                tick = tick,
                "Faction population"
            );
        }

        event!(
            Level::INFO,
            gauge_name = "leaders_total",
            gauge_value = stats.leaders,
            tick = tick,
            "Leader count"
        );
    }
}

impl SimulationObserver for MetricsObserver {
    fn on_tick(&mut self, report: &TickReport, stats: &PopulationStats) {
        if !report.skipped && report.tick % self.every == 0 {
            self.emit(report.tick, stats);
        }
    }

    fn on_reset(&mut self, stats: &PopulationStats) {
        info!(alive = stats.alive, "Population reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Recorder(Rc<RefCell<Vec<u64>>>);

    impl SimulationObserver for Recorder {
        fn on_tick(&mut self, report: &TickReport, _stats: &PopulationStats) {
            self.0.borrow_mut().push(report.tick);
        }
    }

    #[test]
    fn test_default_reset_hook_is_noop() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut recorder = Recorder(seen.clone());
        recorder.on_reset(&PopulationStats::default());
        recorder.on_tick(
            &TickReport {
                tick: 3,
                ..Default::default()
            },
            &PopulationStats::default(),
        );
        assert_eq!(*seen.borrow(), vec![3]);
    }

    #[test]
    fn test_metrics_observer_interval_floor() {
        let mut observer = MetricsObserver::new(0);
        assert_eq!(observer.every, 1);
        observer.on_tick(&TickReport::default(), &PopulationStats::default());
    }
}
