//! Aggregate views of the population handed to hosts and observers.

use crate::agent::Agent;
use piageon_core::{AgentId, Faction, FactionCounts, FitnessSummary, LeaderType};
use serde::{Deserialize, Serialize};

/// Population-wide statistics for HUDs and metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PopulationStats {
    pub total: u32,
    pub alive: u32,
    pub dying: u32,
    /// Per-faction counts of non-dying agents
    pub factions: FactionCounts,
    pub leaders: u32,
    pub mean_age: f32,
    pub fitness: FitnessSummary,
}

impl PopulationStats {
    pub fn collect(agents: &[Agent]) -> Self {
        let mut stats = Self {
            total: agents.len() as u32,
            ..Default::default()
        };
        let mut age_sum = 0.0;
        for agent in agents {
            if agent.is_dying() {
                stats.dying += 1;
                continue;
            }
            stats.alive += 1;
            stats.factions.add(agent.faction);
            if agent.is_leader() {
                stats.leaders += 1;
            }
            age_sum += agent.age;
            stats.fitness.update(agent.fitness());
        }
        if stats.alive > 0 {
            stats.mean_age = age_sum / stats.alive as f32;
        }
        stats
    }

    /// Faction with the most living members, ties broken by declaration order
    pub fn dominant_faction(&self) -> Option<Faction> {
        self.factions
            .iter()
            .filter(|&(_, n)| n > 0)
            .fold(None, |best: Option<(Faction, u32)>, (faction, n)| match best {
                Some((_, top)) if top >= n => best,
                _ => Some((faction, n)),
            })
            .map(|(faction, _)| faction)
    }
}

/// What happened during one call to `Simulation::tick`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TickReport {
    pub tick: u64,
    /// Simulated seconds consumed, after speed and time scale
    pub dt: f32,
    /// True when the tick was skipped because the simulation is paused
    pub skipped: bool,
    pub reset: bool,
    /// Agents killed by another agent's action
    pub killed: Vec<AgentId>,
    pub converted: Vec<(AgentId, Faction)>,
    pub self_killed: Vec<AgentId>,
    /// Prophets whose oscillation rolled a self-destruct
    pub self_destructed: Vec<AgentId>,
    pub promoted: Vec<(AgentId, LeaderType)>,
    pub removed: Vec<AgentId>,
    pub respawned: Vec<AgentId>,
}

/// Cumulative counters since the last reset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTotals {
    pub kills: u64,
    pub conversions: u64,
    pub self_kills: u64,
    pub self_destructs: u64,
    pub promotions: u64,
    pub removals: u64,
    pub respawns: u64,
}

impl RunTotals {
    pub fn record(&mut self, report: &TickReport) {
        self.kills += report.killed.len() as u64;
        self.conversions += report.converted.len() as u64;
        self.self_kills += report.self_killed.len() as u64;
        self.self_destructs += report.self_destructed.len() as u64;
        self.promotions += report.promoted.len() as u64;
        self.removals += report.removed.len() as u64;
        self.respawns += report.respawned.len() as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use piageon_genome::Genome;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_collect_skips_dying() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut agents: Vec<Agent> = [Faction::Communist, Faction::Communist, Faction::Neutral]
            .into_iter()
            .enumerate()
            .map(|(i, f)| Agent::new(AgentId(i as u64), Vec3::ZERO, f, Genome::midpoint(), &mut rng))
            .collect();
        agents[0].age = 10.0;
        agents[1].age = 20.0;
        agents[2].mark_dying();

        let stats = PopulationStats::collect(&agents);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.alive, 2);
        assert_eq!(stats.dying, 1);
        assert_eq!(stats.factions[Faction::Communist], 2);
        assert_eq!(stats.factions[Faction::Neutral], 0);
        assert!((stats.mean_age - 15.0).abs() < 1e-5);
        assert_eq!(stats.fitness.count, 2);
        assert_eq!(stats.dominant_faction(), Some(Faction::Communist));
    }

    #[test]
    fn test_empty_population() {
        let stats = PopulationStats::collect(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.mean_age, 0.0);
        assert_eq!(stats.dominant_faction(), None);
    }

    #[test]
    fn test_totals_accumulate() {
        let mut totals = RunTotals::default();
        let report = TickReport {
            killed: vec![AgentId(1), AgentId(2)],
            self_killed: vec![AgentId(4)],
            self_destructed: vec![AgentId(5)],
            removed: vec![AgentId(3)],
            respawned: vec![AgentId(9)],
            ..Default::default()
        };
        totals.record(&report);
        totals.record(&report);
        assert_eq!(totals.kills, 4);
        assert_eq!(totals.self_kills, 2);
        assert_eq!(totals.self_destructs, 2);
        assert_eq!(totals.removals, 2);
        assert_eq!(totals.respawns, 2);
    }
}
