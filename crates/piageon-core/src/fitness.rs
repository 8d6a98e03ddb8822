//! Fitness and statistics tracking for agents.

use serde::{Deserialize, Serialize};

/// Per-agent accumulated statistics, used for display and as fitness inputs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentStats {
    /// Successful kills performed by this agent
    pub kills: u32,
    /// Successful conversions performed by this agent
    pub conversions_done: u32,
    /// Successful kills or conversions suffered
    pub damage_taken: u32,
    /// Accumulated squared steering magnitude over time
    pub energy_spent: f32,
    /// Simulated seconds survived
    pub time_alive: f32,
}

impl AgentStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scalar fitness used for parent selection
    pub fn fitness(&self) -> f32 {
        let conversion_score = self.conversions_done as f32 * 3.0;
        let kill_score = self.kills as f32 * 4.0;
        let damage_penalty = self.damage_taken as f32 * -2.0;
        let energy_penalty = self.energy_spent * -0.5;

        self.time_alive + conversion_score + kill_score + damage_penalty + energy_penalty
    }
}

/// Running summary of fitness values across a population
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FitnessSummary {
    pub count: u32,
    pub mean: f32,
    pub best: Option<f32>,
    pub worst: Option<f32>,
}

impl FitnessSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one fitness value into the summary
    pub fn update(&mut self, fitness: f32) {
        let n = self.count as f32;
        self.mean = (self.mean * n + fitness) / (n + 1.0);
        self.best = Some(self.best.map_or(fitness, |b| b.max(fitness)));
        self.worst = Some(self.worst.map_or(fitness, |w| w.min(fitness)));
        self.count += 1;
    }
}

impl FromIterator<f32> for FitnessSummary {
    fn from_iter<I: IntoIterator<Item = f32>>(iter: I) -> Self {
        let mut summary = Self::new();
        for fitness in iter {
            summary.update(fitness);
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fitness_weights() {
        let stats = AgentStats {
            kills: 2,
            conversions_done: 3,
            damage_taken: 1,
            energy_spent: 4.0,
            time_alive: 10.0,
        };
        // 10 + 9 + 8 - 2 - 2
        assert!((stats.fitness() - 23.0).abs() < 1e-5);
    }

    #[test]
    fn test_fresh_agent_has_zero_fitness() {
        assert_eq!(AgentStats::new().fitness(), 0.0);
    }

    #[test]
    fn test_summary_update() {
        let summary: FitnessSummary = [10.0, 20.0, 30.0].into_iter().collect();
        assert_eq!(summary.count, 3);
        assert!((summary.mean - 20.0).abs() < 1e-5);
        assert_eq!(summary.best, Some(30.0));
        assert_eq!(summary.worst, Some(10.0));
    }

    #[test]
    fn test_empty_summary() {
        let summary = FitnessSummary::new();
        assert_eq!(summary.count, 0);
        assert!(summary.best.is_none());
    }
}
