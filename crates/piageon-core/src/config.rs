//! Configuration types for the simulation.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{Error, Result};

/// World configuration parameters, supplied once at initialization
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Number of agents seeded at start (and kept constant by respawning)
    pub agent_count: usize,
    /// Half the side length of the square world
    pub world_half_size: f32,
    /// Distance within which political interactions happen
    pub interaction_radius: f32,
    /// Multiplier applied to elapsed time on top of the host speed
    pub time_scale: f32,
    /// Height every agent is pinned to
    pub ground_y: f32,
    /// Seconds a dying agent lingers before it is replaced
    pub death_delay_secs: f32,
    /// Random seed for reproducibility; entropy when absent
    pub seed: Option<u64>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            agent_count: 100,
            world_half_size: 40.0,
            interaction_radius: 3.0,
            time_scale: 1.0,
            ground_y: 18.0,
            death_delay_secs: 3.0,
            seed: None,
        }
    }
}

/// Flocking and locomotion tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlockingConfig {
    /// Scale of the random wander impulse, relative to max force
    pub wander_strength: f32,
    /// Upper bound applied to the genome perception radius
    pub perception_ceiling: f32,
    /// Distance under which separation is weighted more heavily
    pub personal_space: f32,
    /// Separation multiplier inside personal space
    pub personal_space_weight: f32,
    /// Velocity multiplier applied every idle tick
    pub idle_damping: f32,
    /// Speed cap while idle, as a fraction of cluster max speed
    pub idle_speed_fraction: f32,
    /// Speed cap while walking, as a fraction of cluster max speed
    pub walk_speed_fraction: f32,
    /// Speed cap while turning, as a fraction of cluster max speed
    pub turn_speed_fraction: f32,
    /// Fraction of the containment margin at which boundary steering starts
    pub boundary_start_fraction: f32,
    /// Distance kept between the containment margin and the world edge
    pub boundary_cushion: f32,
    /// Weight of the heading bias applied in turn mode
    pub turn_heading_weight: f32,
}

impl Default for FlockingConfig {
    fn default() -> Self {
        Self {
            wander_strength: 0.35,
            perception_ceiling: 1.5,
            personal_space: 0.35,
            personal_space_weight: 2.5,
            idle_damping: 0.9,
            idle_speed_fraction: 0.2,
            walk_speed_fraction: 0.65,
            turn_speed_fraction: 0.35,
            boundary_start_fraction: 0.9,
            boundary_cushion: 1.5,
            turn_heading_weight: 0.5,
        }
    }
}

/// Genetic operator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneticsConfig {
    /// Per-gene probability of mutation (0.0 to 1.0)
    pub mutation_rate: f32,
    /// Mutation noise as a fraction of the gene span
    pub mutation_strength: f32,
    /// Relative jitter applied to prophet genomes every tick
    pub prophet_jitter: f32,
}

impl Default for GeneticsConfig {
    fn default() -> Self {
        Self {
            mutation_rate: 0.15,
            mutation_strength: 0.25,
            prophet_jitter: 0.2,
        }
    }
}

/// Political interaction tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Baseline probability that a conversion attempt is blocked
    pub base_conversion_resistance: f32,
    /// Probability an anarchist converts a non-neutral target instead of dying
    pub anarchist_conversion_chance: f32,
    /// Same-faction attackers required before a leader can be killed
    pub leader_kill_min_attackers: u32,
    /// Distance kept from the world edge after resolution
    pub boundary_margin: f32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            base_conversion_resistance: 0.15,
            anarchist_conversion_chance: 0.35,
            leader_kill_min_attackers: 3,
            boundary_margin: 0.5,
        }
    }
}

/// Leader promotion and aura tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaderConfig {
    /// Radius used for follower counts, leader blocking and auras
    pub neighborhood_radius: f32,
    /// Radius inside which a same-type leader blocks promotion
    pub exclusion_radius: f32,
    /// Age from which most leader roles become reachable
    pub maturity_age: f32,
    /// Age required for an elder
    pub ancient_age: f32,
    /// Per-second probability that a prophet destroys itself
    pub prophet_self_destruct_rate: f32,
}

impl Default for LeaderConfig {
    fn default() -> Self {
        Self {
            neighborhood_radius: 5.0,
            exclusion_radius: 8.0,
            maturity_age: 80.0,
            ancient_age: 140.0,
            prophet_self_destruct_rate: 0.05,
        }
    }
}

/// Full simulation configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub world: WorldConfig,
    pub flocking: FlockingConfig,
    pub genetics: GeneticsConfig,
    pub interaction: InteractionConfig,
    pub leaders: LeaderConfig,
}

impl SimConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Reject values that would make the simulation meaningless
    pub fn validate(&self) -> Result<()> {
        let world = &self.world;
        positive("world.world_half_size", world.world_half_size)?;
        positive("world.interaction_radius", world.interaction_radius)?;
        non_negative("world.time_scale", world.time_scale)?;
        non_negative("world.death_delay_secs", world.death_delay_secs)?;
        finite("world.ground_y", world.ground_y)?;
        if world.world_half_size <= self.interaction.boundary_margin + 1.0 {
            return Err(Error::Validation(format!(
                "world.world_half_size {} leaves no room inside the boundary margin {}",
                world.world_half_size, self.interaction.boundary_margin
            )));
        }

        let flocking = &self.flocking;
        positive("flocking.perception_ceiling", flocking.perception_ceiling)?;
        non_negative("flocking.wander_strength", flocking.wander_strength)?;
        non_negative("flocking.personal_space", flocking.personal_space)?;
        non_negative("flocking.personal_space_weight", flocking.personal_space_weight)?;
        probability("flocking.idle_damping", flocking.idle_damping)?;
        probability("flocking.idle_speed_fraction", flocking.idle_speed_fraction)?;
        probability("flocking.walk_speed_fraction", flocking.walk_speed_fraction)?;
        probability("flocking.turn_speed_fraction", flocking.turn_speed_fraction)?;
        probability("flocking.boundary_start_fraction", flocking.boundary_start_fraction)?;
        non_negative("flocking.boundary_cushion", flocking.boundary_cushion)?;
        non_negative("flocking.turn_heading_weight", flocking.turn_heading_weight)?;

        probability("genetics.mutation_rate", self.genetics.mutation_rate)?;
        non_negative("genetics.mutation_strength", self.genetics.mutation_strength)?;
        probability("genetics.prophet_jitter", self.genetics.prophet_jitter)?;

        probability(
            "interaction.base_conversion_resistance",
            self.interaction.base_conversion_resistance,
        )?;
        probability(
            "interaction.anarchist_conversion_chance",
            self.interaction.anarchist_conversion_chance,
        )?;
        non_negative("interaction.boundary_margin", self.interaction.boundary_margin)?;

        positive("leaders.neighborhood_radius", self.leaders.neighborhood_radius)?;
        non_negative("leaders.exclusion_radius", self.leaders.exclusion_radius)?;
        non_negative("leaders.maturity_age", self.leaders.maturity_age)?;
        non_negative("leaders.ancient_age", self.leaders.ancient_age)?;
        non_negative(
            "leaders.prophet_self_destruct_rate",
            self.leaders.prophet_self_destruct_rate,
        )?;

        Ok(())
    }
}

fn finite(name: &str, value: f32) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::Config(format!("{} must be finite, got {}", name, value)))
    }
}

fn positive(name: &str, value: f32) -> Result<()> {
    finite(name, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(Error::Config(format!("{} must be positive, got {}", name, value)))
    }
}

fn non_negative(name: &str, value: f32) -> Result<()> {
    finite(name, value)?;
    if value >= 0.0 {
        Ok(())
    } else {
        Err(Error::Config(format!("{} must not be negative, got {}", name, value)))
    }
}

fn probability(name: &str, value: f32) -> Result<()> {
    finite(name, value)?;
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::Config(format!("{} must lie in [0, 1], got {}", name, value)))
    }
}

/// Runner configuration for the host binary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Frames per second driven by the runner
    pub frame_rate: u32,
    /// Tick on a wall-clock interval instead of as fast as possible
    pub realtime: bool,
    /// Stop after this many frames
    pub max_frames: Option<u64>,
    /// Log population metrics every N ticks
    pub report_every: u64,
    /// OpenTelemetry endpoint
    pub otel_endpoint: Option<String>,
    /// Simulation configuration
    pub sim: SimConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            frame_rate: 60,
            realtime: false,
            max_frames: Some(3_600),
            report_every: 300,
            otel_endpoint: None,
            sim: SimConfig::default(),
        }
    }
}

impl RunnerConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: RunnerConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.frame_rate == 0 {
            return Err(Error::Config("frame_rate must be at least 1".to_string()));
        }
        self.sim.validate()
    }

    /// Seconds between frames
    pub fn frame_dt(&self) -> f32 {
        1.0 / self.frame_rate.max(1) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configs() {
        let world = WorldConfig::default();
        assert_eq!(world.agent_count, 100);
        assert_eq!(world.world_half_size, 40.0);
        assert_eq!(world.interaction_radius, 3.0);

        let interaction = InteractionConfig::default();
        assert_eq!(interaction.leader_kill_min_attackers, 3);
        assert_eq!(interaction.base_conversion_resistance, 0.15);

        let genetics = GeneticsConfig::default();
        assert_eq!(genetics.mutation_rate, 0.15);

        assert!(SimConfig::default().validate().is_ok());
        assert!(RunnerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = SimConfig::from_json_str(
            r#"{ "world": { "agent_count": 12, "seed": 7 }, "interaction": { "anarchist_conversion_chance": 0.5 } }"#,
        )
        .unwrap();
        assert_eq!(config.world.agent_count, 12);
        assert_eq!(config.world.seed, Some(7));
        assert_eq!(config.world.world_half_size, 40.0);
        assert_eq!(config.interaction.anarchist_conversion_chance, 0.5);
        assert_eq!(config.leaders.neighborhood_radius, 5.0);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = SimConfig::default();
        config.interaction.anarchist_conversion_chance = 1.5;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = SimConfig::default();
        config.world.interaction_radius = f32::NAN;
        assert!(config.validate().is_err());

        let mut config = SimConfig::default();
        config.world.world_half_size = 1.0;
        assert!(matches!(config.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_malformed_json_is_serialization_error() {
        let err = SimConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_runner_frame_dt() {
        let runner = RunnerConfig {
            frame_rate: 50,
            ..Default::default()
        };
        assert!((runner.frame_dt() - 0.02).abs() < 1e-6);
    }
}
