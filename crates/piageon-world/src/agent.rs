//! Agent state and management.

use crate::clustering::Cluster;
use crate::locomotion::{random_flat, Locomotion};
use glam::Vec3;
use piageon_core::{AgentId, AgentStats, Faction, LeaderType, LifecycleState, MotionMode};
use piageon_genome::Genome;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::ops::Add;

/// Probabilistic modifiers an agent carries into interaction resolution.
///
/// Shield and resistance protect the holder; boost and aura weaken the
/// other side's protection when the holder is the actor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Effects {
    pub kill_shield: f32,
    pub conversion_resistance: f32,
    pub conversion_boost: f32,
    pub kill_aura: f32,
}

impl Effects {
    pub const ZERO: Effects = Effects {
        kill_shield: 0.0,
        conversion_resistance: 0.0,
        conversion_boost: 0.0,
        kill_aura: 0.0,
    };
}

impl Add for Effects {
    type Output = Effects;

    fn add(self, other: Effects) -> Effects {
        Effects {
            kill_shield: self.kill_shield + other.kill_shield,
            conversion_resistance: self.conversion_resistance + other.conversion_resistance,
            conversion_boost: self.conversion_boost + other.conversion_boost,
            kill_aura: self.kill_aura + other.kill_aura,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum LeaderState {
    #[default]
    None,
    Promoted {
        kind: LeaderType,
        passive: Effects,
        /// Genome before the promotion buffs were applied
        base_genome: Genome,
        /// Prophet rolled its self-destruct this tick
        doomed: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lifecycle {
    Alive,
    Dying { timer: f32 },
}

/// One-tick animation cues, cleared at the start of every tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triggers {
    pub died: bool,
    pub converted: bool,
    pub attacked: bool,
}

/// An agent in the simulation
#[derive(Debug, Clone)]
pub struct Agent {
    pub id: AgentId,
    pub position: Vec3,
    pub velocity: Vec3,
    pub acceleration: Vec3,
    pub genome: Genome,
    pub faction: Faction,
    pub leader: LeaderState,
    /// Aura contributions from nearby leaders, rebuilt every tick
    pub frame_effects: Effects,
    pub lifecycle: Lifecycle,
    pub motion: Locomotion,
    pub age: f32,
    pub stats: AgentStats,
    pub cluster: Cluster,
    pub triggers: Triggers,
}

impl Agent {
    pub fn new(
        id: AgentId,
        position: Vec3,
        faction: Faction,
        genome: Genome,
        rng: &mut ChaCha8Rng,
    ) -> Self {
        let velocity = random_flat(rng) * rng.gen_range(0.5..1.0);
        Self {
            id,
            position,
            velocity,
            acceleration: Vec3::ZERO,
            genome,
            faction,
            leader: LeaderState::None,
            frame_effects: Effects::ZERO,
            lifecycle: Lifecycle::Alive,
            motion: Locomotion::new(rng),
            age: 0.0,
            stats: AgentStats::new(),
            cluster: Cluster::Mixed,
            triggers: Triggers::default(),
        }
    }

    pub fn is_dying(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Dying { .. })
    }

    pub fn state(&self) -> LifecycleState {
        match self.lifecycle {
            Lifecycle::Alive => LifecycleState::Alive,
            Lifecycle::Dying { .. } => LifecycleState::Dying,
        }
    }

    /// Enter the dying state. Returns false if already dying.
    pub fn mark_dying(&mut self) -> bool {
        if self.is_dying() {
            return false;
        }
        self.lifecycle = Lifecycle::Dying { timer: 0.0 };
        self.triggers.died = true;
        true
    }

    /// Advance the death timer. Returns true once it has exceeded `delay`.
    pub fn advance_death_timer(&mut self, dt: f32, delay: f32) -> bool {
        match &mut self.lifecycle {
            Lifecycle::Dying { timer } => {
                *timer += dt;
                *timer > delay
            }
            Lifecycle::Alive => false,
        }
    }

    pub fn is_leader(&self) -> bool {
        matches!(self.leader, LeaderState::Promoted { .. })
    }

    pub fn leader_type(&self) -> Option<LeaderType> {
        match self.leader {
            LeaderState::Promoted { kind, .. } => Some(kind),
            LeaderState::None => None,
        }
    }

    pub fn passive_effects(&self) -> Effects {
        match self.leader {
            LeaderState::Promoted { passive, .. } => passive,
            LeaderState::None => Effects::ZERO,
        }
    }

    /// Passive leader effects plus this tick's aura contributions
    pub fn effective_effects(&self) -> Effects {
        self.passive_effects() + self.frame_effects
    }

    /// Genome passed to offspring: leaders pass on their pre-promotion genome
    pub fn heritable_genome(&self) -> Genome {
        match self.leader {
            LeaderState::Promoted { base_genome, .. } => base_genome,
            LeaderState::None => self.genome,
        }
    }

    pub fn fitness(&self) -> f32 {
        self.stats.fitness()
    }

    pub fn grow(&mut self, dt: f32) {
        self.age += dt;
        self.stats.time_alive += dt;
    }

    pub fn record_kill(&mut self) {
        self.stats.kills += 1;
        self.triggers.attacked = true;
    }

    pub fn record_conversion(&mut self) {
        self.stats.conversions_done += 1;
        self.triggers.attacked = true;
    }

    pub fn record_damage(&mut self) {
        self.stats.damage_taken += 1;
    }

    pub fn record_energy(&mut self, amount: f32) {
        self.stats.energy_spent += amount;
    }
}

/// Frozen copy of the neighbor-visible part of an agent.
///
/// Steering and classification read neighbors from these so that updates
/// within a tick never observe partially-updated state.
#[derive(Debug, Clone, Copy)]
pub struct AgentView {
    pub index: usize,
    pub position: Vec3,
    pub velocity: Vec3,
    pub faction: Faction,
}

/// Views of every agent that is not dying
pub fn living_views(agents: &[Agent]) -> Vec<AgentView> {
    agents
        .iter()
        .enumerate()
        .filter(|(_, agent)| !agent.is_dying())
        .map(|(index, agent)| AgentView {
            index,
            position: agent.position,
            velocity: agent.velocity,
            faction: agent.faction,
        })
        .collect()
}

/// Serializable view of an agent for renderers and inspection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: AgentId,
    pub position: Vec3,
    pub velocity: Vec3,
    pub faction: Faction,
    pub color: String,
    pub leader_type: Option<LeaderType>,
    pub state: LifecycleState,
    pub motion: MotionMode,
    pub cluster: Cluster,
    pub age: f32,
    pub fitness: f32,
    pub genome: Genome,
    pub stats: AgentStats,
    pub triggers: Triggers,
}

impl From<&Agent> for AgentSnapshot {
    fn from(agent: &Agent) -> Self {
        Self {
            id: agent.id,
            position: agent.position,
            velocity: agent.velocity,
            faction: agent.faction,
            color: agent.faction.color().to_string(),
            leader_type: agent.leader_type(),
            state: agent.state(),
            motion: agent.motion.mode,
            cluster: agent.cluster,
            age: agent.age,
            fitness: agent.fitness(),
            genome: agent.genome,
            stats: agent.stats.clone(),
            triggers: agent.triggers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn test_agent(faction: Faction) -> Agent {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        Agent::new(AgentId(1), Vec3::new(1.0, 18.0, 2.0), faction, Genome::midpoint(), &mut rng)
    }

    #[test]
    fn test_agent_creation() {
        let agent = test_agent(Faction::Democrat);
        assert_eq!(agent.state(), LifecycleState::Alive);
        assert!(!agent.is_leader());
        assert_eq!(agent.age, 0.0);
        assert_eq!(agent.velocity.y, 0.0);
        let speed = agent.velocity.length();
        assert!((0.5 - 1e-4..1.0 + 1e-4).contains(&speed));
    }

    #[test]
    fn test_death_timer() {
        let mut agent = test_agent(Faction::Fascist);
        assert!(!agent.advance_death_timer(10.0, 3.0));

        assert!(agent.mark_dying());
        assert!(agent.triggers.died);
        assert!(!agent.mark_dying());

        assert!(!agent.advance_death_timer(2.0, 3.0));
        assert!(!agent.advance_death_timer(1.0, 3.0));
        assert!(agent.advance_death_timer(0.1, 3.0));
    }

    #[test]
    fn test_effective_effects_sum_passive_and_frame() {
        let mut agent = test_agent(Faction::Monarchist);
        agent.leader = LeaderState::Promoted {
            kind: LeaderType::King,
            passive: Effects {
                kill_shield: 0.15,
                conversion_resistance: 0.3,
                ..Effects::ZERO
            },
            base_genome: Genome::midpoint(),
            doomed: false,
        };
        agent.frame_effects.conversion_resistance = 0.25;

        let effects = agent.effective_effects();
        assert!((effects.kill_shield - 0.15).abs() < 1e-6);
        assert!((effects.conversion_resistance - 0.55).abs() < 1e-6);
        assert_eq!(agent.leader_type(), Some(LeaderType::King));
    }

    #[test]
    fn test_leaders_pass_on_base_genome() {
        let mut agent = test_agent(Faction::Democrat);
        let base = agent.genome;
        let mut boosted = base;
        boosted.scale(piageon_genome::Gene::MaxSpeed, 1.15);
        agent.genome = boosted;
        agent.leader = LeaderState::Promoted {
            kind: LeaderType::President,
            passive: Effects::ZERO,
            base_genome: base,
            doomed: false,
        };
        assert_eq!(agent.heritable_genome(), base);
    }

    #[test]
    fn test_stats_tracking() {
        let mut agent = test_agent(Faction::Communist);
        agent.record_kill();
        agent.record_conversion();
        agent.record_damage();
        agent.grow(2.5);

        assert_eq!(agent.stats.kills, 1);
        assert_eq!(agent.stats.conversions_done, 1);
        assert_eq!(agent.stats.damage_taken, 1);
        assert!(agent.triggers.attacked);
        assert!((agent.stats.time_alive - 2.5).abs() < 1e-6);
    }

    #[test]
    fn test_snapshot_serialization() {
        let agent = test_agent(Faction::Anarchist);
        let snapshot = AgentSnapshot::from(&agent);
        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: AgentSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, agent.id);
        assert_eq!(parsed.faction, Faction::Anarchist);
        assert_eq!(parsed.leader_type, None);
    }
}
