//! Leader promotion, passive effects, per-tick auras and prophet oscillation.

use crate::agent::{Agent, Effects, LeaderState};
use piageon_core::{planar_distance_sq, AgentId, AgentStats, Faction, LeaderConfig, LeaderType};
use piageon_genome::{Gene, Genome, Mutator};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// Non-dying agents within the leader neighborhood radius of one agent
#[derive(Debug, Clone, Default)]
pub struct Neighborhood {
    pub neighbors: Vec<usize>,
    /// Same-faction neighbors
    pub followers: u32,
}

/// Promotions and dooms produced by one update
#[derive(Debug, Clone, Default)]
pub struct LeaderUpdate {
    pub promoted: Vec<(AgentId, LeaderType)>,
    /// Indices of prophets that rolled their self-destruct
    pub doomed: Vec<usize>,
}

/// Whether an agent's record meets its faction's promotion threshold
pub fn qualifies(kind: LeaderType, age: f32, stats: &AgentStats, followers: u32, config: &LeaderConfig) -> bool {
    match kind {
        LeaderType::Commissar => {
            stats.conversions_done >= 15 && followers >= 6 && stats.kills <= 1 && stats.time_alive >= 50.0
        }
        LeaderType::President => {
            age >= config.maturity_age + 20.0 && followers >= 5 && stats.kills == 0 && stats.conversions_done >= 4
        }
        LeaderType::King => followers >= 8 && age >= config.maturity_age + 10.0 && stats.conversions_done >= 3,
        LeaderType::Dictator => stats.kills >= 12 && followers >= 5 && stats.conversions_done >= 2,
        LeaderType::Prophet => {
            age >= config.maturity_age
                && stats.conversions_done >= 10
                && stats.kills >= 5
                && stats.time_alive >= 70.0
        }
        LeaderType::Elder => {
            age >= config.ancient_age && stats.kills == 0 && stats.conversions_done == 0 && followers >= 4
        }
    }
}

/// Genome after the promotion buffs of `kind`
pub fn buffed_genome(kind: LeaderType, base: &Genome) -> Genome {
    let mut genome = *base;
    let buffs: &[(Gene, f32)] = match kind {
        LeaderType::Commissar => &[
            (Gene::CohesionWeight, 1.3),
            (Gene::AlignmentWeight, 1.2),
            (Gene::MaxSpeed, 0.9),
        ],
        LeaderType::President => &[(Gene::Perception, 1.25), (Gene::MaxForce, 1.15)],
        LeaderType::King => &[
            (Gene::MaxSpeed, 1.2),
            (Gene::MaxForce, 1.25),
            (Gene::CohesionWeight, 0.85),
        ],
        LeaderType::Dictator => &[(Gene::MaxForce, 1.4), (Gene::SeparationWeight, 1.2)],
        LeaderType::Prophet => &[],
        LeaderType::Elder => &[(Gene::Perception, 1.8)],
    };
    for &(gene, factor) in buffs {
        genome.scale(gene, factor);
    }
    genome
}

pub fn passive_effects(kind: LeaderType) -> Effects {
    match kind {
        LeaderType::Commissar => Effects {
            conversion_resistance: 0.35,
            conversion_boost: 0.2,
            ..Effects::ZERO
        },
        LeaderType::President => Effects {
            kill_shield: 0.35,
            ..Effects::ZERO
        },
        LeaderType::King => Effects {
            kill_shield: 0.1,
            ..Effects::ZERO
        },
        LeaderType::Dictator => Effects {
            kill_aura: 0.2,
            ..Effects::ZERO
        },
        LeaderType::Prophet => Effects {
            conversion_boost: 0.15,
            ..Effects::ZERO
        },
        LeaderType::Elder => Effects {
            kill_shield: 0.5,
            conversion_resistance: 0.2,
            ..Effects::ZERO
        },
    }
}

/// Aura one leader of `kind` grants to a neighbor of `faction`
pub fn aura(kind: LeaderType, faction: Faction) -> Effects {
    match (kind, faction) {
        (LeaderType::Commissar, Faction::Communist) => Effects {
            conversion_boost: 0.2,
            ..Effects::ZERO
        },
        (LeaderType::President, Faction::Neutral) => Effects {
            kill_shield: 0.25,
            conversion_boost: 0.15,
            ..Effects::ZERO
        },
        (LeaderType::President, _) => Effects {
            kill_shield: 0.25,
            ..Effects::ZERO
        },
        (LeaderType::King, Faction::Monarchist) => Effects {
            kill_shield: 0.1,
            ..Effects::ZERO
        },
        (LeaderType::Dictator, Faction::Fascist) => Effects {
            kill_aura: 0.2,
            ..Effects::ZERO
        },
        (LeaderType::Prophet, _) => Effects {
            conversion_boost: 0.08,
            ..Effects::ZERO
        },
        (LeaderType::Elder, _) => Effects {
            kill_shield: 0.3,
            conversion_resistance: 0.1,
            ..Effects::ZERO
        },
        _ => Effects::ZERO,
    }
}

pub struct LeaderSystem {
    config: LeaderConfig,
}

impl LeaderSystem {
    pub fn new(config: LeaderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LeaderConfig {
        &self.config
    }

    pub fn neighborhoods(&self, agents: &[Agent]) -> Vec<Neighborhood> {
        let radius_sq = self.config.neighborhood_radius * self.config.neighborhood_radius;
        let mut hoods = vec![Neighborhood::default(); agents.len()];
        for (i, agent) in agents.iter().enumerate().filter(|(_, a)| !a.is_dying()) {
            for (j, other) in agents.iter().enumerate() {
                if i == j || other.is_dying() {
                    continue;
                }
                if planar_distance_sq(agent.position, other.position) <= radius_sq {
                    hoods[i].neighbors.push(j);
                    if other.faction == agent.faction {
                        hoods[i].followers += 1;
                    }
                }
            }
        }
        hoods
    }

    /// Any leader nearby, or a same-type leader within the exclusion radius
    fn promotion_blocked(&self, index: usize, kind: LeaderType, agents: &[Agent], hood: &Neighborhood) -> bool {
        if hood.neighbors.iter().any(|&n| agents[n].is_leader()) {
            return true;
        }
        let exclusion_sq = self.config.exclusion_radius * self.config.exclusion_radius;
        let position = agents[index].position;
        agents.iter().enumerate().any(|(j, other)| {
            j != index
                && !other.is_dying()
                && other.leader_type() == Some(kind)
                && planar_distance_sq(position, other.position) <= exclusion_sq
        })
    }

    fn promote(agent: &mut Agent, kind: LeaderType) {
        let base_genome = agent.genome;
        agent.genome = buffed_genome(kind, &base_genome);
        agent.leader = LeaderState::Promoted {
            kind,
            passive: passive_effects(kind),
            base_genome,
            doomed: false,
        };
        debug!(agent = %agent.id, faction = %agent.faction, leader = %kind, "agent promoted");
    }

    /// Re-derive a prophet's genome from its base and roll its self-destruct
    fn oscillate(&self, agent: &mut Agent, dt: f32, mutator: &Mutator, rng: &mut ChaCha8Rng) -> bool {
        let LeaderState::Promoted {
            kind: LeaderType::Prophet,
            base_genome,
            doomed,
            ..
        } = &mut agent.leader
        else {
            return false;
        };
        agent.genome = mutator.jitter(base_genome, rng);
        if rng.gen::<f32>() < dt * self.config.prophet_self_destruct_rate {
            *doomed = true;
        }
        *doomed
    }

    /// Reset auras, promote qualifying agents, oscillate prophets and
    /// rebroadcast every leader's aura to its neighborhood
    pub fn update(&self, agents: &mut [Agent], dt: f32, mutator: &Mutator, rng: &mut ChaCha8Rng) -> LeaderUpdate {
        for agent in agents.iter_mut() {
            agent.frame_effects = Effects::ZERO;
        }

        let hoods = self.neighborhoods(agents);
        let mut update = LeaderUpdate::default();

        for index in 0..agents.len() {
            if agents[index].is_dying() {
                continue;
            }
            if agents[index].is_leader() {
                if self.oscillate(&mut agents[index], dt, mutator, rng) {
                    update.doomed.push(index);
                }
                continue;
            }

            let agent = &agents[index];
            let kind = LeaderType::for_faction(agent.faction);
            if qualifies(kind, agent.age, &agent.stats, hoods[index].followers, &self.config)
                && !self.promotion_blocked(index, kind, agents, &hoods[index])
            {
                Self::promote(&mut agents[index], kind);
                update.promoted.push((agents[index].id, kind));
            }
        }

        let broadcasts: Vec<(LeaderType, usize)> = agents
            .iter()
            .enumerate()
            .filter(|(_, a)| !a.is_dying())
            .filter_map(|(i, a)| a.leader_type().map(|kind| (kind, i)))
            .collect();
        for (kind, leader) in broadcasts {
            for &n in &hoods[leader].neighbors {
                let gain = aura(kind, agents[n].faction);
                agents[n].frame_effects = agents[n].frame_effects + gain;
            }
        }

        update
    }
}

impl Default for LeaderSystem {
    fn default() -> Self {
        Self::new(LeaderConfig::default())
    }
}
