//! Pairwise faction interactions: kills, conversions and anarchist self-kills.
//!
//! Resolution runs in two phases. The scan over neighboring pairs only
//! records intent into a kill set and a conversion map; the apply phase
//! then marks victims dying and flips factions. A target that is both
//! killed and converted in the same tick dies without converting.

use crate::agent::Agent;
use piageon_core::{planar_distance_sq, AgentId, Faction, FactionCounts, InteractionConfig, WorldConfig};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Kill,
    Convert { faction: Faction },
    SelfKill,
}

/// What `actor` wants to do to `target`, given both local faction tallies.
///
/// Tallies include the agent they belong to. Only the anarchist rule draws
/// from `rng`.
pub fn decide(
    actor: Faction,
    target: Faction,
    actor_counts: &FactionCounts,
    target_counts: &FactionCounts,
    config: &InteractionConfig,
    rng: &mut ChaCha8Rng,
) -> Option<Action> {
    use Faction::*;

    if actor == Neutral {
        return None;
    }

    if target == Anarchist && actor_counts[actor] > target_counts[Anarchist] {
        return Some(Action::Kill);
    }

    let convert = Some(Action::Convert { faction: actor });

    match (actor, target) {
        (Communist, Neutral | Democrat) => convert,
        (Communist, Monarchist) => {
            let margin = actor_counts[Communist] as i64 - target_counts[Monarchist] as i64;
            (margin >= 2).then_some(Action::Kill)
        }
        (Democrat, Neutral | Monarchist) => convert,
        (Democrat, Fascist) => (actor_counts[Democrat] > target_counts[Fascist]).then_some(Action::Kill),
        (Monarchist, Neutral | Fascist) => convert,
        (Monarchist, Communist) => {
            let margin = target_counts[Communist] as i64 - actor_counts[Monarchist] as i64;
            (margin <= 2).then_some(Action::Kill)
        }
        (Fascist, Neutral | Communist) => convert,
        (Fascist, Democrat) => (actor_counts[Fascist] >= target_counts[Democrat]).then_some(Action::Kill),
        (Anarchist, Neutral) => convert,
        (Anarchist, _) => {
            if rng.gen::<f32>() < config.anarchist_conversion_chance {
                convert
            } else {
                Some(Action::SelfKill)
            }
        }
        _ => None,
    }
}

/// Leader protection applied before any shield or resistance roll.
///
/// Conversions never touch a leader; kills need `min_attackers` of the
/// actor's faction present locally.
pub fn leader_gate(action: Action, target_is_leader: bool, attackers: u32, min_attackers: u32) -> Option<Action> {
    if !target_is_leader {
        return Some(action);
    }
    match action {
        Action::Convert { .. } => None,
        Action::Kill if attackers < min_attackers => None,
        _ => Some(action),
    }
}

/// Result of one resolution pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionOutcome {
    /// Targets killed by another agent
    pub killed: Vec<AgentId>,
    pub converted: Vec<(AgentId, Faction)>,
    /// Anarchists that took themselves out
    pub self_killed: Vec<AgentId>,
}

#[derive(Default)]
struct Pending {
    kills: BTreeSet<usize>,
    conversions: BTreeMap<usize, Faction>,
    self_kills: BTreeSet<usize>,
}

impl Pending {
    fn dies(&self, index: usize) -> bool {
        self.kills.contains(&index) || self.self_kills.contains(&index)
    }
}

pub struct InteractionResolver {
    config: InteractionConfig,
}

impl InteractionResolver {
    pub fn new(config: InteractionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &InteractionConfig {
        &self.config
    }

    /// Non-dying neighbor pairs `(i, j)` with `i < j` within `radius`,
    /// plus each agent's local faction tally including itself
    pub fn neighborhoods(agents: &[Agent], radius: f32) -> (Vec<(usize, usize)>, Vec<FactionCounts>) {
        let radius_sq = radius * radius;
        let living: Vec<usize> = (0..agents.len()).filter(|&i| !agents[i].is_dying()).collect();

        let mut counts = vec![FactionCounts::new(); agents.len()];
        for &i in &living {
            counts[i].add(agents[i].faction);
        }

        let mut pairs = Vec::new();
        for (a, &i) in living.iter().enumerate() {
            for &j in &living[a + 1..] {
                if planar_distance_sq(agents[i].position, agents[j].position) <= radius_sq {
                    pairs.push((i, j));
                    counts[i].add(agents[j].faction);
                    counts[j].add(agents[i].faction);
                }
            }
        }
        (pairs, counts)
    }

    /// Evaluate every neighboring pair in both directions, then apply the
    /// recorded kills and conversions and clamp survivors into bounds
    pub fn resolve(&self, agents: &mut [Agent], world: &WorldConfig, rng: &mut ChaCha8Rng) -> InteractionOutcome {
        let (pairs, counts) = Self::neighborhoods(agents, world.interaction_radius);
        let mut pending = Pending::default();

        for &(i, j) in &pairs {
            for (actor, target) in [(i, j), (j, i)] {
                let action = decide(
                    agents[actor].faction,
                    agents[target].faction,
                    &counts[actor],
                    &counts[target],
                    &self.config,
                    rng,
                );
                if let Some(action) = action {
                    self.apply(action, actor, target, agents, &counts[actor], &mut pending, rng);
                }
            }
        }

        let mut outcome = InteractionOutcome::default();

        for &index in &pending.kills {
            if agents[index].mark_dying() {
                outcome.killed.push(agents[index].id);
            }
        }
        for &index in &pending.self_kills {
            if agents[index].mark_dying() {
                outcome.self_killed.push(agents[index].id);
            }
        }

        for (&index, &faction) in &pending.conversions {
            let agent = &mut agents[index];
            if !agent.is_dying() && agent.faction != faction {
                agent.faction = faction;
                agent.triggers.converted = true;
                outcome.converted.push((agent.id, faction));
            }
        }

        let limit = world.world_half_size - self.config.boundary_margin;
        for agent in agents.iter_mut().filter(|a| !a.is_dying()) {
            agent.position.x = agent.position.x.clamp(-limit, limit);
            agent.position.z = agent.position.z.clamp(-limit, limit);
            agent.position.y = world.ground_y;
        }

        outcome
    }

    #[allow(clippy::too_many_arguments)]
    fn apply(
        &self,
        action: Action,
        actor: usize,
        target: usize,
        agents: &mut [Agent],
        actor_counts: &FactionCounts,
        pending: &mut Pending,
        rng: &mut ChaCha8Rng,
    ) {
        let attackers = actor_counts[agents[actor].faction];
        let Some(action) = leader_gate(
            action,
            agents[target].is_leader(),
            attackers,
            self.config.leader_kill_min_attackers,
        ) else {
            return;
        };

        let actor_effects = agents[actor].effective_effects();
        let target_effects = agents[target].effective_effects();

        match action {
            Action::SelfKill => {
                pending.self_kills.insert(actor);
                trace!(agent = %agents[actor].id, "anarchist self-kill");
            }
            Action::Kill => {
                let shield = (target_effects.kill_shield - actor_effects.kill_aura).max(0.0);
                if rng.gen::<f32>() < shield {
                    return;
                }
                pending.kills.insert(target);
                agents[actor].record_kill();
                agents[target].record_damage();
                trace!(actor = %agents[actor].id, target = %agents[target].id, "kill");
            }
            Action::Convert { faction } => {
                if agents[target].faction == faction {
                    return;
                }
                let block = (self.config.base_conversion_resistance + target_effects.conversion_resistance
                    - actor_effects.conversion_boost)
                    .max(0.0);
                if rng.gen::<f32>() < block || pending.dies(target) {
                    return;
                }
                pending.conversions.insert(target, faction);
                agents[actor].record_conversion();
                agents[target].record_damage();
                trace!(actor = %agents[actor].id, target = %agents[target].id, %faction, "convert");
            }
        }
    }
}

impl Default for InteractionResolver {
    fn default() -> Self {
        Self::new(InteractionConfig::default())
    }
}
