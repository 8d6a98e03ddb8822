//! Population manager: owns the agents and drives every subsystem per tick.

use crate::agent::{Agent, AgentSnapshot};
use crate::clustering::assign_clusters;
use crate::flocking::FlockingEngine;
use crate::interaction::InteractionResolver;
use crate::leader::LeaderSystem;
use crate::observer::SimulationObserver;
use crate::snapshot::{PopulationStats, RunTotals, TickReport};
use glam::Vec3;
use piageon_core::{AgentId, Faction, FactionCounts, Result, SimConfig};
use piageon_genome::{Genome, Mutator};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy)]
struct Controls {
    paused: bool,
    speed: f32,
    reset_pending: bool,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            paused: false,
            speed: 1.0,
            reset_pending: false,
        }
    }
}

pub struct Simulation {
    config: SimConfig,
    agents: Vec<Agent>,
    rng: ChaCha8Rng,
    mutator: Mutator,
    flocking: FlockingEngine,
    resolver: InteractionResolver,
    leaders: LeaderSystem,
    next_id: u64,
    tick: u64,
    sim_time: f64,
    controls: Controls,
    selected: Option<AgentId>,
    totals: RunTotals,
    observers: Vec<Box<dyn SimulationObserver>>,
}

impl Simulation {
    /// Validate `config` and seed the initial population, using
    /// `config.world.seed` when present
    pub fn new(config: SimConfig) -> Result<Self> {
        let rng = match config.world.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self::with_rng(config, rng)
    }

    pub fn with_rng(config: SimConfig, rng: ChaCha8Rng) -> Result<Self> {
        config.validate()?;

        let mut sim = Self {
            mutator: Mutator::new(config.genetics.clone()),
            flocking: FlockingEngine::new(config.flocking.clone()),
            resolver: InteractionResolver::new(config.interaction.clone()),
            leaders: LeaderSystem::new(config.leaders.clone()),
            config,
            agents: Vec::new(),
            rng,
            next_id: 0,
            tick: 0,
            sim_time: 0.0,
            controls: Controls::default(),
            selected: None,
            totals: RunTotals::default(),
            observers: Vec::new(),
        };
        sim.seed_population();
        Ok(sim)
    }

    fn next_agent_id(&mut self) -> AgentId {
        let id = AgentId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Fill the world with a balanced mix of factions at random positions
    fn seed_population(&mut self) {
        let count = self.config.world.agent_count;
        let extent = self.config.world.world_half_size - 1.0;
        let ground = self.config.world.ground_y;

        self.agents.reserve(count);
        let mut cycle = Faction::shuffled(&mut self.rng);
        for i in 0..count {
            if i > 0 && i % Faction::COUNT == 0 {
                cycle = Faction::shuffled(&mut self.rng);
            }
            let faction = cycle[i % Faction::COUNT];
            let position = Vec3::new(
                self.rng.gen_range(-extent..=extent),
                ground,
                self.rng.gen_range(-extent..=extent),
            );
            let genome = Genome::random(&mut self.rng);
            let id = self.next_agent_id();
            self.agents.push(Agent::new(id, position, faction, genome, &mut self.rng));
        }

        info!(
            agents = self.agents.len(),
            half_size = self.config.world.world_half_size,
            "Population seeded"
        );
    }

    /// Advance the simulation by `dt` wall-clock seconds
    pub fn tick(&mut self, dt: f32) -> TickReport {
        let mut report = TickReport::default();

        if self.controls.reset_pending {
            self.reset_now();
            report.reset = true;
        }

        if self.controls.paused {
            report.tick = self.tick;
            report.skipped = true;
            return report;
        }

        let dt = if dt.is_finite() && dt > 0.0 {
            dt * self.controls.speed * self.config.world.time_scale
        } else {
            if !dt.is_finite() {
                warn!(dt, "Ignoring non-finite frame delta");
            }
            0.0
        };
        report.dt = dt;

        for agent in &mut self.agents {
            agent.triggers = Default::default();
        }

        assign_clusters(&mut self.agents);
        self.flocking.update(&mut self.agents, dt, &self.config.world, &mut self.rng);

        let leader_update = self.leaders.update(&mut self.agents, dt, &self.mutator, &mut self.rng);
        for index in leader_update.doomed {
            if self.agents[index].mark_dying() {
                debug!(agent = %self.agents[index].id, "Prophet self-destructed");
                report.self_destructed.push(self.agents[index].id);
            }
        }
        report.promoted = leader_update.promoted;

        let outcome = self.resolver.resolve(&mut self.agents, &self.config.world, &mut self.rng);
        report.killed = outcome.killed;
        report.converted = outcome.converted;
        report.self_killed = outcome.self_killed;

        for agent in self.agents.iter_mut().filter(|a| !a.is_dying()) {
            agent.grow(dt);
        }

        report.removed = self.remove_expired(dt);
        for _ in 0..report.removed.len() {
            let child = self.spawn_child();
            report.respawned.push(child);
        }

        self.tick += 1;
        self.sim_time += dt as f64;
        report.tick = self.tick;
        self.totals.record(&report);

        if !self.observers.is_empty() {
            let stats = self.population_stats();
            for observer in &mut self.observers {
                observer.on_tick(&report, &stats);
            }
        }

        report
    }

    /// Advance death timers and drop agents whose grace period has ended.
    ///
    /// Agents that died this tick start their timer on the next one.
    fn remove_expired(&mut self, dt: f32) -> Vec<AgentId> {
        let delay = self.config.world.death_delay_secs;
        let expired: Vec<usize> = self
            .agents
            .iter_mut()
            .enumerate()
            .filter(|(_, agent)| !agent.triggers.died)
            .filter_map(|(i, agent)| agent.advance_death_timer(dt, delay).then_some(i))
            .collect();

        let mut removed = Vec::with_capacity(expired.len());
        for index in expired.into_iter().rev() {
            let agent = self.agents.swap_remove(index);
            debug!(
                agent = %agent.id,
                faction = %agent.faction,
                age = agent.age,
                fitness = agent.fitness(),
                "Agent removed"
            );
            if self.selected == Some(agent.id) {
                self.selected = None;
            }
            removed.push(agent.id);
        }
        removed
    }

    /// Roulette-wheel draw over non-dying agents, weighted by fitness
    fn pick_parent(&mut self) -> Option<usize> {
        let weights: Vec<(usize, f32)> = self
            .agents
            .iter()
            .enumerate()
            .filter(|(_, a)| !a.is_dying())
            .map(|(i, a)| (i, a.fitness().max(0.001)))
            .collect();
        let (&(last, _), _) = weights.split_last()?;

        let total: f32 = weights.iter().map(|(_, w)| w).sum();
        let mut roll = self.rng.gen::<f32>() * total;
        for &(index, weight) in &weights {
            roll -= weight;
            if roll <= 0.0 {
                return Some(index);
            }
        }
        Some(last)
    }

    /// Breed a replacement from two fitness-selected parents, falling back
    /// to a random neutral agent when nobody is left to breed from
    fn spawn_child(&mut self) -> AgentId {
        let (faction, genome) = match (self.pick_parent(), self.pick_parent()) {
            (Some(p1), Some(p2)) => {
                let (a, b) = (&self.agents[p1], &self.agents[p2]);
                let faction = if b.fitness() > a.fitness() { b.faction } else { a.faction };
                let (ga, gb) = (a.heritable_genome(), b.heritable_genome());
                (faction, self.mutator.child(&ga, Some(&gb), &mut self.rng))
            }
            _ => (Faction::Neutral, Genome::random(&mut self.rng)),
        };

        let radius = self.config.world.world_half_size - 1.0;
        let r = self.rng.gen::<f32>().sqrt() * radius;
        let theta = self.rng.gen::<f32>() * std::f32::consts::TAU;
        let position = Vec3::new(r * theta.cos(), self.config.world.ground_y, r * theta.sin());

        let id = self.next_agent_id();
        let agent = Agent::new(id, position, faction, genome, &mut self.rng);
        debug!(agent = %id, faction = %faction, genome = %genome, "Agent respawned");
        self.agents.push(agent);
        id
    }

    pub fn pause(&mut self) {
        self.controls.paused = true;
    }

    pub fn resume(&mut self) {
        self.controls.paused = false;
    }

    pub fn toggle_pause(&mut self) -> bool {
        self.controls.paused = !self.controls.paused;
        self.controls.paused
    }

    pub fn is_paused(&self) -> bool {
        self.controls.paused
    }

    pub fn speed(&self) -> f32 {
        self.controls.speed
    }

    /// Set the simulated-time multiplier. Negative or non-finite values are ignored.
    pub fn set_speed(&mut self, speed: f32) {
        if !speed.is_finite() || speed < 0.0 {
            warn!(speed, "Ignoring invalid simulation speed");
            return;
        }
        self.controls.speed = speed;
    }

    /// Ask for a reset at the start of the next tick
    pub fn request_reset(&mut self) {
        self.controls.reset_pending = true;
    }

    /// Clear and reseed the population immediately, zeroing all counters
    pub fn reset_now(&mut self) {
        self.agents.clear();
        self.next_id = 0;
        self.tick = 0;
        self.sim_time = 0.0;
        self.selected = None;
        self.totals = RunTotals::default();
        self.controls.reset_pending = false;
        self.seed_population();

        if !self.observers.is_empty() {
            let stats = self.population_stats();
            for observer in &mut self.observers {
                observer.on_reset(&stats);
            }
        }
    }

    pub fn add_observer(&mut self, observer: Box<dyn SimulationObserver>) {
        self.observers.push(observer);
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Simulated seconds since the last reset
    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    pub fn totals(&self) -> RunTotals {
        self.totals
    }

    /// Read-only access to the live agent list, including dying agents
    pub fn population(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agents(&self) -> impl Iterator<Item = AgentSnapshot> + '_ {
        self.agents.iter().map(AgentSnapshot::from)
    }

    pub fn agent(&self, id: AgentId) -> Option<AgentSnapshot> {
        self.agents.iter().find(|a| a.id == id).map(AgentSnapshot::from)
    }

    /// Per-faction counts of non-dying agents
    pub fn faction_counts(&self) -> FactionCounts {
        self.agents.iter().filter(|a| !a.is_dying()).map(|a| a.faction).collect()
    }

    pub fn population_stats(&self) -> PopulationStats {
        PopulationStats::collect(&self.agents)
    }

    /// Select an agent for detail display. Returns false if it does not exist.
    pub fn select(&mut self, id: AgentId) -> bool {
        if self.agents.iter().any(|a| a.id == id) {
            self.selected = Some(id);
            true
        } else {
            false
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<AgentSnapshot> {
        self.selected.and_then(|id| self.agent(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{Effects, LeaderState, Lifecycle};
    use piageon_core::{LeaderType, LifecycleState, WorldConfig};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn test_config(agent_count: usize) -> SimConfig {
        SimConfig {
            world: WorldConfig {
                agent_count,
                world_half_size: 10.0,
                seed: Some(42),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[derive(Default)]
    struct Counts {
        ticks: u32,
        resets: u32,
    }

    struct Counter(Rc<RefCell<Counts>>);

    impl SimulationObserver for Counter {
        fn on_tick(&mut self, _report: &TickReport, _stats: &PopulationStats) {
            self.0.borrow_mut().ticks += 1;
        }

        fn on_reset(&mut self, _stats: &PopulationStats) {
            self.0.borrow_mut().resets += 1;
        }
    }

    #[test]
    fn test_seeding_is_balanced() {
        let sim = Simulation::new(test_config(60)).unwrap();
        let counts = sim.faction_counts();
        for faction in Faction::ALL {
            assert_eq!(counts[faction], 10);
        }
        for agent in sim.population() {
            assert!(agent.position.x.abs() <= 9.0);
            assert!(agent.position.z.abs() <= 9.0);
            assert_eq!(agent.position.y, 18.0);
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = test_config(10);
        config.world.interaction_radius = -1.0;
        assert!(Simulation::new(config).is_err());
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let mut a = Simulation::new(test_config(40)).unwrap();
        let mut b = Simulation::new(test_config(40)).unwrap();
        for _ in 0..120 {
            a.tick(1.0 / 30.0);
            b.tick(1.0 / 30.0);
        }
        let pa: Vec<_> = a.population().iter().map(|x| (x.id, x.position, x.faction)).collect();
        let pb: Vec<_> = b.population().iter().map(|x| (x.id, x.position, x.faction)).collect();
        assert_eq!(pa, pb);
    }

    #[test]
    fn test_pause_is_idempotent() {
        let mut sim = Simulation::new(test_config(30)).unwrap();
        sim.tick(1.0 / 60.0);
        sim.pause();

        let before: Vec<_> = sim
            .population()
            .iter()
            .map(|a| (a.position, a.age, a.stats.clone()))
            .collect();
        for _ in 0..25 {
            let report = sim.tick(1.0 / 60.0);
            assert!(report.skipped);
        }
        let after: Vec<_> = sim
            .population()
            .iter()
            .map(|a| (a.position, a.age, a.stats.clone()))
            .collect();
        assert_eq!(before, after);
        assert_eq!(sim.tick_count(), 1);

        sim.resume();
        assert!(!sim.tick(1.0 / 60.0).skipped);
        assert_eq!(sim.tick_count(), 2);
    }

    #[test]
    fn test_toggle_pause() {
        let mut sim = Simulation::new(test_config(10)).unwrap();
        assert!(!sim.is_paused());
        assert!(sim.toggle_pause());
        assert!(sim.is_paused());
        assert!(sim.tick(1.0 / 60.0).skipped);
        assert!(!sim.toggle_pause());
        assert!(!sim.tick(1.0 / 60.0).skipped);
    }

    #[test]
    fn test_population_is_conserved() {
        let mut config = test_config(50);
        config.world.world_half_size = 6.0;
        config.world.death_delay_secs = 0.2;
        let mut sim = Simulation::new(config).unwrap();

        let mut removed = 0;
        let mut respawned = 0;
        for _ in 0..600 {
            let report = sim.tick(1.0 / 30.0);
            assert_eq!(report.removed.len(), report.respawned.len());
            assert_eq!(sim.population().len(), 50);
            removed += report.removed.len();
            respawned += report.respawned.len();

            let stats = sim.population_stats();
            assert_eq!(stats.alive + stats.dying, 50);
        }
        assert_eq!(removed, respawned);
        assert_eq!(sim.totals().removals, removed as u64);
    }

    #[test]
    fn test_agents_stay_in_bounds_and_closed_factions() {
        let mut sim = Simulation::new(test_config(40)).unwrap();
        let limit = 10.0 - sim.config().interaction.boundary_margin;
        for _ in 0..300 {
            sim.tick(1.0 / 60.0);
            for agent in sim.population().iter().filter(|a| !a.is_dying()) {
                assert!(agent.position.x.abs() <= limit);
                assert!(agent.position.z.abs() <= limit);
                assert!(Faction::ALL.contains(&agent.faction));
                assert!(agent.genome.is_within_bounds());
            }
        }
    }

    #[test]
    fn test_triggers_clear_next_tick() {
        let mut sim = Simulation::new(test_config(10)).unwrap();
        sim.agents[0].triggers.attacked = true;
        sim.agents[1].triggers.converted = true;
        sim.pause();
        sim.tick(0.016);
        assert!(sim.agents[0].triggers.attacked);

        sim.resume();
        sim.agents.iter_mut().for_each(|a| a.faction = Faction::Neutral);
        sim.tick(0.016);
        assert!(sim.population().iter().all(|a| !a.triggers.attacked && !a.triggers.converted));
    }

    #[test]
    fn test_speed_scales_time() {
        let mut sim = Simulation::new(test_config(10)).unwrap();
        sim.set_speed(2.0);
        let report = sim.tick(0.1);
        assert!((report.dt - 0.2).abs() < 1e-6);

        sim.set_speed(-1.0);
        sim.set_speed(f32::NAN);
        assert_eq!(sim.speed(), 2.0);

        sim.set_speed(0.0);
        let ages: Vec<f32> = sim.population().iter().map(|a| a.age).collect();
        sim.tick(0.1);
        let after: Vec<f32> = sim.population().iter().map(|a| a.age).collect();
        assert_eq!(ages, after);
    }

    #[test]
    fn test_non_finite_dt_is_ignored() {
        let mut sim = Simulation::new(test_config(10)).unwrap();
        let report = sim.tick(f32::NAN);
        assert_eq!(report.dt, 0.0);
        assert!(sim.population().iter().all(|a| a.position.is_finite()));
    }

    #[test]
    fn test_reset_is_idempotent() {
        let seen = Rc::new(RefCell::new(Counts::default()));
        let mut sim = Simulation::new(test_config(20)).unwrap();
        sim.add_observer(Box::new(Counter(seen.clone())));
        for _ in 0..10 {
            sim.tick(1.0 / 60.0);
        }

        sim.request_reset();
        sim.request_reset();
        sim.request_reset();
        let report = sim.tick(1.0 / 60.0);

        assert!(report.reset);
        assert_eq!(seen.borrow().resets, 1);
        assert_eq!(seen.borrow().ticks, 11);
        assert_eq!(sim.tick_count(), 1);
        assert_eq!(sim.population().len(), 20);
        assert_eq!(sim.totals().respawns, report.respawned.len() as u64);

        assert!(!sim.tick(1.0 / 60.0).reset);
        assert_eq!(seen.borrow().resets, 1);
    }

    #[test]
    fn test_selection() {
        let mut sim = Simulation::new(test_config(10)).unwrap();
        let id = sim.population()[3].id;
        assert!(sim.select(id));
        assert_eq!(sim.selected().map(|s| s.id), Some(id));
        assert_eq!(sim.agent(id).map(|s| s.state), Some(LifecycleState::Alive));

        assert!(!sim.select(AgentId(9999)));
        assert_eq!(sim.selected().map(|s| s.id), Some(id));

        sim.clear_selection();
        assert!(sim.selected().is_none());
    }

    #[test]
    fn test_removed_selection_is_cleared() {
        let mut config = test_config(10);
        config.world.death_delay_secs = 0.05;
        let mut sim = Simulation::new(config).unwrap();
        let id = sim.population()[0].id;
        sim.select(id);
        sim.agents[0].mark_dying();

        for _ in 0..5 {
            sim.tick(1.0 / 30.0);
        }
        assert!(sim.agent(id).is_none());
        assert!(sim.selected().is_none());
    }

    #[test]
    fn test_death_timer_starts_the_tick_after_death() {
        let mut config = test_config(3);
        config.world.death_delay_secs = 0.05;
        let mut sim = Simulation::new(config).unwrap();
        let id = sim.agents[0].id;
        sim.agents[0].mark_dying();

        assert!(sim.remove_expired(1.0).is_empty());
        assert_eq!(sim.agents[0].lifecycle, Lifecycle::Dying { timer: 0.0 });

        sim.agents[0].triggers = Default::default();
        assert_eq!(sim.remove_expired(1.0), vec![id]);
    }

    #[test]
    fn test_killed_agent_outlives_the_killing_tick() {
        let mut config = test_config(3);
        config.world.death_delay_secs = 0.05;
        let mut sim = Simulation::new(config).unwrap();
        let layout = [(Faction::Democrat, 0.0), (Faction::Democrat, 0.5), (Faction::Fascist, 1.0)];
        for (agent, (faction, x)) in sim.agents.iter_mut().zip(layout) {
            agent.faction = faction;
            agent.position = Vec3::new(x, 18.0, 0.0);
        }
        let victim = sim.agents[2].id;

        let report = sim.tick(0.06);
        assert_eq!(report.killed, vec![victim]);
        assert!(report.removed.is_empty());

        let report = sim.tick(0.06);
        assert_eq!(report.removed, vec![victim]);
    }

    #[test]
    fn test_prophet_self_destruct_is_not_a_kill() {
        let mut config = test_config(1);
        config.leaders.prophet_self_destruct_rate = 1000.0;
        let mut sim = Simulation::new(config).unwrap();
        let id = sim.agents[0].id;
        sim.agents[0].faction = Faction::Anarchist;
        sim.agents[0].leader = LeaderState::Promoted {
            kind: LeaderType::Prophet,
            passive: Effects::ZERO,
            base_genome: sim.agents[0].genome,
            doomed: false,
        };

        let report = sim.tick(0.1);
        assert_eq!(report.self_destructed, vec![id]);
        assert!(report.killed.is_empty());
        assert!(report.removed.is_empty());
        assert_eq!(sim.totals().kills, 0);
        assert_eq!(sim.totals().self_destructs, 1);
    }

    #[test]
    fn test_child_from_empty_pool_is_neutral() {
        let mut sim = Simulation::new(test_config(3)).unwrap();
        for agent in &mut sim.agents {
            agent.mark_dying();
        }
        let id = sim.spawn_child();
        let child = sim.agent(id).unwrap();
        assert_eq!(child.faction, Faction::Neutral);
        assert!(child.genome.is_within_bounds());
    }

    #[test]
    fn test_child_inherits_fitter_faction() {
        let mut sim = Simulation::new(test_config(2)).unwrap();
        sim.agents[0].faction = Faction::Democrat;
        sim.agents[1].faction = Faction::Democrat;
        let id = sim.spawn_child();
        assert_eq!(sim.agent(id).unwrap().faction, Faction::Democrat);

        let child = sim.population().last().unwrap();
        let radius = sim.config().world.world_half_size - 1.0;
        assert!(Vec3::new(child.position.x, 0.0, child.position.z).length() <= radius + 1e-4);
    }

    #[test]
    fn test_roulette_prefers_fit_agents() {
        let mut sim = Simulation::new(test_config(2)).unwrap();
        sim.agents[0].stats.time_alive = 1000.0;
        let picks = (0..500).filter(|_| sim.pick_parent() == Some(0)).count();
        assert!(picks > 450, "picks = {}", picks);
    }
}
