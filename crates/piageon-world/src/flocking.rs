//! Boids steering and motion integration on the ground plane.

use crate::agent::{living_views, Agent, AgentView};
use crate::clustering::ClusterParams;
use crate::locomotion::random_flat;
use glam::Vec3;
use piageon_core::{planar_distance, FlockingConfig, MotionMode, WorldConfig};
use rand_chacha::ChaCha8Rng;

/// Reynolds seek: steer current `velocity` toward `desired` at full speed.
///
/// Returns zero for a zero `desired`.
pub fn steer_toward(desired: Vec3, velocity: Vec3, max_speed: f32, max_force: f32) -> Vec3 {
    if desired.length_squared() == 0.0 {
        return Vec3::ZERO;
    }
    let desired = desired.normalize() * max_speed;
    (desired - velocity).clamp_length_max(max_force)
}

fn flatten(mut v: Vec3) -> Vec3 {
    v.y = 0.0;
    v
}

pub struct FlockingEngine {
    config: FlockingConfig,
}

impl FlockingEngine {
    pub fn new(config: FlockingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FlockingConfig {
        &self.config
    }

    /// Advance locomotion, steer and integrate every non-dying agent.
    ///
    /// Neighbor positions and velocities come from a snapshot taken before
    /// any agent moves.
    pub fn update(&self, agents: &mut [Agent], dt: f32, world: &WorldConfig, rng: &mut ChaCha8Rng) {
        let views = living_views(agents);
        for view in &views {
            let agent = &mut agents[view.index];
            let mode = agent.motion.advance(dt, rng);
            let params = agent.cluster.params();

            if mode == MotionMode::Idle {
                agent.velocity *= self.config.idle_damping;
                agent.velocity = agent.velocity.clamp_length_max(params.max_speed * self.config.idle_speed_fraction);
                agent.position += agent.velocity * dt;
                agent.position.y = world.ground_y;
                agent.acceleration = Vec3::ZERO;
                continue;
            }

            let steering = self.steering(agent, view.index, &views, &params, world.world_half_size, rng);
            agent.acceleration += steering;
            agent.record_energy(steering.length_squared() * dt);

            let fraction = if mode == MotionMode::Turn {
                self.config.turn_speed_fraction
            } else {
                self.config.walk_speed_fraction
            };
            agent.velocity = flatten(agent.velocity + agent.acceleration * dt);
            agent.velocity = agent.velocity.clamp_length_max(params.max_speed * fraction);
            agent.position += agent.velocity * dt;
            agent.position.y = world.ground_y;
            agent.acceleration = Vec3::ZERO;
        }
    }

    /// Total steering force for one agent, flattened and capped at three
    /// times its force limit
    pub fn steering(
        &self,
        agent: &Agent,
        index: usize,
        views: &[AgentView],
        params: &ClusterParams,
        half_size: f32,
        rng: &mut ChaCha8Rng,
    ) -> Vec3 {
        let genome = &agent.genome;
        let perception = genome.perception().min(self.config.perception_ceiling);
        let max_force = genome.max_force();
        let max_speed = params.max_speed.min(genome.max_speed());

        let mut separation = Vec3::ZERO;
        let mut alignment = Vec3::ZERO;
        let mut cohesion = Vec3::ZERO;
        let mut ally_center = Vec3::ZERO;
        let mut neighbors = 0u32;
        let mut allies = 0u32;

        for other in views.iter().filter(|v| v.index != index) {
            let dist = planar_distance(agent.position, other.position);
            if dist <= 0.0 || dist >= perception {
                continue;
            }
            neighbors += 1;
            let weight = if dist < self.config.personal_space {
                self.config.personal_space_weight
            } else {
                1.0
            };
            separation += flatten(agent.position - other.position) / (dist * dist) * weight;
            alignment += other.velocity;
            cohesion += other.position;
            if other.faction == agent.faction {
                allies += 1;
                ally_center += other.position;
            }
        }

        let mut steering = Vec3::ZERO;

        if neighbors > 0 {
            let n = neighbors as f32;
            let align = steer_toward(flatten(alignment / n), agent.velocity, max_speed, max_force);
            let cohere = steer_toward(flatten(cohesion / n - agent.position), agent.velocity, max_speed, max_force);
            let separate = steer_toward(flatten(separation), agent.velocity, max_speed, max_force);

            steering += align * params.alignment * genome.alignment_weight();
            steering += cohere * params.cohesion * genome.cohesion_weight();
            steering += separate * params.separation * genome.separation_weight();
        }

        if allies > 0 && params.ally_pull > 0.0 {
            let toward_allies = flatten(ally_center / allies as f32 - agent.position);
            steering += steer_toward(toward_allies, agent.velocity, max_speed, max_force) * params.ally_pull;
        }

        steering += self.containment(agent, half_size, max_speed, max_force);
        steering += random_flat(rng) * (max_force * self.config.wander_strength);

        if agent.motion.mode == MotionMode::Turn {
            let desired = agent.motion.heading.normalize_or_zero() * (max_speed * 0.4);
            steering += steer_toward(desired, agent.velocity, max_speed, max_force) * self.config.turn_heading_weight;
        }

        flatten(steering.clamp_length_max(max_force * 3.0))
    }

    /// Pull back toward the origin near the edge of the disc.
    ///
    /// Starts at `boundary_start_fraction` of the margin radius and reaches
    /// full strength at the margin.
    pub fn containment(&self, agent: &Agent, half_size: f32, max_speed: f32, max_force: f32) -> Vec3 {
        let margin = half_size - self.config.boundary_cushion;
        let start = margin * self.config.boundary_start_fraction;
        let dist = Vec3::new(agent.position.x, 0.0, agent.position.z).length();
        if dist <= start || margin <= 0.0 {
            return Vec3::ZERO;
        }
        let factor = if dist > margin {
            1.0
        } else {
            (dist - start) / (margin - start)
        };
        let inward = Vec3::new(-agent.position.x, 0.0, -agent.position.z);
        steer_toward(inward, agent.velocity, max_speed, max_force) * factor
    }
}

impl Default for FlockingEngine {
    fn default() -> Self {
        Self::new(FlockingConfig::default())
    }
}
