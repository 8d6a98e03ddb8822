//! Local-composition classification and per-cluster flocking parameters.

use crate::agent::{living_views, Agent, AgentView};
use piageon_core::planar_distance;
use serde::{Deserialize, Serialize};

const ALLY_HEAVY_RATIO: f32 = 0.6;
const MIXED_RATIO: f32 = 0.35;

/// How friendly an agent's surroundings are
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cluster {
    AllyHeavy,
    #[default]
    Mixed,
    Hostile,
}

/// Flocking weights selected by cluster
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterParams {
    pub max_speed: f32,
    pub separation: f32,
    pub alignment: f32,
    pub cohesion: f32,
    pub ally_pull: f32,
}

impl Cluster {
    pub fn from_friend_ratio(ratio: f32) -> Self {
        if ratio >= ALLY_HEAVY_RATIO {
            Cluster::AllyHeavy
        } else if ratio >= MIXED_RATIO {
            Cluster::Mixed
        } else {
            Cluster::Hostile
        }
    }

    /// Tight slow flocks among friends, loose fast scatter among enemies
    pub fn params(self) -> ClusterParams {
        match self {
            Cluster::AllyHeavy => ClusterParams {
                max_speed: 1.4,
                separation: 1.0,
                alignment: 1.1,
                cohesion: 1.2,
                ally_pull: 1.1,
            },
            Cluster::Mixed => ClusterParams {
                max_speed: 1.6,
                separation: 1.3,
                alignment: 1.0,
                cohesion: 0.9,
                ally_pull: 0.9,
            },
            Cluster::Hostile => ClusterParams {
                max_speed: 2.0,
                separation: 1.8,
                alignment: 0.9,
                cohesion: 0.6,
                ally_pull: 0.4,
            },
        }
    }
}

/// Fraction of friendly agents within `perception`, counting the agent itself.
///
/// An agent alone reads as fully friendly.
pub fn friend_ratio(agent: &Agent, index: usize, views: &[AgentView], perception: f32) -> f32 {
    let mut friends = 1u32;
    let mut total = 1u32;
    for other in views.iter().filter(|v| v.index != index) {
        if planar_distance(agent.position, other.position) < perception {
            total += 1;
            if other.faction == agent.faction {
                friends += 1;
            }
        }
    }
    friends as f32 / total as f32
}

/// Reclassify every non-dying agent against a snapshot of its neighbors
pub fn assign_clusters(agents: &mut [Agent]) {
    let views = living_views(agents);
    for view in &views {
        let agent = &agents[view.index];
        let ratio = friend_ratio(agent, view.index, &views, agent.genome.perception());
        agents[view.index].cluster = Cluster::from_friend_ratio(ratio);
    }
}
