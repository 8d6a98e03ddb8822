//! Core type definitions for the simulation.

use glam::Vec3;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};
use uuid::Uuid;

/// Unique identifier for an agent. Assigned monotonically by the population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub u64);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Unique identifier for a headless run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Political faction of an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Faction {
    Communist,
    Democrat,
    Fascist,
    Monarchist,
    Anarchist,
    Neutral,
}

impl Faction {
    pub const COUNT: usize = 6;

    pub const ALL: [Faction; Faction::COUNT] = [
        Faction::Communist,
        Faction::Democrat,
        Faction::Fascist,
        Faction::Monarchist,
        Faction::Anarchist,
        Faction::Neutral,
    ];

    pub fn index(self) -> usize {
        match self {
            Faction::Communist => 0,
            Faction::Democrat => 1,
            Faction::Fascist => 2,
            Faction::Monarchist => 3,
            Faction::Anarchist => 4,
            Faction::Neutral => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Faction::Communist => "communist",
            Faction::Democrat => "democrat",
            Faction::Fascist => "fascist",
            Faction::Monarchist => "monarchist",
            Faction::Anarchist => "anarchist",
            Faction::Neutral => "neutral",
        }
    }

    /// Display color used by renderers
    pub fn color(self) -> &'static str {
        match self {
            Faction::Communist => "#F24822",
            Faction::Democrat => "#3DADFF",
            Faction::Fascist => "#1E1E1E",
            Faction::Monarchist => "#FFC943",
            Faction::Anarchist => "#874FFF",
            Faction::Neutral => "#cccccc",
        }
    }

    /// All factions in a random order
    pub fn shuffled(rng: &mut ChaCha8Rng) -> [Faction; Faction::COUNT] {
        let mut order = Self::ALL;
        order.shuffle(rng);
        order
    }
}

impl fmt::Display for Faction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Leader role an agent can be promoted into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderType {
    Commissar,
    President,
    King,
    Dictator,
    Prophet,
    Elder,
}

impl LeaderType {
    /// The leader role each faction can produce
    pub fn for_faction(faction: Faction) -> Self {
        match faction {
            Faction::Communist => LeaderType::Commissar,
            Faction::Democrat => LeaderType::President,
            Faction::Monarchist => LeaderType::King,
            Faction::Fascist => LeaderType::Dictator,
            Faction::Anarchist => LeaderType::Prophet,
            Faction::Neutral => LeaderType::Elder,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LeaderType::Commissar => "commissar",
            LeaderType::President => "president",
            LeaderType::King => "king",
            LeaderType::Dictator => "dictator",
            LeaderType::Prophet => "prophet",
            LeaderType::Elder => "elder",
        }
    }
}

impl fmt::Display for LeaderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse lifecycle state exposed to renderers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Alive,
    Dying,
}

/// Locomotion mode used to desynchronize movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionMode {
    Idle,
    Walk,
    Turn,
}

/// Per-faction tally
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactionCounts([u32; Faction::COUNT]);

impl FactionCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, faction: Faction) {
        self.0[faction.index()] += 1;
    }

    pub fn get(&self, faction: Faction) -> u32 {
        self.0[faction.index()]
    }

    pub fn total(&self) -> u32 {
        self.0.iter().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Faction, u32)> + '_ {
        Faction::ALL.into_iter().map(move |faction| (faction, self.get(faction)))
    }
}

impl Index<Faction> for FactionCounts {
    type Output = u32;

    fn index(&self, faction: Faction) -> &u32 {
        &self.0[faction.index()]
    }
}

impl IndexMut<Faction> for FactionCounts {
    fn index_mut(&mut self, faction: Faction) -> &mut u32 {
        &mut self.0[faction.index()]
    }
}

impl FromIterator<Faction> for FactionCounts {
    fn from_iter<I: IntoIterator<Item = Faction>>(iter: I) -> Self {
        let mut counts = Self::new();
        for faction in iter {
            counts.add(faction);
        }
        counts
    }
}

/// Squared distance on the ground plane (x/z), ignoring height
pub fn planar_distance_sq(a: Vec3, b: Vec3) -> f32 {
    let dx = a.x - b.x;
    let dz = a.z - b.z;
    dx * dx + dz * dz
}

pub fn planar_distance(a: Vec3, b: Vec3) -> f32 {
    planar_distance_sq(a, b).sqrt()
}
