//! Flocking and faction-conflict simulation engine.
//!
//! Agents flock on a bounded ground plane, convert or kill one another
//! according to faction rules, get promoted to leaders, and are replaced by
//! fitness-selected offspring when they die.

pub mod agent;
pub mod clustering;
pub mod flocking;
pub mod headless;
pub mod interaction;
pub mod leader;
pub mod locomotion;
pub mod observer;
pub mod population;
pub mod snapshot;

pub use agent::{Agent, AgentSnapshot, Effects, LeaderState, Lifecycle, Triggers};
pub use clustering::{Cluster, ClusterParams};
pub use flocking::{steer_toward, FlockingEngine};
pub use headless::{HeadlessRun, RunSummary};
pub use interaction::{Action, InteractionOutcome, InteractionResolver};
pub use leader::LeaderSystem;
pub use locomotion::Locomotion;
pub use observer::{MetricsObserver, SimulationObserver};
pub use population::Simulation;
pub use snapshot::{PopulationStats, RunTotals, TickReport};
