//! Core types and utilities for the Piageon flocking and faction simulation.

pub mod types;
pub mod config;
pub mod error;
pub mod fitness;

pub use error::{Error, Result};
pub use types::*;
pub use config::*;
pub use fitness::*;

pub use glam::Vec3;
