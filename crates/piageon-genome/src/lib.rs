//! Evolvable behavioral genomes for agents.
//!
//! A genome is a fixed-length vector of real-valued genes, each confined to
//! its own `[min, max]` range. Every operator here returns a genome that
//! satisfies those bounds:
//! - random generation draws uniformly inside each range
//! - crossover picks each gene from either parent
//! - mutation adds span-relative noise and clamps

pub mod genome;
pub mod mutation;

pub use genome::{Gene, Genome, GENE_COUNT};
pub use mutation::Mutator;
