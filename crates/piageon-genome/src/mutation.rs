//! Genetic operators for genomes.

use crate::genome::{Gene, Genome, GENE_COUNT};
use piageon_core::GeneticsConfig;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

pub struct Mutator {
    config: GeneticsConfig,
}

impl Mutator {
    pub fn new(config: GeneticsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GeneticsConfig {
        &self.config
    }

    /// Uniform crossover: each gene comes from either parent with equal odds
    pub fn crossover(&self, parent1: &Genome, parent2: &Genome, rng: &mut ChaCha8Rng) -> Genome {
        let mut values = [0.0; GENE_COUNT];
        for gene in Gene::ALL {
            values[gene.index()] = if rng.gen::<bool>() {
                parent1.get(gene)
            } else {
                parent2.get(gene)
            };
        }
        Genome::from_values(values)
    }

    /// Return a mutated copy of `genome`.
    ///
    /// Each gene mutates independently with probability `mutation_rate`, by a
    /// uniform delta in `[-strength, +strength] * span`.
    pub fn mutate(&self, genome: &Genome, rng: &mut ChaCha8Rng) -> Genome {
        let mut mutated = *genome;
        for gene in Gene::ALL {
            if rng.gen::<f32>() < self.config.mutation_rate {
                let delta = rng.gen_range(-1.0f32..=1.0) * gene.span() * self.config.mutation_strength;
                mutated.set(gene, genome.get(gene) + delta);
            }
        }
        mutated
    }

    /// Genome for a child of one or two parents
    pub fn child(&self, parent1: &Genome, parent2: Option<&Genome>, rng: &mut ChaCha8Rng) -> Genome {
        let base = match parent2 {
            Some(parent2) => self.crossover(parent1, parent2, rng),
            None => *parent1,
        };
        self.mutate(&base, rng)
    }

    /// Multiply every gene of `base` by an independent factor in
    /// `[1 - prophet_jitter, 1 + prophet_jitter]`
    pub fn jitter(&self, base: &Genome, rng: &mut ChaCha8Rng) -> Genome {
        let amount = self.config.prophet_jitter;
        let mut jittered = *base;
        for gene in Gene::ALL {
            let factor = 1.0 + rng.gen_range(-1.0f32..=1.0) * amount;
            jittered.scale(gene, factor);
        }
        jittered
    }
}

impl Default for Mutator {
    fn default() -> Self {
        Self::new(GeneticsConfig::default())
    }
}
