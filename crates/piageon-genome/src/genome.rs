//! Genome structure and gene bounds.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const GENE_COUNT: usize = 6;

const MIN_GENES: [f32; GENE_COUNT] = [0.4, 0.15, 0.15, 0.6, 0.6, 0.03];
const MAX_GENES: [f32; GENE_COUNT] = [2.0, 1.6, 1.6, 1.6, 1.4, 0.1];

/// One evolvable behavioral parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gene {
    SeparationWeight,
    AlignmentWeight,
    CohesionWeight,
    Perception,
    MaxSpeed,
    MaxForce,
}

impl Gene {
    pub const ALL: [Gene; GENE_COUNT] = [
        Gene::SeparationWeight,
        Gene::AlignmentWeight,
        Gene::CohesionWeight,
        Gene::Perception,
        Gene::MaxSpeed,
        Gene::MaxForce,
    ];

    pub fn index(self) -> usize {
        match self {
            Gene::SeparationWeight => 0,
            Gene::AlignmentWeight => 1,
            Gene::CohesionWeight => 2,
            Gene::Perception => 3,
            Gene::MaxSpeed => 4,
            Gene::MaxForce => 5,
        }
    }

    pub fn min(self) -> f32 {
        MIN_GENES[self.index()]
    }

    pub fn max(self) -> f32 {
        MAX_GENES[self.index()]
    }

    pub fn span(self) -> f32 {
        self.max() - self.min()
    }

    /// Clamp a value into this gene's range. Non-finite values collapse to the minimum.
    pub fn clamp(self, value: f32) -> f32 {
        if value.is_finite() {
            value.clamp(self.min(), self.max())
        } else {
            self.min()
        }
    }
}

/// A complete behavioral genome
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Genome {
    genes: [f32; GENE_COUNT],
}

impl Genome {
    /// Draw every gene uniformly within its bounds
    pub fn random(rng: &mut ChaCha8Rng) -> Self {
        let mut genes = [0.0; GENE_COUNT];
        for gene in Gene::ALL {
            genes[gene.index()] = gene.min() + rng.gen::<f32>() * gene.span();
        }
        Self::from_values(genes)
    }

    /// Build a genome from raw values, clamping each into range
    pub fn from_values(values: [f32; GENE_COUNT]) -> Self {
        let mut genes = [0.0; GENE_COUNT];
        for gene in Gene::ALL {
            genes[gene.index()] = gene.clamp(values[gene.index()]);
        }
        Self { genes }
    }

    /// Genome with every gene at the midpoint of its range
    pub fn midpoint() -> Self {
        let mut genes = [0.0; GENE_COUNT];
        for gene in Gene::ALL {
            genes[gene.index()] = gene.min() + gene.span() * 0.5;
        }
        Self { genes }
    }

    pub fn get(&self, gene: Gene) -> f32 {
        self.genes[gene.index()]
    }

    pub fn set(&mut self, gene: Gene, value: f32) {
        self.genes[gene.index()] = gene.clamp(value);
    }

    /// Multiply one gene by `factor` and clamp
    pub fn scale(&mut self, gene: Gene, factor: f32) {
        self.set(gene, self.get(gene) * factor);
    }

    pub fn separation_weight(&self) -> f32 {
        self.get(Gene::SeparationWeight)
    }

    pub fn alignment_weight(&self) -> f32 {
        self.get(Gene::AlignmentWeight)
    }

    pub fn cohesion_weight(&self) -> f32 {
        self.get(Gene::CohesionWeight)
    }

    pub fn perception(&self) -> f32 {
        self.get(Gene::Perception)
    }

    pub fn max_speed(&self) -> f32 {
        self.get(Gene::MaxSpeed)
    }

    pub fn max_force(&self) -> f32 {
        self.get(Gene::MaxForce)
    }

    pub fn is_within_bounds(&self) -> bool {
        Gene::ALL.iter().all(|&gene| {
            let value = self.get(gene);
            value >= gene.min() && value <= gene.max()
        })
    }
}

impl Default for Genome {
    fn default() -> Self {
        Self::midpoint()
    }
}

impl fmt::Display for Genome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sep={:.2} ali={:.2} coh={:.2} per={:.2} spd={:.2} frc={:.3}",
            self.separation_weight(),
            self.alignment_weight(),
            self.cohesion_weight(),
            self.perception(),
            self.max_speed(),
            self.max_force()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;

    #[test]
    fn test_random_genome_in_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..100 {
            assert!(Genome::random(&mut rng).is_within_bounds());
        }
    }

    #[test]
    fn test_from_values_clamps() {
        let genome = Genome::from_values([10.0, -1.0, 0.5, 1.0, 99.0, 0.0]);
        assert_eq!(genome.separation_weight(), 2.0);
        assert_eq!(genome.alignment_weight(), 0.15);
        assert_eq!(genome.cohesion_weight(), 0.5);
        assert_eq!(genome.max_speed(), 1.4);
        assert_eq!(genome.max_force(), 0.03);
    }

    #[test]
    fn test_non_finite_collapses_to_min() {
        let genome = Genome::from_values([f32::NAN, f32::INFINITY, 0.5, 1.0, 1.0, 0.05]);
        assert_eq!(genome.separation_weight(), Gene::SeparationWeight.min());
        assert_eq!(genome.alignment_weight(), Gene::AlignmentWeight.min());
        assert!(genome.is_within_bounds());
    }

    #[test]
    fn test_scale_respects_bounds() {
        let mut genome = Genome::midpoint();
        genome.scale(Gene::MaxForce, 100.0);
        assert_eq!(genome.max_force(), Gene::MaxForce.max());
        genome.scale(Gene::Perception, 0.0);
        assert_eq!(genome.perception(), Gene::Perception.min());
    }

    proptest! {
        #[test]
        fn prop_from_values_always_in_bounds(values in prop::array::uniform6(any::<f32>())) {
            prop_assert!(Genome::from_values(values).is_within_bounds());
        }

        #[test]
        fn prop_set_always_in_bounds(index in 0usize..GENE_COUNT, value in -1.0e6f32..1.0e6) {
            let mut genome = Genome::midpoint();
            genome.set(Gene::ALL[index], value);
            prop_assert!(genome.is_within_bounds());
        }
    }
}
