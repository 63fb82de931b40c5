//! The Coding Theorem estimator: `K̂(s) = -log2 D(n,2)(s)` over a saved
//! distribution. Strings the sampled class never produced get `+inf`.

use crate::aggregate::DistributionFile;
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub struct ComplexityEstimator {
    k: BTreeMap<String, f64>,
}

impl ComplexityEstimator {
    pub fn new(distribution: &BTreeMap<String, f64>) -> ComplexityEstimator {
        let k = distribution
            .iter()
            .filter(|(_, p)| **p > 0.0)
            .map(|(s, p)| (s.clone(), -p.log2()))
            .collect();
        ComplexityEstimator { k }
    }

    /// Load from a distribution file; raw counts are normalized on the fly.
    pub fn from_file(path: &Path) -> Result<ComplexityEstimator> {
        let file: DistributionFile = serde_json::from_slice(&fs::read(path)?)?;
        match (file.distribution, file.raw_counts) {
            (Some(distribution), _) => Ok(ComplexityEstimator::new(&distribution)),
            (None, Some(counts)) => {
                let total: u64 = counts.values().sum();
                if total == 0 {
                    return Err(Error::EmptyDistribution);
                }
                let distribution = counts
                    .iter()
                    .map(|(s, c)| (s.clone(), *c as f64 / total as f64))
                    .collect();
                Ok(ComplexityEstimator::new(&distribution))
            }
            (None, None) => Err(Error::EmptyDistribution),
        }
    }

    /// The complexity estimate for `s`, in bits.
    pub fn estimate(&self, s: &str) -> f64 {
        self.k.get(s).copied().unwrap_or(f64::INFINITY)
    }

    /// Strings ranked by ascending complexity.
    pub fn ranked(&self) -> Vec<(&str, f64)> {
        let mut ranked: Vec<(&str, f64)> = self.k.iter().map(|(s, k)| (s.as_str(), *k)).collect();
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        ranked
    }
}
