// Synthetic dataset generation: k latent lines, n points each, Gaussian
// noise, then the group labels are deliberately scrambled so the simulation
// starts from an uninformed partition.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rng::Lcg;

/// x-values are spread evenly over this fixed domain.
pub const X_DOMAIN: (f64, f64) = (20.0, 60.0);

/// Upper bound UI collaborators clamp to; the engine itself accepts any
/// cluster count in 1..=MAX_CLUSTERS.
pub const MAX_CLUSTERS: usize = 7;

/// One observation. `group` is the current partition label, mutated only by
/// reassignment and discarded wholesale on regeneration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub x: f64,
    pub y: f64,
    pub group: usize,
}

/// Everything `generate` needs. Identical params (seed included) produce a
/// bit-identical dataset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenParams {
    pub clusters: usize,
    pub points_per_cluster: usize,
    pub noise: f64,
    pub slope_range: (f64, f64),
    pub intercept_range: (f64, f64),
    pub seed: u64,
}

impl Default for GenParams {
    fn default() -> Self {
        GenParams {
            clusters: 3,
            points_per_cluster: 20,
            noise: 2.0,
            slope_range: (0.3, 1.5),
            intercept_range: (10.0, 40.0),
            seed: 42,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum ParamError {
    #[error("cluster count {0} outside supported range 1..={MAX_CLUSTERS}")]
    ClusterCount(usize),
    #[error("points per cluster must be at least 1")]
    NoPoints,
    #[error("noise scale must be non-negative, got {0}")]
    NegativeNoise(f64),
    #[error("empty range: lo {0} exceeds hi {1}")]
    EmptyRange(f64, f64),
}

impl GenParams {
    /// Rejects unusable configurations before any generation happens.
    pub fn validate(&self) -> Result<(), ParamError> {
        if self.clusters == 0 || self.clusters > MAX_CLUSTERS {
            return Err(ParamError::ClusterCount(self.clusters));
        }
        if self.points_per_cluster == 0 {
            return Err(ParamError::NoPoints);
        }
        if self.noise < 0.0 {
            return Err(ParamError::NegativeNoise(self.noise));
        }
        for &(lo, hi) in [&self.slope_range, &self.intercept_range] {
            if lo > hi {
                return Err(ParamError::EmptyRange(lo, hi));
            }
        }
        Ok(())
    }
}

/// Generates `clusters * points_per_cluster` samples as a pure function of
/// the params. Each group gets a random slope/intercept inside the configured
/// ranges and evenly spaced x-values; y picks up `noise` times a Gaussian draw.
///
/// Labels are randomized at creation, the samples are shuffled, and the
/// labels are randomized again after the shuffle. The double scramble looks
/// redundant but is contractual: it fixes the statistical shape of the
/// starting partition, and every draw comes from the one seeded stream.
pub fn generate(params: &GenParams) -> Vec<Sample> {
    let mut rng = Lcg::new(params.seed);
    let k = params.clusters;
    let n = params.points_per_cluster;

    let (x_lo, x_hi) = X_DOMAIN;
    // A single-point group sits at the domain start rather than dividing by zero.
    let spacing = if n > 1 { (x_hi - x_lo) / (n - 1) as f64 } else { 0.0 };

    let mut samples = Vec::with_capacity(k * n);
    for _ in 0..k {
        let slope = rng.in_range(params.slope_range.0, params.slope_range.1);
        let intercept = rng.in_range(params.intercept_range.0, params.intercept_range.1);

        for i in 0..n {
            let x = x_lo + spacing * i as f64;
            let y = slope * x + intercept + params.noise * rng.gaussian();
            samples.push(Sample { x, y, group: rng.index(k) });
        }
    }

    rng.shuffle(&mut samples);
    for sample in &mut samples {
        sample.group = rng.index(k);
    }

    samples
}
