// Per-group affine model y = slope * x + intercept, fitted by closed-form
// ordinary least squares, plus the error metric that drives reassignment.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::Sample;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fit {
    pub slope: f64,
    pub intercept: f64,
}

/// Which residual exponent drives reassignment: p = 1 is robust to outliers,
/// p = 2 punishes large deviations and is smooth near zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Norm {
    Absolute,
    Squared,
}

impl Norm {
    pub fn exponent(self) -> u32 {
        match self {
            Norm::Absolute => 1,
            Norm::Squared => 2,
        }
    }
}

/// All x-values in a group were identical, so the least-squares slope is
/// undefined. Surfaced to the caller instead of poisoning later iterations
/// with NaN fits.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
#[error("all {count} samples share x = {x}; least-squares slope is undefined")]
pub struct DegenerateFit {
    pub x: f64,
    pub count: usize,
}

impl Fit {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    /// |y - prediction|^p for the sample.
    pub fn error(&self, sample: &Sample, norm: Norm) -> f64 {
        let residual = (sample.y - self.predict(sample.x)).abs();
        match norm {
            Norm::Absolute => residual,
            Norm::Squared => residual * residual,
        }
    }
}

/// Fits a line to the samples. Degenerate small sets have a defined policy
/// rather than being errors: an empty set fits (0, 0), a single sample fits
/// a horizontal line through its y.
pub fn fit_line(samples: &[Sample]) -> Result<Fit, DegenerateFit> {
    match samples {
        [] => Ok(Fit { slope: 0.0, intercept: 0.0 }),
        [only] => Ok(Fit { slope: 0.0, intercept: only.y }),
        _ => {
            let n = samples.len() as f64;
            let sum_x: f64 = samples.iter().map(|s| s.x).sum();
            let sum_y: f64 = samples.iter().map(|s| s.y).sum();
            let sum_xy: f64 = samples.iter().map(|s| s.x * s.y).sum();
            let sum_x2: f64 = samples.iter().map(|s| s.x * s.x).sum();

            let denom = n * sum_x2 - sum_x * sum_x;
            if samples.iter().all(|s| s.x == samples[0].x) || denom == 0.0 {
                return Err(DegenerateFit { x: samples[0].x, count: samples.len() });
            }

            let slope = (n * sum_xy - sum_x * sum_y) / denom;
            let intercept = (sum_y - slope * sum_x) / n;
            Ok(Fit { slope, intercept })
        }
    }
}
