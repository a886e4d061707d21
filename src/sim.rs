// The iterative partition-fit loop: fit one line per group, reassign every
// sample to the line that explains it best, repeat until no label moves.
// Each step returns a new Simulation value instead of mutating in place,
// which keeps replay and testing trivial and makes "error leaves prior state
// untouched" automatic.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::data::{GenParams, ParamError, Sample, generate};
use crate::fit::{DegenerateFit, Fit, Norm, fit_line};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Phase {
    /// Freshly generated: iteration 0, no fits yet.
    Idle,
    /// At least one step taken, labels still moving.
    Running,
    /// A full reassignment pass changed nothing. Terminal; further steps
    /// are no-ops.
    Converged,
}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum StepError {
    #[error("group {group}: {source}")]
    DegenerateFit { group: usize, source: DegenerateFit },
}

/// Relabels every sample to the fit with the smallest error, scanning fits in
/// index order so ties go to the lowest index. Pure; inputs are not mutated.
pub fn reassign(samples: &[Sample], fits: &[Fit], norm: Norm) -> Vec<Sample> {
    samples
        .iter()
        .map(|sample| {
            let mut best_group = 0;
            let mut best_error = f64::INFINITY;
            for (group, fit) in fits.iter().enumerate() {
                let error = fit.error(sample, norm);
                if error < best_error {
                    best_error = error;
                    best_group = group;
                }
            }
            Sample { group: best_group, ..*sample }
        })
        .collect()
}

#[derive(Clone, Debug, Serialize)]
pub struct Simulation {
    params: GenParams,
    norm: Norm,
    samples: Vec<Sample>,
    fits: Vec<Fit>,
    iteration: u32,
    phase: Phase,
}

impl Simulation {
    /// Validates the params, generates a fresh dataset and starts Idle.
    pub fn new(params: GenParams, norm: Norm) -> Result<Self, ParamError> {
        params.validate()?;
        let samples = generate(&params);
        info!(
            clusters = params.clusters,
            samples = samples.len(),
            seed = params.seed,
            "simulation reset"
        );
        Ok(Simulation {
            params,
            norm,
            samples,
            fits: Vec::new(),
            iteration: 0,
            phase: Phase::Idle,
        })
    }

    /// One fit-then-reassign pass. Returns the successor state; `self` is
    /// never modified, so a degenerate fit leaves the caller's state intact.
    pub fn step(&self) -> Result<Simulation, StepError> {
        if self.phase == Phase::Converged {
            debug!(iteration = self.iteration, "step ignored: already converged");
            return Ok(self.clone());
        }

        let mut fits = Vec::with_capacity(self.params.clusters);
        for group in 0..self.params.clusters {
            let members: Vec<Sample> =
                self.samples.iter().filter(|s| s.group == group).copied().collect();
            let fit = fit_line(&members)
                .map_err(|source| StepError::DegenerateFit { group, source })?;
            fits.push(fit);
        }

        let samples = reassign(&self.samples, &fits, self.norm);
        let changed = samples
            .iter()
            .zip(&self.samples)
            .any(|(new, old)| new.group != old.group);

        let next = if changed {
            debug!(iteration = self.iteration + 1, "labels moved");
            Simulation {
                params: self.params.clone(),
                norm: self.norm,
                samples,
                fits,
                iteration: self.iteration + 1,
                phase: Phase::Running,
            }
        } else {
            info!(iteration = self.iteration, "converged: no label changed");
            Simulation {
                params: self.params.clone(),
                norm: self.norm,
                samples,
                fits,
                // The converging pass updates fits and labels to their final
                // values but does not count as an iteration.
                iteration: self.iteration,
                phase: Phase::Converged,
            }
        };
        Ok(next)
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn fits(&self) -> &[Fit] {
        &self.fits
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_converged(&self) -> bool {
        self.phase == Phase::Converged
    }

    pub fn params(&self) -> &GenParams {
        &self.params
    }

    pub fn norm(&self) -> Norm {
        self.norm
    }

    #[cfg(test)]
    pub(crate) fn with_samples(params: GenParams, norm: Norm, samples: Vec<Sample>) -> Self {
        Simulation {
            params,
            norm,
            samples,
            fits: Vec::new(),
            iteration: 0,
            phase: Phase::Idle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MAX_CLUSTERS;
    use crate::rng::Lcg;

    const ITERATION_CAP: u32 = 500;

    fn run_to_convergence(mut sim: Simulation) -> Simulation {
        let mut passes = 0;
        while !sim.is_converged() {
            sim = sim.step().expect("no degenerate fits expected");
            passes += 1;
            assert!(passes <= ITERATION_CAP, "did not converge within {ITERATION_CAP} passes");
        }
        sim
    }

    #[test]
    fn fit_list_length_matches_cluster_count() {
        let params = GenParams::default();
        let sim = Simulation::new(params.clone(), Norm::Squared).unwrap();
        assert!(sim.fits().is_empty());
        let stepped = sim.step().unwrap();
        assert_eq!(stepped.fits().len(), params.clusters);
    }

    #[test]
    fn reassign_breaks_ties_toward_lowest_index() {
        let fits = vec![
            Fit { slope: 0.0, intercept: 1.0 },
            Fit { slope: 0.0, intercept: 1.0 },
        ];
        // Equidistant from both fits; must land in group 0.
        let samples = vec![Sample { x: 0.0, y: 5.0, group: 1 }];
        let out = reassign(&samples, &fits, Norm::Squared);
        assert_eq!(out[0].group, 0);
    }

    #[test]
    fn reassign_leaves_inputs_untouched() {
        let fits = vec![Fit { slope: 1.0, intercept: 0.0 }];
        let samples = vec![Sample { x: 1.0, y: 1.0, group: 0 }];
        let _ = reassign(&samples, &fits, Norm::Absolute);
        assert_eq!(samples[0].group, 0);
    }

    #[test]
    fn terminates_across_many_seeds() {
        // Empirical bound on the fit/reassign loop: representative
        // configurations must always converge well before the cap.
        for seed in 0..25u64 {
            for &(clusters, points) in &[(2usize, 10usize), (4, 25), (MAX_CLUSTERS, 50)] {
                let params = GenParams {
                    clusters,
                    points_per_cluster: points,
                    seed,
                    ..Default::default()
                };
                let sim = Simulation::new(params, Norm::Squared).unwrap();
                run_to_convergence(sim);
            }
        }
    }

    #[test]
    fn converged_state_is_a_fixed_point() {
        let params = GenParams { seed: 11, ..Default::default() };
        let sim = run_to_convergence(Simulation::new(params, Norm::Squared).unwrap());

        let again = sim.step().unwrap();
        assert_eq!(again.phase(), Phase::Converged);
        assert_eq!(again.iteration(), sim.iteration());
        assert_eq!(again.samples(), sim.samples());
        assert_eq!(again.fits(), sim.fits());
    }

    #[test]
    fn single_cluster_converges_immediately() {
        let params = GenParams { clusters: 1, points_per_cluster: 15, ..Default::default() };
        let sim = Simulation::new(params, Norm::Squared).unwrap();
        // Every label is already 0, so the first pass cannot move anything.
        let stepped = sim.step().unwrap();
        assert!(stepped.is_converged());
        assert_eq!(stepped.iteration(), 0);
    }

    #[test]
    fn two_separated_lines_are_recovered_exactly() {
        // Two noiseless parallel lines, y = x and y = x + 10, labels scrambled.
        // Convergence must rediscover slope 1 with intercepts 0 and 10 and put
        // every sample back with the line that generated it.
        let params = GenParams {
            clusters: 2,
            points_per_cluster: 10,
            noise: 0.0,
            slope_range: (1.0, 1.0),
            intercept_range: (0.0, 10.0),
            seed: 42,
        };
        let mut rng = Lcg::new(42);
        let mut samples = Vec::new();
        for intercept in [0.0, 10.0] {
            for i in 0..10 {
                let x = 20.0 + 40.0 * i as f64 / 9.0;
                samples.push(Sample { x, y: x + intercept, group: rng.index(2) });
            }
        }
        rng.shuffle(&mut samples);
        for s in &mut samples {
            s.group = rng.index(2);
        }

        let sim = run_to_convergence(Simulation::with_samples(params, Norm::Squared, samples));

        let mut fits = sim.fits().to_vec();
        fits.sort_by(|a, b| a.intercept.partial_cmp(&b.intercept).unwrap());
        assert!((fits[0].slope - 1.0).abs() < 1e-6);
        assert!((fits[1].slope - 1.0).abs() < 1e-6);
        assert!(fits[0].intercept.abs() < 1e-6);
        assert!((fits[1].intercept - 10.0).abs() < 1e-6);

        // With zero noise the partition is unambiguous: each sample's label
        // must match the intercept it was generated with.
        for s in sim.samples() {
            let true_intercept = s.y - s.x;
            let fit = sim.fits()[s.group];
            assert!((fit.intercept - true_intercept).abs() < 1e-6);
        }
    }

    #[test]
    fn degenerate_fit_reports_error_and_preserves_state() {
        // Group 0 holds two samples at the same x; fitting it must fail and
        // the pre-step state must be observable unchanged.
        let params = GenParams { clusters: 2, points_per_cluster: 2, ..Default::default() };
        let samples = vec![
            Sample { x: 5.0, y: 1.0, group: 0 },
            Sample { x: 5.0, y: 3.0, group: 0 },
            Sample { x: 1.0, y: 1.0, group: 1 },
            Sample { x: 2.0, y: 2.0, group: 1 },
        ];
        let sim = Simulation::with_samples(params, Norm::Squared, samples.clone());

        let err = sim.step().unwrap_err();
        assert_eq!(
            err,
            StepError::DegenerateFit { group: 0, source: DegenerateFit { x: 5.0, count: 2 } }
        );
        assert_eq!(sim.samples(), samples.as_slice());
        assert_eq!(sim.iteration(), 0);
        assert_eq!(sim.phase(), Phase::Idle);
        assert!(sim.fits().is_empty());
    }

    #[test]
    fn invalid_params_are_rejected_before_generation() {
        let params = GenParams { clusters: 0, ..Default::default() };
        assert!(Simulation::new(params, Norm::Squared).is_err());
    }
}
