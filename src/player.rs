// Autoplay control around a shared Simulation. One logical timeline: manual
// steps and the ticker thread both go through the same mutex, so no two
// steps ever overlap, and the ticker re-checks the playing flag and the
// epoch under the lock after every delay. Pause and reset both bump the
// epoch, so a tick pending mid-delay is cancelled for good and a restart
// always gets a fresh ticker.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use crate::data::{GenParams, ParamError};
use crate::fit::Norm;
use crate::sim::{Simulation, StepError};

pub const DEFAULT_CADENCE: Duration = Duration::from_secs(1);

pub struct Player {
    sim: Arc<Mutex<Simulation>>,
    playing: Arc<AtomicBool>,
    // Bumped on every pause and reset; a ticker started before the bump
    // refuses to step and exits.
    epoch: Arc<AtomicU64>,
}

impl Player {
    pub fn new(sim: Simulation) -> Self {
        Player {
            sim: Arc::new(Mutex::new(sim)),
            playing: Arc::new(AtomicBool::new(false)),
            epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Handle for renderers. Consumers read under the lock and never step.
    pub fn shared(&self) -> Arc<Mutex<Simulation>> {
        Arc::clone(&self.sim)
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    /// Current state, cloned out of the lock.
    pub fn snapshot(&self) -> Simulation {
        self.sim.lock().unwrap().clone()
    }

    /// One manual fit/reassign pass. On error the shared state is untouched.
    pub fn step_once(&self) -> Result<(), StepError> {
        let mut sim = self.sim.lock().unwrap();
        let next = sim.step()?;
        *sim = next;
        Ok(())
    }

    /// Starts the autoplay ticker. Does nothing if already playing. The
    /// ticker stops itself on convergence, on a degenerate fit (state is
    /// preserved, error logged), on `pause`, and on `reset`.
    pub fn run(&self, cadence: Duration) {
        if self.playing.swap(true, Ordering::SeqCst) {
            return;
        }
        let sim = Arc::clone(&self.sim);
        let playing = Arc::clone(&self.playing);
        let epoch = Arc::clone(&self.epoch);
        let started_at = epoch.load(Ordering::SeqCst);

        thread::spawn(move || {
            loop {
                thread::sleep(cadence);

                let mut guard = sim.lock().unwrap();
                // Re-check under the lock: a pause or reset during the sleep
                // means this tick must not fire.
                if !playing.load(Ordering::SeqCst) || epoch.load(Ordering::SeqCst) != started_at {
                    break;
                }
                match guard.step() {
                    Ok(next) => {
                        *guard = next;
                        if guard.is_converged() {
                            playing.store(false, Ordering::SeqCst);
                            info!(iteration = guard.iteration(), "autoplay finished: converged");
                            break;
                        }
                    }
                    Err(err) => {
                        playing.store(false, Ordering::SeqCst);
                        warn!(error = %err, "autoplay stopped: degenerate fit");
                        break;
                    }
                }
            }
        });
    }

    /// Stops autoplay; a tick pending in its delay becomes a no-op. The
    /// epoch bump retires the current ticker outright, so a later `run`
    /// cannot revive it: without the bump, restarting before the old
    /// ticker's sleep expired would let it see `playing == true` again and
    /// fire the stale step, leaving two tickers looping at once.
    pub fn pause(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.playing.store(false, Ordering::SeqCst);
    }

    /// Discards all state and regenerates from the given params. Any pending
    /// autoplay tick is invalidated via the epoch before the swap.
    pub fn reset(&self, params: GenParams, norm: Norm) -> Result<(), ParamError> {
        let fresh = Simulation::new(params, norm)?;
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.playing.store(false, Ordering::SeqCst);
        *self.sim.lock().unwrap() = fresh;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(seed: u64) -> Player {
        let params = GenParams { seed, ..Default::default() };
        Player::new(Simulation::new(params, Norm::Squared).unwrap())
    }

    #[test]
    fn manual_steps_advance_iteration() {
        let p = player(5);
        assert_eq!(p.snapshot().iteration(), 0);
        p.step_once().unwrap();
        let snap = p.snapshot();
        assert!(snap.iteration() <= 1);
        assert_eq!(snap.fits().len(), snap.params().clusters);
    }

    #[test]
    fn autoplay_reaches_convergence_and_self_disables() {
        let p = player(8);
        p.run(Duration::from_millis(1));
        for _ in 0..500 {
            if p.snapshot().is_converged() && !p.is_playing() {
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("autoplay did not converge and disable in time");
    }

    #[test]
    fn pause_cancels_pending_tick() {
        let p = player(13);
        p.run(Duration::from_millis(50));
        p.pause();
        let before = p.snapshot().iteration();
        // Long enough for the pending tick to have fired had it not been
        // cancelled.
        thread::sleep(Duration::from_millis(200));
        assert_eq!(p.snapshot().iteration(), before);
        assert!(!p.is_playing());
    }

    #[test]
    fn reset_invalidates_stale_ticker() {
        let p = player(21);
        p.run(Duration::from_millis(50));
        let params = GenParams { seed: 99, ..Default::default() };
        p.reset(params.clone(), Norm::Squared).unwrap();
        thread::sleep(Duration::from_millis(200));
        let snap = p.snapshot();
        // The stale ticker must not have stepped the regenerated state.
        assert_eq!(snap.iteration(), 0);
        assert_eq!(snap.params(), &params);
        assert!(!snap.is_converged());
        assert!(!p.is_playing());
    }

    #[test]
    fn restart_after_pause_retires_the_old_ticker() {
        let p = player(30);
        p.run(Duration::from_millis(200));
        thread::sleep(Duration::from_millis(50));
        p.pause();
        // Restart with a cadence far beyond the test's lifetime: the only
        // way the iteration can advance is the first ticker's pending tick
        // surviving the pause.
        p.run(Duration::from_secs(10));
        thread::sleep(Duration::from_millis(400));
        assert_eq!(p.snapshot().iteration(), 0);
        assert!(p.is_playing());
        p.pause();
    }

    #[test]
    fn reset_rejects_invalid_params() {
        let p = player(1);
        let bad = GenParams { clusters: 0, ..Default::default() };
        assert!(p.reset(bad, Norm::Squared).is_err());
        // Prior state survives a rejected reset.
        assert_eq!(p.snapshot().params().clusters, GenParams::default().clusters);
    }
}
