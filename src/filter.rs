//! Generic particle filter mechanics: predict, weight, resample. Kept
//! independent of what a "particle" actually is via the `ParticleModel`
//! trait, so the hot predict/weight loops monomorphize and inline instead
//! of going through boxed closures.

use rayon::prelude::*;

use crate::utility::Rng;

/// Binds a particle representation `P` to the control `C` and measurement
/// `M` types it is predicted and weighted against. `predict_one` takes
/// `&mut self` because advancing a particle mutates the shared ancestry
/// structure it lives in (a new tree node, in the SLAM driver's case);
/// `weight_one` takes `&self` so the weighting pass can run particles
/// across threads concurrently.
pub trait ParticleModel<P, C, M> {
    fn predict_one(&mut self, particle: &P, control: &C) -> P;
    fn weight_one(&self, particle: &P, measurement: &M) -> f64;
}

/// Weights, effective-sample-size bookkeeping, and resampling for a set of
/// `n` particles. Does not own the particles themselves — callers pass
/// `&[P]` / `Vec<P>` in and get reindexed vectors back.
pub struct ParticleFilter {
    weights: Vec<f64>,
    n: f64,
    /// A particle whose *current* weight has already fallen at or below
    /// this floor is never given a chance to resurrect itself: it's
    /// skipped during the next reweighting rather than multiplied by a
    /// fresh likelihood, so one good observation can't undo an elimination
    /// that earlier evidence already earned.
    threshold: f64,
}

impl ParticleFilter {
    pub fn new(size: usize, elimination_factor: f64) -> Self {
        debug_assert!(size > 0);
        let n = size as f64;
        Self {
            weights: vec![1.0 / n; size],
            n,
            threshold: elimination_factor / n,
        }
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn particle_count(&self) -> usize {
        self.weights.len()
    }

    /// Replaces every particle with `model.predict_one(particle, control)`,
    /// sequentially: predicting a particle mutates shared ancestry state (a
    /// new node per particle), so this pass cannot run concurrently without
    /// racing on that shared state.
    pub fn predict<P, C, M>(
        &self,
        model: &mut dyn ParticleModel<P, C, M>,
        particles: &[P],
        control: &C,
    ) -> Vec<P> {
        particles
            .iter()
            .map(|p| model.predict_one(p, control))
            .collect()
    }

    /// Reweights every particle against `measurement` and normalizes.
    /// Before multiplying in the fresh likelihood, a particle whose
    /// *current* weight has already fallen at or below `threshold` is
    /// skipped and its weight stays zero for this step — elimination is a
    /// ratchet, not something a single lucky observation can reverse.
    /// Runs the per-particle likelihood evaluation in parallel:
    /// `weight_one` only reads the model/map, so this is safe to fan out
    /// across `rayon`'s pool. Falls back to a uniform reset if every
    /// particle's weight collapses to effectively zero.
    pub fn weight<P, C, M>(
        &mut self,
        model: &(dyn ParticleModel<P, C, M> + Sync),
        particles: &[P],
        measurement: &M,
    ) where
        P: Sync,
        M: Sync,
        C: Sync,
    {
        let threshold = self.threshold;
        let raw: Vec<f64> = particles
            .par_iter()
            .zip(self.weights.par_iter())
            .map(|(p, &w)| {
                if w > threshold {
                    w * model.weight_one(p, measurement)
                } else {
                    0.0
                }
            })
            .collect();

        let sum: f64 = raw.iter().sum();
        if sum < 1e-10 {
            self.weights = vec![1.0 / self.n; particles.len()];
            return;
        }

        self.weights = raw.into_iter().map(|w| w / sum).collect();
    }

    /// `1 / Σwᵢ²`: the number of particles effectively carrying the
    /// posterior's mass. Drops toward 1 as the distribution degenerates
    /// onto a single hypothesis.
    pub fn effective_sample_size(&self) -> f64 {
        let sum_sq: f64 = self.weights.iter().map(|w| w * w).sum();
        if sum_sq < 1e-12 {
            0.0
        } else {
            1.0 / sum_sq
        }
    }

    /// Low-variance (systematic) resampling: draws a single uniform offset
    /// and walks the cumulative weight distribution with `n` evenly spaced
    /// pointers, so the resampled multiset's composition has far lower
    /// variance than drawing `n` independent categorical samples would.
    /// Resets weights to uniform afterward.
    pub fn resample<P: Clone>(&mut self, rng: &mut Rng, particles: &[P]) -> Vec<P> {
        let count = particles.len();
        debug_assert_eq!(count, self.weights.len());

        let step = 1.0 / self.n;
        let r0 = rng.uniform(0.0, step);

        let mut resampled = Vec::with_capacity(count);
        let mut cumulative = self.weights[0];
        let mut i = 0;
        for m in 0..count {
            let target = r0 + m as f64 * step;
            while target > cumulative && i < count - 1 {
                i += 1;
                cumulative += self.weights[i];
            }
            resampled.push(particles[i].clone());
        }

        self.weights = vec![1.0 / self.n; count];
        resampled
    }

    /// A single categorical draw, for e.g. picking one particle to render
    /// or log as the filter's current best guess.
    pub fn sample<P: Clone>(&self, rng: &mut Rng, particles: &[P]) -> P {
        let r = rng.uniform(0.0, 1.0);
        let mut cumulative = 0.0;
        for (p, &w) in particles.iter().zip(self.weights.iter()) {
            cumulative += w;
            if r <= cumulative {
                return p.clone();
            }
        }
        particles.last().expect("at least one particle").clone()
    }
}
