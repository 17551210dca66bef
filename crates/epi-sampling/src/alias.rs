//! Alias-method sampling from an arbitrary discrete distribution.
//!
//! Construction (Vose's variant) runs in O(k) and produces two parallel
//! tables over the `k` outcomes:
//!
//! ```text
//!   bin:    0      1      2     ...
//!   prob:   0.60   1.00   0.90
//!   alias:  1      -      0
//! ```
//!
//! A draw picks a bin uniformly, then keeps the bin's own outcome with
//! probability `prob[bin]` and otherwise returns `alias[bin]`.  That is two
//! uniforms and one branch regardless of `k`.

use epi_core::SimRng;

use crate::{SamplingError, SamplingResult};

/// Maximum allowed deviation of `sum(probabilities)` from 1.
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Output slots per child stream in [`AliasedDistribution::par_sample_into`].
pub const SAMPLE_CHUNK: usize = 4096;

/// Immutable alias table.  Draws never mutate it, so it can be shared
/// freely between threads.
#[derive(Clone, Debug)]
pub struct AliasedDistribution {
    prob:  Vec<f64>,
    alias: Vec<u32>,
}

impl AliasedDistribution {
    /// Build from a probability vector that already sums to 1.
    ///
    /// Fails if the vector is empty, holds a negative or non-finite entry,
    /// or sums to something further than [`PROBABILITY_TOLERANCE`] from 1.
    pub fn new(probabilities: &[f64]) -> SamplingResult<Self> {
        check_entries(probabilities)?;
        let total: f64 = probabilities.iter().sum();
        if (total - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(SamplingError::Distribution(format!(
                "probabilities sum to {total}, expected 1"
            )));
        }
        Ok(Self::build(probabilities, total))
    }

    /// Build from non-negative weights of any scale.
    pub fn from_weights(weights: &[f64]) -> SamplingResult<Self> {
        check_entries(weights)?;
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return Err(SamplingError::Distribution("weights sum to zero".into()));
        }
        Ok(Self::build(weights, total))
    }

    /// Build from observed counts, e.g. an age pyramid.
    pub fn from_counts(counts: &[u64]) -> SamplingResult<Self> {
        let weights: Vec<f64> = counts.iter().map(|&c| c as f64).collect();
        Self::from_weights(&weights)
    }

    /// Vose's algorithm.  `total` is the (validated, positive) sum used to
    /// rescale so the mean bin height is exactly 1.
    fn build(weights: &[f64], total: f64) -> Self {
        let k = weights.len();
        let mut scaled: Vec<f64> = weights.iter().map(|w| w * k as f64 / total).collect();
        let mut prob  = vec![0.0_f64; k];
        let mut alias: Vec<u32> = (0..k as u32).collect();

        let mut small: Vec<usize> = Vec::with_capacity(k);
        let mut large: Vec<usize> = Vec::with_capacity(k);
        for (i, &s) in scaled.iter().enumerate() {
            if s < 1.0 { small.push(i) } else { large.push(i) }
        }

        while let Some(lo) = small.pop() {
            let Some(hi) = large.pop() else {
                small.push(lo);
                break;
            };
            prob[lo]  = scaled[lo];
            alias[lo] = hi as u32;
            scaled[hi] = (scaled[hi] + scaled[lo]) - 1.0;
            if scaled[hi] < 1.0 { small.push(hi) } else { large.push(hi) }
        }

        // Whatever is left is 1 up to rounding error.
        for i in large.into_iter().chain(small) {
            prob[i] = 1.0;
        }

        Self { prob, alias }
    }

    /// Number of outcomes `k`.
    pub fn len(&self) -> usize {
        self.prob.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prob.is_empty()
    }

    /// Draw one outcome index in `0..k`.
    #[inline]
    pub fn sample(&self, rng: &mut SimRng) -> usize {
        let bin = rng.gen_range(0..self.prob.len());
        if rng.uniform() < self.prob[bin] {
            bin
        } else {
            self.alias[bin] as usize
        }
    }

    /// Draw `n` outcomes.
    pub fn sample_n(&self, n: usize, rng: &mut SimRng) -> Vec<usize> {
        let mut out = vec![0; n];
        self.sample_into(&mut out, rng);
        out
    }

    /// Fill `out` with independent draws, one scalar draw per slot.
    pub fn sample_into(&self, out: &mut [usize], rng: &mut SimRng) {
        for slot in out.iter_mut() {
            *slot = self.sample(rng);
        }
    }

    /// Fill `out` in chunks of [`SAMPLE_CHUNK`], chunk `i` drawing from
    /// `rng.child(i)`.
    ///
    /// The child streams are derived up front in chunk order, so the result
    /// depends only on the seed and `out.len()`, never on thread scheduling.
    /// With the `parallel` feature the chunks run on Rayon's pool.
    pub fn par_sample_into(&self, out: &mut [usize], rng: &mut SimRng) {
        let chunks = out.len().div_ceil(SAMPLE_CHUNK);
        let mut streams: Vec<SimRng> = (0..chunks as u64).map(|i| rng.child(i)).collect();

        #[cfg(not(feature = "parallel"))]
        {
            for (chunk, stream) in out.chunks_mut(SAMPLE_CHUNK).zip(streams.iter_mut()) {
                self.sample_into(chunk, stream);
            }
        }

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;

            out.par_chunks_mut(SAMPLE_CHUNK)
                .zip(streams.par_iter_mut())
                .for_each(|(chunk, stream)| self.sample_into(chunk, stream));
        }
    }
}

fn check_entries(values: &[f64]) -> SamplingResult<()> {
    if values.is_empty() {
        return Err(SamplingError::Distribution("no outcomes".into()));
    }
    if values.len() > u32::MAX as usize {
        return Err(SamplingError::Distribution(format!(
            "{} outcomes exceed the alias index range",
            values.len()
        )));
    }
    if let Some((i, v)) = values.iter().enumerate().find(|(_, v)| !v.is_finite() || **v < 0.0) {
        return Err(SamplingError::Distribution(format!(
            "entry {i} is {v}; values must be finite and non-negative"
        )));
    }
    Ok(())
}
