//! Population projections used to pre-size an [`AgentStore`](crate::AgentStore).
//!
//! Two estimators:
//!
//! - [`CapacityForecaster`] runs a geometric-Brownian growth model
//!
//!   ```text
//!   P[t+1] = P[t] · exp((μ − σ²/2)·Δt + σ·√Δt·Z),   Z ~ N(0, 1)
//!   ```
//!
//!   and reports the peak over one or more paths.
//! - [`capacity_from_birthrates`] compounds per-node crude birth rates
//!   deterministically.
//!
//! Neither governs simulated dynamics; they only decide how many slots to
//! reserve so a run reallocates rarely.

use tracing::debug;

use epi_core::{DAYS_PER_YEAR, SimRng};

use crate::{AgentError, AgentResult};

/// Stochastic multiplicative growth model over a fixed horizon.
#[derive(Clone, Debug, PartialEq)]
pub struct CapacityForecaster {
    initial_population: f64,
    /// Drift μ per unit time.
    drift:              f64,
    /// Volatility σ per √unit time.
    volatility:         f64,
    /// Length of one tick in the units of `drift`.
    time_step:          f64,
    horizon_ticks:      u64,
}

impl CapacityForecaster {
    /// `drift` and `volatility` are per tick unless changed with
    /// [`with_time_step`](Self::with_time_step).
    pub fn new(initial_population: u64, drift: f64, volatility: f64, horizon_ticks: u64) -> AgentResult<Self> {
        if !drift.is_finite() || !volatility.is_finite() || volatility < 0.0 {
            return Err(AgentError::InvalidInput(format!(
                "growth parameters must be finite with non-negative volatility (μ={drift}, σ={volatility})"
            )));
        }
        Ok(Self {
            initial_population: initial_population as f64,
            drift,
            volatility,
            time_step: 1.0,
            horizon_ticks,
        })
    }

    /// Express `drift`/`volatility` per unit of which one tick is `dt`
    /// (e.g. `1.0 / 365.0` for annual rates and daily ticks).
    pub fn with_time_step(mut self, dt: f64) -> AgentResult<Self> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(AgentError::InvalidInput(format!("time step must be positive, got {dt}")));
        }
        self.time_step = dt;
        Ok(self)
    }

    pub fn horizon_ticks(&self) -> u64 {
        self.horizon_ticks
    }

    /// One simulated trajectory of `horizon_ticks + 1` values starting at
    /// the initial population.
    pub fn project_path(&self, rng: &mut SimRng) -> Vec<f64> {
        self.trajectory(rng).collect()
    }

    /// Peak of a single trajectory, rounded up.  Same draws as
    /// [`project_path`](Self::project_path) without keeping the path.
    pub fn project_peak(&self, rng: &mut SimRng) -> u64 {
        to_slots(self.trajectory(rng).fold(0.0_f64, f64::max))
    }

    /// Geometric Brownian motion, one value per tick.
    fn trajectory<'a>(&'a self, rng: &'a mut SimRng) -> impl Iterator<Item = f64> + 'a {
        let dt = self.time_step;
        let drift = (self.drift - 0.5 * self.volatility * self.volatility) * dt;
        let shock = self.volatility * dt.sqrt();

        let mut p = self.initial_population;
        std::iter::once(p).chain((0..self.horizon_ticks).map(move |_| {
            p *= (drift + shock * rng.standard_normal()).exp();
            p
        }))
    }

    /// Highest peak over `trials` trajectories, scaled by `safety_factor`.
    ///
    /// The result is never below the initial population.
    pub fn project_capacity(&self, trials: usize, safety_factor: f64, rng: &mut SimRng) -> AgentResult<usize> {
        if trials == 0 {
            return Err(AgentError::InvalidInput("at least one trial is required".to_owned()));
        }
        if !safety_factor.is_finite() || safety_factor < 1.0 {
            return Err(AgentError::InvalidInput(format!(
                "safety factor must be >= 1, got {safety_factor}"
            )));
        }
        let peak = (0..trials).map(|_| self.project_peak(rng)).max().unwrap_or(0);
        let capacity = to_slots(peak as f64 * safety_factor) as usize;
        debug!(
            initial = self.initial_population,
            horizon = self.horizon_ticks,
            trials,
            capacity,
            "capacity forecast"
        );
        Ok(capacity.max(self.initial_population as usize))
    }
}

fn to_slots(x: f64) -> u64 {
    if x.is_finite() { x.ceil().max(0.0) as u64 } else { u64::MAX }
}

/// Deterministic per-node capacity from crude birth rates.
///
/// `birthrates[t][n]` is the crude birth rate (births per 1,000 per year) at
/// node `n` during tick `t`, one tick being one day.  Each node's population
/// is compounded over all ticks and the growth is scaled by `safety_factor`:
///
/// ```text
/// growth[n]   = Π_t (1 + cbr[t][n] / 1000)^(1/365)
/// estimate[n] = ⌈pop[n] · (1 + safety · (growth[n] − 1))⌉
/// ```
pub fn capacity_from_birthrates(
    birthrates:    &[Vec<f64>],
    populations:   &[u64],
    safety_factor: f64,
) -> AgentResult<Vec<u64>> {
    if !safety_factor.is_finite() || safety_factor < 0.0 {
        return Err(AgentError::InvalidInput(format!(
            "safety factor must be non-negative, got {safety_factor}"
        )));
    }
    let mut log_growth = vec![0.0_f64; populations.len()];
    for (t, row) in birthrates.iter().enumerate() {
        if row.len() != populations.len() {
            return Err(AgentError::InvalidInput(format!(
                "birth-rate row {t} has {} nodes, expected {}",
                row.len(),
                populations.len()
            )));
        }
        for (acc, &cbr) in log_growth.iter_mut().zip(row) {
            if !cbr.is_finite() || cbr < 0.0 {
                return Err(AgentError::InvalidInput(format!(
                    "crude birth rate {cbr} at tick {t} is negative or not finite"
                )));
            }
            *acc += (cbr / 1000.0).ln_1p() / DAYS_PER_YEAR as f64;
        }
    }
    Ok(populations
        .iter()
        .zip(log_growth)
        .map(|(&pop, lg)| {
            let growth = lg.exp_m1();
            to_slots(pop as f64 * (1.0 + safety_factor * growth))
        })
        .collect())
}
