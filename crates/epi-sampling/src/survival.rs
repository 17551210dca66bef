//! Kaplan–Meier survival curves and age-of-death prediction.
//!
//! A [`SurvivalCurve`] is a right-continuous step function over whole years
//! of age.  `S(a)` is the probability of surviving past the end of year `a`;
//! it is 1 before the first stored point and holds its last value after the
//! final one.
//!
//! # Prediction
//!
//! For an agent alive at the start of year `age`:
//!
//! ```text
//!   s0     = S(age - 1)            (1 when age == 0)
//!   target = u * s0                u ~ U[0, 1)
//!   death  = min { a >= age : S(a) <= target }, clamped to max_year
//! ```
//!
//! which is inverse-transform sampling from the survival distribution
//! conditioned on having reached `age`.

use tracing::debug;

use epi_core::{DAYS_PER_YEAR, SimRng};

use crate::{SamplingError, SamplingResult};

/// Immutable non-increasing step survival function.
#[derive(Clone, Debug)]
pub struct SurvivalCurve {
    /// `(age, S(age))`, ages strictly increasing, survival non-increasing.
    points:  Vec<(u32, f64)>,
    /// Oldest age present in the source data.
    max_age: u32,
}

impl SurvivalCurve {
    /// Build from explicit `(age, survival)` steps.
    pub fn new(points: Vec<(u32, f64)>) -> SamplingResult<Self> {
        if points.is_empty() {
            return Err(SamplingError::Distribution("survival curve has no points".into()));
        }
        let mut prev_age: Option<u32> = None;
        let mut prev_s = 1.0_f64;
        for &(age, s) in &points {
            if !(0.0..=1.0).contains(&s) {
                return Err(SamplingError::Distribution(format!(
                    "survival {s} at age {age} is outside [0, 1]"
                )));
            }
            if prev_age.is_some_and(|p| age <= p) {
                return Err(SamplingError::Distribution(format!(
                    "ages must be strictly increasing (found {age} after {})",
                    prev_age.unwrap_or_default()
                )));
            }
            if s > prev_s {
                return Err(SamplingError::Distribution(format!(
                    "survival rises from {prev_s} to {s} at age {age}"
                )));
            }
            prev_age = Some(age);
            prev_s = s;
        }
        let max_age = points[points.len() - 1].0;
        Ok(Self { points, max_age })
    }

    /// Product-limit estimate from `(age_at_event, observed)` records.
    ///
    /// `observed == false` marks a censored record: the individual left
    /// follow-up at that age alive.  Censored records count in the risk set
    /// at their own age, so deaths at an age are applied before censoring.
    pub fn from_events(events: &[(u32, bool)]) -> SamplingResult<Self> {
        if !events.iter().any(|&(_, observed)| observed) {
            return Err(SamplingError::Distribution(
                "at least one observed event is required".into(),
            ));
        }
        let mut sorted = events.to_vec();
        sorted.sort_unstable_by_key(|&(age, _)| age);

        let mut at_risk = sorted.len();
        let mut survival = 1.0_f64;
        let mut points = Vec::new();
        let mut i = 0;
        while i < sorted.len() {
            let age = sorted[i].0;
            let mut deaths = 0usize;
            let mut leaving = 0usize;
            while i < sorted.len() && sorted[i].0 == age {
                deaths += usize::from(sorted[i].1);
                leaving += 1;
                i += 1;
            }
            if deaths > 0 {
                survival *= 1.0 - deaths as f64 / at_risk as f64;
                points.push((age, survival));
            }
            at_risk -= leaving;
        }

        let max_age = sorted[sorted.len() - 1].0;
        debug!(records = events.len(), steps = points.len(), max_age, "kaplan-meier curve built");
        Ok(Self { points, max_age })
    }

    /// Build from cumulative death counts where `cumulative[y]` is the
    /// number of deaths at or before age `y`.
    pub fn from_cumulative_deaths(cumulative: &[u64]) -> SamplingResult<Self> {
        let total = match cumulative.last() {
            Some(&t) if t > 0 => t as f64,
            _ => {
                return Err(SamplingError::Distribution(
                    "cumulative deaths must end with a positive total".into(),
                ));
            }
        };
        if cumulative.windows(2).any(|w| w[1] < w[0]) {
            return Err(SamplingError::Distribution(
                "cumulative deaths must be non-decreasing".into(),
            ));
        }
        let points = cumulative
            .iter()
            .enumerate()
            .map(|(age, &c)| (age as u32, 1.0 - c as f64 / total))
            .collect();
        Self::new(points)
    }

    /// Oldest age in the source data; the default upper bound for
    /// predictions.
    pub fn max_age(&self) -> u32 {
        self.max_age
    }

    pub fn points(&self) -> &[(u32, f64)] {
        &self.points
    }

    /// `S(age)`: probability of surviving past the end of year `age`.
    pub fn survival(&self, age: u32) -> f64 {
        let idx = self.points.partition_point(|&(a, _)| a <= age);
        if idx == 0 { 1.0 } else { self.points[idx - 1].1 }
    }

    /// Sample the year of death for an agent alive at the start of year
    /// `age`.
    ///
    /// The result lies in `[age, max_year]`.  `max_year` defaults to
    /// [`max_age`](Self::max_age), or to `age` itself for agents already
    /// older than every age in the data.
    pub fn predict_year_of_death(
        &self,
        age:      u32,
        max_year: Option<u32>,
        rng:      &mut SimRng,
    ) -> SamplingResult<u32> {
        let max = self.resolve_bound(age, max_year)?;
        Ok(self.draw_year(age, max, rng))
    }

    /// Batch form of [`predict_year_of_death`](Self::predict_year_of_death).
    ///
    /// Every bound is checked before the first draw, so on error the RNG has
    /// not advanced.
    pub fn predict_years_of_death(
        &self,
        ages:     &[u32],
        max_year: Option<u32>,
        rng:      &mut SimRng,
    ) -> SamplingResult<Vec<u32>> {
        let bounds: Vec<u32> = ages
            .iter()
            .map(|&age| self.resolve_bound(age, max_year))
            .collect::<SamplingResult<_>>()?;
        Ok(ages
            .iter()
            .zip(bounds)
            .map(|(&age, max)| self.draw_year(age, max, rng))
            .collect())
    }

    /// Day-resolution variant: given the current age in days, return the
    /// age in days at death.  Always `>= age_days`.
    pub fn predict_age_at_death_days(
        &self,
        age_days: u64,
        max_year: Option<u32>,
        rng:      &mut SimRng,
    ) -> SamplingResult<u64> {
        let age = u32::try_from(age_days / DAYS_PER_YEAR).map_err(|_| {
            SamplingError::Distribution(format!("age of {age_days} days is out of range"))
        })?;
        let year = u64::from(self.predict_year_of_death(age, max_year, rng)?);
        let first = (year * DAYS_PER_YEAR).max(age_days);
        let last = year * DAYS_PER_YEAR + DAYS_PER_YEAR - 1;
        Ok(rng.gen_range(first..=last))
    }

    fn resolve_bound(&self, age: u32, max_year: Option<u32>) -> SamplingResult<u32> {
        match max_year {
            Some(max) if max < age => Err(SamplingError::InvalidBound { current: age, max }),
            Some(max) => Ok(max),
            None => Ok(self.max_age.max(age)),
        }
    }

    fn draw_year(&self, age: u32, max: u32, rng: &mut SimRng) -> u32 {
        let s0 = match age.checked_sub(1) {
            Some(prev) => self.survival(prev),
            None => 1.0,
        };
        // Already past the end of the curve: dies this year.
        if s0 <= 0.0 {
            return age;
        }
        let target = rng.uniform() * s0;
        if self.survival(age) <= target {
            return age;
        }
        let idx = self.points.partition_point(|&(_, s)| s > target);
        let year = self.points.get(idx).map_or(max, |&(a, _)| a.max(age));
        year.min(max)
    }
}
