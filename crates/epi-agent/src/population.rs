//! Assigning initial states to a block of agents.
//!
//! A [`StateDistribution`] is built from any ordered sequence of
//! `(state, value)` pairs — a `Vec`, an array, a `BTreeMap` or an `IndexMap`
//! all go through the same constructor, so a list of pairs and the
//! equivalent mapping always apportion identically.
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use epi_agent::StateDistribution;
//!
//! let as_list = StateDistribution::proportions(vec![('A', 0.5), ('B', 0.3), ('C', 0.2)]).unwrap();
//! let as_map  = StateDistribution::proportions(BTreeMap::from([('A', 0.5), ('B', 0.3), ('C', 0.2)])).unwrap();
//!
//! assert_eq!(as_list.apportion(100).unwrap(), vec![50, 30, 20]);
//! assert_eq!(as_map.apportion(100).unwrap(), vec![50, 30, 20]);
//! ```

use std::ops::Range;

use epi_core::SimRng;

use crate::{AgentError, AgentResult, AgentStore, Element};

/// Proportions may exceed 1 by at most this much before being rejected.
pub const PROPORTION_TOLERANCE: f64 = 1e-6;

/// Slack added before flooring so `0.3 * 100` floors to 30, not 29.
const FLOOR_EPSILON: f64 = 1e-9;

#[derive(Clone, Debug, PartialEq)]
enum Shares {
    Counts(Vec<u64>),
    /// Already normalized to sum to 1.
    Proportions(Vec<f64>),
}

/// Target distribution of agents over states, in iteration order.
#[derive(Clone, Debug, PartialEq)]
pub struct StateDistribution<S> {
    states: Vec<S>,
    shares: Shares,
}

impl<S> StateDistribution<S> {
    /// Exact agent counts per state.  Their sum must equal the total later
    /// passed to [`apportion`](Self::apportion).
    pub fn counts<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
    {
        let (states, counts) = pairs.into_iter().unzip();
        Self { states, shares: Shares::Counts(counts) }
    }

    /// Relative shares per state.
    ///
    /// Values must be finite and non-negative with a positive sum no greater
    /// than `1 + PROPORTION_TOLERANCE`.  Shares are normalized by their sum.
    pub fn proportions<I>(pairs: I) -> AgentResult<Self>
    where
        I: IntoIterator<Item = (S, f64)>,
    {
        let (states, raw): (Vec<S>, Vec<f64>) = pairs.into_iter().unzip();
        if let Some(bad) = raw.iter().find(|p| !p.is_finite() || **p < 0.0) {
            return Err(AgentError::Distribution(format!(
                "proportion {bad} is negative or not finite"
            )));
        }
        let sum: f64 = raw.iter().sum();
        if sum > 1.0 + PROPORTION_TOLERANCE {
            return Err(AgentError::Distribution(format!(
                "proportions sum to {sum}, more than 1.0"
            )));
        }
        if sum <= 0.0 {
            return Err(AgentError::Distribution("proportions sum to zero".to_owned()));
        }
        let normalized = raw.into_iter().map(|p| p / sum).collect();
        Ok(Self { states, shares: Shares::Proportions(normalized) })
    }

    pub fn states(&self) -> &[S] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Split `total` agents across the states.
    ///
    /// Counts are checked against `total`.  Proportions are floored and the
    /// rounding remainder goes one agent at a time to the first states (in
    /// iteration order) with a non-zero share, so the result always sums to
    /// exactly `total`.
    pub fn apportion(&self, total: usize) -> AgentResult<Vec<usize>> {
        match &self.shares {
            Shares::Counts(counts) => {
                let sum = counts
                    .iter()
                    .try_fold(0u64, |acc, &c| acc.checked_add(c))
                    .ok_or_else(|| AgentError::Distribution("state counts overflow u64".into()))?;
                if sum != total as u64 {
                    return Err(AgentError::Distribution(format!(
                        "state counts sum to {sum}, expected {total}"
                    )));
                }
                Ok(counts.iter().map(|&c| c as usize).collect())
            }
            Shares::Proportions(props) => {
                let mut out: Vec<usize> = props
                    .iter()
                    .map(|p| ((p * total as f64 + FLOOR_EPSILON).floor() as usize).min(total))
                    .collect();
                let mut assigned: usize = out.iter().sum();

                // Floors can only overshoot through FLOOR_EPSILON; trim from the back.
                for slot in out.iter_mut().rev() {
                    if assigned <= total {
                        break;
                    }
                    let take = (*slot).min(assigned - total);
                    *slot -= take;
                    assigned -= take;
                }

                let eligible: Vec<usize> =
                    (0..props.len()).filter(|&i| props[i] > 0.0).collect();
                let mut k = 0;
                while assigned < total {
                    out[eligible[k % eligible.len()]] += 1;
                    assigned += 1;
                    k += 1;
                }
                Ok(out)
            }
        }
    }
}

impl AgentStore {
    /// Assign states to the agents in `range` of property `name`.
    ///
    /// Agents are filled in contiguous blocks, one block per state in
    /// distribution order.  Returns the per-state agent counts.  Follow with
    /// [`shuffle_population`](Self::shuffle_population) if positional
    /// correlation matters.
    pub fn initialize_population<T: Element>(
        &mut self,
        name:         &str,
        range:        Range<usize>,
        distribution: &StateDistribution<T>,
    ) -> AgentResult<Vec<usize>> {
        self.check_range(&range)?;
        let counts = distribution.apportion(range.len())?;
        let column = &mut self.column_mut::<T>(name)?[range];

        let mut start = 0;
        for (&state, &n) in distribution.states().iter().zip(&counts) {
            column[start..start + n].fill(state);
            start += n;
        }
        Ok(counts)
    }

    /// Randomly permute the values of property `name` within `range`.
    pub fn shuffle_population<T: Element>(
        &mut self,
        name:  &str,
        range: Range<usize>,
        rng:   &mut SimRng,
    ) -> AgentResult<()> {
        self.check_range(&range)?;
        rng.shuffle(&mut self.column_mut::<T>(name)?[range]);
        Ok(())
    }
}
