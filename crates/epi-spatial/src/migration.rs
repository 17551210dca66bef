//! Migration-network builder and the row-stochastic matrix it produces.
//!
//! # Construction
//!
//! 1. Pairwise distances are computed once (`O(n²)`) under the chosen
//!    [`DistanceMetric`].  The diagonal is never used as a divisor.
//! 2. Raw flows are evaluated in **log space** in `f64`:
//!
//!    ```text
//!    gravity:    ln f_ij = a·ln p_i + b·ln p_j − c·ln d_ij
//!    competing:  ln f_ij = gravity_ij + δ·ln A_ij
//!                A_ij    = Σ_{k ≠ i, j} p_k^b / d_jk^c
//!    radiation:  ln f_ij = ln p_i + ln p_j − ln(p_i + s_ij) − ln(p_i + p_j + s_ij)
//!                s_ij    = population strictly closer to i than j is (excluding i, j)
//!    ```
//!
//!    Large populations raised to large exponents never materialize as
//!    linear values, so nothing overflows before normalization.
//! 3. Each row is shifted by its maximum log flow, exponentiated and
//!    divided by its sum.  A row whose flows are all zero, or any of whose
//!    flows is infinite or NaN, fails with
//!    [`SpatialError::MigrationOverflow`].
//!
//! The normalized rows are downcast to `f32` as the last step.

use serde::{Deserialize, Serialize};
use tracing::info;

use epi_core::{DistanceMetric, GeoPoint, NodeId};

use crate::{SpatialError, SpatialResult};

// ── Flow models ───────────────────────────────────────────────────────────────

/// Spatial interaction model.  Proportionality constants are omitted: they
/// cancel under row normalization.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum FlowModel {
    /// `f_ij ∝ p_i^a · p_j^b / d_ij^c`
    Gravity { a: f64, b: f64, c: f64 },
    /// Gravity weighted by `A_ij^delta`, the accessibility of destinations
    /// competing with `j`.  Negative `delta` models competition, positive
    /// models agglomeration.  Needs at least three nodes.
    CompetingDestinations { a: f64, b: f64, c: f64, delta: f64 },
    /// Parameter-free radiation model.
    Radiation,
}

impl FlowModel {
    pub fn name(&self) -> &'static str {
        match self {
            FlowModel::Gravity { .. }               => "gravity",
            FlowModel::CompetingDestinations { .. } => "competing_destinations",
            FlowModel::Radiation                    => "radiation",
        }
    }

    /// Distance exponent; zero when distances only order destinations.
    fn distance_exponent(&self) -> f64 {
        match *self {
            FlowModel::Gravity { c, .. } | FlowModel::CompetingDestinations { c, .. } => c,
            FlowModel::Radiation => 0.0,
        }
    }
}

/// What happens to the diagonal (`i → i`) of the matrix.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelfFlow {
    /// Diagonal is zero; off-diagonal flows carry the whole row.
    #[default]
    Exclude,
    /// Diagonal is fixed at the given share in `[0, 1]`; off-diagonal flows
    /// are normalized to the rest.
    Stay(f64),
}

// ── MigrationMatrix ───────────────────────────────────────────────────────────

/// Dense row-stochastic matrix: row `i` is the destination distribution for
/// migrants leaving node `i`.  Immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct MigrationMatrix {
    n:    usize,
    data: Vec<f32>,
}

impl MigrationMatrix {
    #[inline]
    pub fn node_count(&self) -> usize {
        self.n
    }

    /// Destination probabilities for migrants leaving `from`.
    #[inline]
    pub fn row(&self, from: NodeId) -> &[f32] {
        let start = from.index() * self.n;
        &self.data[start..start + self.n]
    }

    #[inline]
    pub fn get(&self, from: NodeId, to: NodeId) -> f32 {
        self.data[from.index() * self.n + to.index()]
    }

    /// Row-major backing storage.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

// ── MigrationNetwork ──────────────────────────────────────────────────────────

/// Collects nodes, then builds a [`MigrationMatrix`].
///
/// ```rust
/// use epi_core::{DistanceMetric, GeoPoint};
/// use epi_spatial::{FlowModel, MigrationNetwork};
///
/// let mut net = MigrationNetwork::new(
///     DistanceMetric::GreatCircle,
///     FlowModel::Gravity { a: 1.0, b: 1.0, c: 2.0 },
/// );
/// let a = net.add_node(GeoPoint::new(40.0, -119.0), 250_000.0);
/// net.add_node(GeoPoint::new(40.5, -119.5), 80_000.0);
/// net.add_node(GeoPoint::new(41.0, -118.0), 1_200_000.0);
///
/// let matrix = net.build().unwrap();
/// let total: f32 = matrix.row(a).iter().sum();
/// assert!((total - 1.0).abs() < 1e-6);
/// ```
pub struct MigrationNetwork {
    nodes:       Vec<GeoPoint>,
    populations: Vec<f64>,
    metric:      DistanceMetric,
    model:       FlowModel,
    self_flow:   SelfFlow,
}

impl MigrationNetwork {
    pub fn new(metric: DistanceMetric, model: FlowModel) -> Self {
        Self {
            nodes:       Vec::new(),
            populations: Vec::new(),
            metric,
            model,
            self_flow:   SelfFlow::default(),
        }
    }

    pub fn self_flow(mut self, policy: SelfFlow) -> Self {
        self.self_flow = policy;
        self
    }

    /// Add a node.  IDs are assigned sequentially from 0.
    pub fn add_node(&mut self, pos: GeoPoint, population: f64) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(pos);
        self.populations.push(population);
        id
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn build(self) -> SpatialResult<MigrationMatrix> {
        self.validate()?;
        let n = self.nodes.len();
        let inputs = FlowInputs::new(&self)?;

        #[cfg(not(feature = "parallel"))]
        let rows: Vec<Vec<f32>> = (0..n)
            .map(|i| normalize_row(i, &inputs.row_log_flows(i), self.self_flow))
            .collect::<SpatialResult<_>>()?;

        #[cfg(feature = "parallel")]
        let rows: Vec<Vec<f32>> = {
            use rayon::prelude::*;

            (0..n)
                .into_par_iter()
                .map(|i| normalize_row(i, &inputs.row_log_flows(i), self.self_flow))
                .collect::<SpatialResult<_>>()?
        };

        info!(
            nodes = n,
            model = self.model.name(),
            metric = ?self.metric,
            self_flow = ?self.self_flow,
            "migration matrix built"
        );
        Ok(MigrationMatrix { n, data: rows.concat() })
    }

    fn validate(&self) -> SpatialResult<()> {
        let invalid = |msg: String| Err(SpatialError::InvalidInput(msg));
        let n = self.nodes.len();
        if n == 0 {
            return invalid("network has no nodes".into());
        }
        if let Some((i, p)) = self.populations.iter().enumerate().find(|(_, p)| !p.is_finite() || **p < 0.0) {
            return invalid(format!("node {i} has population {p}"));
        }
        for (i, pos) in self.nodes.iter().enumerate() {
            let ok = match self.metric {
                DistanceMetric::GreatCircle => pos.is_valid(),
                DistanceMetric::Euclidean   => pos.lat.is_finite() && pos.lon.is_finite(),
            };
            if !ok {
                return invalid(format!("node {i} has invalid coordinates {pos}"));
            }
        }
        let params: Vec<f64> = match self.model {
            FlowModel::Gravity { a, b, c } => vec![a, b, c],
            FlowModel::CompetingDestinations { a, b, c, delta } => {
                if n < 3 {
                    return invalid(format!("competing destinations needs at least 3 nodes, got {n}"));
                }
                vec![a, b, c, delta]
            }
            FlowModel::Radiation => Vec::new(),
        };
        if params.iter().any(|v| !v.is_finite()) {
            return invalid(format!("{} parameters must be finite: {params:?}", self.model.name()));
        }
        if let SelfFlow::Stay(f) = self.self_flow {
            if !(0.0..=1.0).contains(&f) {
                return invalid(format!("self-flow share {f} is outside [0, 1]"));
            }
        }
        Ok(())
    }
}

// ── Flow evaluation ───────────────────────────────────────────────────────────

/// `exp · ln_x`, with a zero exponent contributing nothing even when
/// `ln_x` is infinite (`x⁰ = 1`).
#[inline]
fn scaled_ln(exp: f64, ln_x: f64) -> f64 {
    if exp == 0.0 { 0.0 } else { exp * ln_x }
}

/// Row-independent precomputation shared by every row.
struct FlowInputs {
    n:       usize,
    model:   FlowModel,
    pops:    Vec<f64>,
    ln_pop:  Vec<f64>,
    dist:    Vec<f64>,
    ln_dist: Vec<f64>,
    /// Competing destinations only, stride `n + 1` per destination `j`:
    /// `ln Σ_{k < m, k ≠ j} p_k^b / d_jk^c` at `[j][m]`.
    access_prefix: Vec<f64>,
    /// As above over `k >= m`.
    access_suffix: Vec<f64>,
}

/// `ln(eˣ + eʸ)` without leaving log space.
#[inline]
fn log_add(x: f64, y: f64) -> f64 {
    let hi = x.max(y);
    if hi == f64::NEG_INFINITY {
        return hi;
    }
    hi + (-(x - y).abs()).exp().ln_1p()
}

impl FlowInputs {
    fn new(net: &MigrationNetwork) -> SpatialResult<Self> {
        let n = net.nodes.len();
        let mut dist = vec![0.0_f64; n * n];
        for i in 0..n {
            for j in (i + 1)..n {
                let d = net.metric.distance(net.nodes[i], net.nodes[j]);
                if d == 0.0 && net.model.distance_exponent() != 0.0 {
                    return Err(SpatialError::InvalidInput(format!(
                        "nodes {i} and {j} share a location; distance decay is undefined"
                    )));
                }
                dist[i * n + j] = d;
                dist[j * n + i] = d;
            }
        }

        let mut inputs = FlowInputs {
            n,
            model:   net.model,
            pops:    net.populations.clone(),
            ln_pop:  net.populations.iter().map(|p| p.ln()).collect(),
            ln_dist: dist.iter().map(|d| d.ln()).collect(),
            dist,
            access_prefix: Vec::new(),
            access_suffix: Vec::new(),
        };
        if let FlowModel::CompetingDestinations { b, c, .. } = net.model {
            // Prefix and suffix sums let each A_ij leave out k = i without
            // subtracting it from a total.
            let stride = n + 1;
            let mut prefix = vec![f64::NEG_INFINITY; n * stride];
            let mut suffix = vec![f64::NEG_INFINITY; n * stride];
            for j in 0..n {
                let row = j * stride;
                for k in 0..n {
                    let t = if k == j { f64::NEG_INFINITY } else { inputs.access_term(j, k, b, c) };
                    prefix[row + k + 1] = log_add(prefix[row + k], t);
                }
                for k in (0..n).rev() {
                    let t = if k == j { f64::NEG_INFINITY } else { inputs.access_term(j, k, b, c) };
                    suffix[row + k] = log_add(suffix[row + k + 1], t);
                }
            }
            inputs.access_prefix = prefix;
            inputs.access_suffix = suffix;
        }
        Ok(inputs)
    }

    /// `ln A_ij = ln Σ_{k ≠ i, j} p_k^b / d_jk^c`
    #[inline]
    fn ln_access(&self, i: usize, j: usize) -> f64 {
        let row = j * (self.n + 1);
        log_add(self.access_prefix[row + i], self.access_suffix[row + i + 1])
    }

    /// `ln(p_k^b / d_jk^c)`
    #[inline]
    fn access_term(&self, j: usize, k: usize, b: f64, c: f64) -> f64 {
        scaled_ln(b, self.ln_pop[k]) - scaled_ln(c, self.ln_dist[j * self.n + k])
    }

    #[inline]
    fn gravity(&self, i: usize, j: usize, a: f64, b: f64, c: f64) -> f64 {
        scaled_ln(a, self.ln_pop[i]) + scaled_ln(b, self.ln_pop[j])
            - scaled_ln(c, self.ln_dist[i * self.n + j])
    }

    /// Log raw flows out of node `i`; the diagonal is `-inf`.
    fn row_log_flows(&self, i: usize) -> Vec<f64> {
        let n = self.n;
        let mut logs = vec![f64::NEG_INFINITY; n];
        match self.model {
            FlowModel::Gravity { a, b, c } => {
                for j in (0..n).filter(|&j| j != i) {
                    logs[j] = self.gravity(i, j, a, b, c);
                }
            }
            FlowModel::CompetingDestinations { a, b, c, delta } => {
                for j in (0..n).filter(|&j| j != i) {
                    let g = self.gravity(i, j, a, b, c);
                    if delta == 0.0 {
                        logs[j] = g;
                        continue;
                    }
                    let ln_a = self.ln_access(i, j);
                    logs[j] = if ln_a > f64::NEG_INFINITY { g + delta * ln_a } else { f64::NEG_INFINITY };
                }
            }
            FlowModel::Radiation => self.radiation_row(i, &mut logs),
        }
        logs
    }

    fn radiation_row(&self, i: usize, logs: &mut [f64]) {
        let n = self.n;
        let row = &self.dist[i * n..(i + 1) * n];
        let mut order: Vec<usize> = (0..n).filter(|&j| j != i).collect();
        order.sort_by(|&x, &y| row[x].total_cmp(&row[y]));

        let p_i = self.pops[i];
        let mut within = 0.0_f64;
        let mut start = 0;
        while start < order.len() {
            // Equidistant destinations share the same intervening population.
            let d = row[order[start]];
            let end = start + order[start..].iter().take_while(|&&j| row[j] == d).count();
            for &j in &order[start..end] {
                let p_j = self.pops[j];
                if p_i > 0.0 && p_j > 0.0 {
                    logs[j] = self.ln_pop[i] + self.ln_pop[j]
                        - (p_i + within).ln()
                        - (p_i + p_j + within).ln();
                }
            }
            within += order[start..end].iter().map(|&j| self.pops[j]).sum::<f64>();
            start = end;
        }
    }
}

/// Shift, exponentiate and normalize one row, then downcast.
fn normalize_row(row: usize, logs: &[f64], self_flow: SelfFlow) -> SpatialResult<Vec<f32>> {
    let stay = match self_flow {
        SelfFlow::Exclude => 0.0,
        SelfFlow::Stay(f) => f,
    };
    let mut out = vec![0.0_f32; logs.len()];
    out[row] = stay as f32;
    if stay >= 1.0 {
        return Ok(out);
    }

    if let Some(&bad) = logs.iter().find(|l| l.is_nan() || **l == f64::INFINITY) {
        return Err(SpatialError::MigrationOverflow { row, sum: bad });
    }
    let shift = logs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if shift == f64::NEG_INFINITY {
        return Err(SpatialError::MigrationOverflow { row, sum: 0.0 });
    }
    let weights: Vec<f64> = logs.iter().map(|l| (l - shift).exp()).collect();
    let sum: f64 = weights.iter().sum();
    if !(sum.is_finite() && sum > 0.0) {
        return Err(SpatialError::MigrationOverflow { row, sum });
    }

    let share = 1.0 - stay;
    for (j, w) in weights.iter().enumerate() {
        if j != row {
            out[j] = (share * w / sum) as f32;
        }
    }
    Ok(out)
}
