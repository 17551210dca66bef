//! Rectangular grid scenarios.
//!
//! A scenario is a set of square nodes laid out row-major from a lower-left
//! origin in degrees:
//!
//! ```text
//!   row 1 │  3  │  4  │  5  │
//!   row 0 │  0  │  1  │  2  │      node id = row * cols + col
//!         ^ origin (lon, lat)
//! ```
//!
//! Each node carries a population and per-state counts.  A fresh grid puts
//! the whole population in the first state.

use epi_core::{DistanceMetric, GeoPoint, NodeId, SimRng};

use crate::{FlowModel, MigrationNetwork, SpatialError, SpatialResult};

/// States used when a caller has no compartments of its own.
pub const DEFAULT_STATES: [&str; 4] = ["S", "E", "I", "R"];

/// Axis-aligned cell extent in degrees.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn centroid(&self) -> GeoPoint {
        GeoPoint::new(
            (self.min_lat + self.max_lat) * 0.5,
            (self.min_lon + self.max_lon) * 0.5,
        )
    }

    /// Smallest box covering both.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min_lon: self.min_lon.min(other.min_lon),
            min_lat: self.min_lat.min(other.min_lat),
            max_lon: self.max_lon.max(other.max_lon),
            max_lat: self.max_lat.max(other.max_lat),
        }
    }
}

/// One grid cell.
#[derive(Clone, Debug, PartialEq)]
pub struct GridNode {
    pub id:         NodeId,
    pub row:        usize,
    pub col:        usize,
    pub population: u64,
    pub bounds:     BoundingBox,
    /// Count per state, in the scenario's state order; sums to `population`.
    pub states:     Vec<u64>,
}

impl GridNode {
    pub fn centroid(&self) -> GeoPoint {
        self.bounds.centroid()
    }
}

/// Per-node initial compartment values for [`Scenario::initialize_states`].
///
/// Either one row per node or a single row broadcast to every node; each
/// row has one entry per state.
#[derive(Clone, Debug, PartialEq)]
pub enum InitialStates {
    /// Exact counts; each row must sum to the node's population.
    Counts(Vec<Vec<u64>>),
    /// Fractions of the population.  The first column is ignored: the first
    /// state receives whatever the rounded remaining states leave over.
    Fractions(Vec<Vec<f64>>),
}

/// A set of grid nodes sharing one list of states.
#[derive(Clone, Debug)]
pub struct Scenario {
    nodes:  Vec<GridNode>,
    states: Vec<String>,
}

/// Build a `rows × cols` grid of square nodes `node_size_degs` on a side.
///
/// `population_fn(row, col)` supplies each node's population; a negative
/// value is an error.  Every population starts in `states[0]`.
pub fn grid<F>(
    rows:           usize,
    cols:           usize,
    node_size_degs: f64,
    origin:         GeoPoint,
    mut population_fn: F,
    states:         &[&str],
) -> SpatialResult<Scenario>
where
    F: FnMut(usize, usize) -> i64,
{
    let fail = |msg: &str| Err(SpatialError::Grid(msg.to_owned()));
    if rows < 1 {
        return fail("rows must be >= 1");
    }
    if cols < 1 {
        return fail("cols must be >= 1");
    }
    if !(node_size_degs > 0.0) {
        return fail("node_size_degs must be > 0");
    }
    if node_size_degs > 1.0 {
        return fail("node_size_degs must be <= 1.0");
    }
    if !(-180.0..180.0).contains(&origin.lon) {
        return fail("origin longitude must be -180 <= lon < 180");
    }
    if !(-90.0..90.0).contains(&origin.lat) {
        return fail("origin latitude must be -90 <= lat < 90");
    }
    if states.is_empty() {
        return fail("at least one state is required");
    }

    let mut nodes = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        for col in 0..cols {
            let raw = population_fn(row, col);
            let population = u64::try_from(raw).map_err(|_| {
                SpatialError::Grid(format!(
                    "population function returned negative population {raw} for row {row}, col {col}"
                ))
            })?;
            let min_lon = origin.lon + col as f64 * node_size_degs;
            let min_lat = origin.lat + row as f64 * node_size_degs;
            let mut counts = vec![0; states.len()];
            counts[0] = population;
            nodes.push(GridNode {
                id: NodeId((row * cols + col) as u32),
                row,
                col,
                population,
                bounds: BoundingBox {
                    min_lon,
                    min_lat,
                    max_lon: min_lon + node_size_degs,
                    max_lat: min_lat + node_size_degs,
                },
                states: counts,
            });
        }
    }

    Ok(Scenario {
        nodes,
        states: states.iter().map(|s| (*s).to_owned()).collect(),
    })
}

/// Population function drawing uniformly from `[1_000, 100_000]`.
pub fn uniform_population(rng: &mut SimRng) -> impl FnMut(usize, usize) -> i64 + '_ {
    move |_, _| rng.gen_range(1_000..=100_000)
}

impl Scenario {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[GridNode] {
        &self.nodes
    }

    pub fn states(&self) -> &[String] {
        &self.states
    }

    pub fn state_index(&self, name: &str) -> Option<usize> {
        self.states.iter().position(|s| s == name)
    }

    pub fn total_population(&self) -> u64 {
        self.nodes.iter().map(|n| n.population).sum()
    }

    pub fn populations(&self) -> Vec<u64> {
        self.nodes.iter().map(|n| n.population).collect()
    }

    /// Extent of the whole grid, or `None` for an empty scenario.
    pub fn bounds(&self) -> Option<BoundingBox> {
        let (first, rest) = self.nodes.split_first()?;
        Some(rest.iter().fold(first.bounds, |acc, n| acc.union(&n.bounds)))
    }

    /// A migration network over the node centroids and populations.
    pub fn migration_network(&self, metric: DistanceMetric, model: FlowModel) -> MigrationNetwork {
        let mut net = MigrationNetwork::new(metric, model);
        for node in &self.nodes {
            net.add_node(node.centroid(), node.population as f64);
        }
        net
    }

    /// Replace every node's state counts.
    ///
    /// Either every node is updated or, on error, none is.
    pub fn initialize_states(&mut self, initial: &InitialStates) -> SpatialResult<()> {
        let width = self.states.len();
        let rows = match initial {
            InitialStates::Counts(rows) => rows.len(),
            InitialStates::Fractions(rows) => rows.len(),
        };
        let row_width_ok = match initial {
            InitialStates::Counts(r) => r.iter().all(|row| row.len() == width),
            InitialStates::Fractions(r) => r.iter().all(|row| row.len() == width),
        };
        if !(rows == 1 || rows == self.nodes.len()) || !row_width_ok {
            return Err(SpatialError::Grid(format!(
                "initial state array shape must be (1 or {}, {width})",
                self.nodes.len()
            )));
        }

        let mut assigned = Vec::with_capacity(self.nodes.len());
        for (i, node) in self.nodes.iter().enumerate() {
            let r = if rows == 1 { 0 } else { i };
            let counts = match initial {
                InitialStates::Counts(v) => {
                    let row = &v[r];
                    if row.iter().sum::<u64>() != node.population {
                        return Err(SpatialError::Grid(format!(
                            "sum of initial states does not equal population at node {i}"
                        )));
                    }
                    row.clone()
                }
                InitialStates::Fractions(v) => fraction_counts(i, &v[r], node.population)?,
            };
            assigned.push(counts);
        }

        for (node, counts) in self.nodes.iter_mut().zip(assigned) {
            node.states = counts;
        }
        Ok(())
    }
}

/// Round each non-first fraction of `population` (ties to even); the first
/// state takes the remainder.
fn fraction_counts(node: usize, fractions: &[f64], population: u64) -> SpatialResult<Vec<u64>> {
    let rest = &fractions[1..];
    if rest.iter().any(|f| !f.is_finite() || *f < 0.0) {
        return Err(SpatialError::Grid(format!(
            "initial state proportions must be finite and non-negative at node {node}"
        )));
    }
    if rest.iter().sum::<f64>() > 1.0 {
        return Err(SpatialError::Grid(format!(
            "initial state proportions sum to more than 1.0 at node {node}"
        )));
    }
    let mut counts = vec![0u64; fractions.len()];
    for (c, f) in counts[1..].iter_mut().zip(rest) {
        *c = (f * population as f64).round_ties_even() as u64;
    }
    let assigned: u64 = counts[1..].iter().sum();
    counts[0] = population.checked_sub(assigned).ok_or_else(|| {
        SpatialError::Grid(format!(
            "rounded initial states exceed the population of {population} at node {node}"
        ))
    })?;
    Ok(counts)
}
