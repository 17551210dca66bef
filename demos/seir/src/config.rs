//! Run parameters: built-in defaults, optionally updated from a JSON file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde_json::json;

use epi_core::{GeoPoint, MergePolicy, PropertySet};
use epi_spatial::FlowModel;

/// Every key the run understands.  An override file may only update these.
pub fn defaults() -> PropertySet {
    [
        ("seed",              json!(42)),
        ("ticks",             json!(365)),
        ("grid_rows",         json!(4)),
        ("grid_cols",         json!(4)),
        ("node_size_degs",    json!(0.1)),
        // Black Rock Desert, NV
        ("origin_lat",        json!(40.786944)),
        ("origin_lon",        json!(-119.204167)),
        ("initial_infected",  json!(0.002)),
        ("beta",              json!(0.35)),
        ("incubation_days",   json!(5)),
        ("infectious_days",   json!(7)),
        ("migration_rate",    json!(0.02)),
        ("flow_model",        json!({ "model": "gravity", "a": 1.0, "b": 1.0, "c": 2.0 })),
        ("crude_birth_rate",  json!(18.0)),
        ("growth_drift",      json!(0.0001)),
        ("growth_volatility", json!(0.002)),
        ("forecast_trials",   json!(16)),
        ("record_interval",   json!(7)),
        ("output_dir",        json!("output/seir")),
    ]
    .into_iter()
    .collect()
}

/// Defaults, updated from `path` when given.
pub fn load(path: Option<&Path>) -> Result<PropertySet> {
    let mut params = defaults();
    if let Some(path) = path {
        let overrides = PropertySet::load_json(path)
            .with_context(|| format!("reading overrides from {}", path.display()))?;
        params
            .merge(&overrides, MergePolicy::UpdateOnly)
            .context("override file sets an unknown parameter")?;
    }
    Ok(params)
}

/// Typed view of the parameters.
#[derive(Debug)]
pub struct RunConfig {
    pub seed:              u64,
    pub ticks:             u64,
    pub grid_rows:         usize,
    pub grid_cols:         usize,
    pub node_size_degs:    f64,
    pub origin:            GeoPoint,
    pub initial_infected:  f64,
    pub beta:              f64,
    pub incubation_days:   u64,
    pub infectious_days:   u64,
    pub migration_rate:    f64,
    pub flow_model:        FlowModel,
    pub crude_birth_rate:  f64,
    pub growth_drift:      f64,
    pub growth_volatility: f64,
    pub forecast_trials:   usize,
    pub record_interval:   u64,
    pub output_dir:        PathBuf,
}

impl RunConfig {
    pub fn from_params(p: &PropertySet) -> Result<Self> {
        let cfg = Self {
            seed:              p.get_as("seed")?,
            ticks:             p.get_as("ticks")?,
            grid_rows:         p.get_as("grid_rows")?,
            grid_cols:         p.get_as("grid_cols")?,
            node_size_degs:    p.get_as("node_size_degs")?,
            origin:            GeoPoint::new(p.get_as("origin_lat")?, p.get_as("origin_lon")?),
            initial_infected:  p.get_as("initial_infected")?,
            beta:              p.get_as("beta")?,
            incubation_days:   p.get_as("incubation_days")?,
            infectious_days:   p.get_as("infectious_days")?,
            migration_rate:    p.get_as("migration_rate")?,
            flow_model:        p.get_as("flow_model")?,
            crude_birth_rate:  p.get_as("crude_birth_rate")?,
            growth_drift:      p.get_as("growth_drift")?,
            growth_volatility: p.get_as("growth_volatility")?,
            forecast_trials:   p.get_as("forecast_trials")?,
            record_interval:   p.get_as("record_interval")?,
            output_dir:        p.get_as("output_dir")?,
        };
        if !(0.0..=1.0).contains(&cfg.migration_rate) {
            bail!("migration_rate must be in [0, 1], got {}", cfg.migration_rate);
        }
        if !(0.0..=1.0).contains(&cfg.initial_infected) {
            bail!("initial_infected must be in [0, 1], got {}", cfg.initial_infected);
        }
        if cfg.record_interval == 0 {
            bail!("record_interval must be at least 1");
        }
        if cfg.ticks > i32::MAX as u64 {
            bail!("ticks must fit the i32 date columns");
        }
        Ok(cfg)
    }
}
