//! `PropertySet` — ordered, loosely typed run configuration.
//!
//! Drivers assemble a run's parameters from layers (built-in defaults, a
//! scenario file, calibration overrides).  Each layer is merged with an
//! explicit [`MergePolicy`] so that typos in an override file fail loudly
//! instead of silently adding a parameter nobody reads:
//!
//! ```rust
//! use epi_core::{MergePolicy, PropertySet};
//! use serde_json::json;
//!
//! let mut params = PropertySet::new();
//! params.add("seed", json!(20241107)).unwrap();
//! params.add("beta", json!(0.3)).unwrap();
//!
//! let overrides = PropertySet::from_json_str(r#"{"beta": 0.45}"#).unwrap();
//! params.merge(&overrides, MergePolicy::UpdateOnly).unwrap();
//!
//! assert_eq!(params.get_as::<f64>("beta").unwrap(), 0.45);
//! ```

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{EpiError, EpiResult};

/// How [`PropertySet::merge`] treats keys of the incoming set.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MergePolicy {
    /// Every incoming key must be new.
    AddOnly,
    /// Every incoming key must already exist.
    UpdateOnly,
    /// New keys are appended, existing keys are overwritten.
    AddOrUpdate,
}

/// Insertion-ordered key → JSON value mapping.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertySet {
    values: IndexMap<String, Value>,
}

impl PropertySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Deserialize the value under `key` into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> EpiResult<T> {
        let value = self
            .values
            .get(key)
            .ok_or_else(|| EpiError::MissingKey(key.to_owned()))?;
        T::deserialize(value).map_err(|e| EpiError::InvalidValue {
            key:    key.to_owned(),
            reason: e.to_string(),
        })
    }

    /// Like [`get_as`](Self::get_as) but falls back to `default` when absent.
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> EpiResult<T> {
        if self.contains(key) {
            self.get_as(key)
        } else {
            Ok(default)
        }
    }

    /// Insert a new key.  Fails if `key` is already present.
    pub fn add(&mut self, key: impl Into<String>, value: Value) -> EpiResult<()> {
        let key = key.into();
        if self.values.contains_key(&key) {
            return Err(EpiError::DuplicateKey(key));
        }
        self.values.insert(key, value);
        Ok(())
    }

    /// Overwrite an existing key.  Fails if `key` is absent.
    pub fn update(&mut self, key: &str, value: Value) -> EpiResult<()> {
        match self.values.get_mut(key) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(EpiError::MissingKey(key.to_owned())),
        }
    }

    /// Insert or overwrite.  Existing keys keep their position.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    /// Merge `other` into `self` under `policy`.
    ///
    /// All keys are checked before anything is written, so a failing merge
    /// leaves `self` untouched.
    pub fn merge(&mut self, other: &PropertySet, policy: MergePolicy) -> EpiResult<()> {
        for key in other.values.keys() {
            let exists = self.values.contains_key(key);
            match policy {
                MergePolicy::AddOnly if exists => {
                    return Err(EpiError::DuplicateKey(key.clone()));
                }
                MergePolicy::UpdateOnly if !exists => {
                    return Err(EpiError::MissingKey(key.clone()));
                }
                _ => {}
            }
        }
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    // ── JSON I/O ──────────────────────────────────────────────────────────

    /// Parse a JSON object.  Key order follows the document.
    pub fn from_json_str(text: &str) -> EpiResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load_json(path: &Path) -> EpiResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn save_json(&self, path: &Path) -> EpiResult<()> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for PropertySet {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut set = PropertySet::new();
        for (k, v) in iter {
            set.set(k, v);
        }
        set
    }
}
