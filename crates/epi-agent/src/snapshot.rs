//! Binary snapshots of an [`AgentStore`].
//!
//! # File format
//!
//! ```text
//! ┌──────────────┬──────────────────┬──────────────────┬──────────────────────┐
//! │ magic (8 B)  │ header len (u64) │ header (JSON)    │ column bytes         │
//! │ "EPISNAP\x01"│ little-endian    │ count, capacity, │ declared order,      │
//! │              │                  │ forecast, props  │ little-endian, each  │
//! │              │                  │                  │ `capacity` elements  │
//! └──────────────┴──────────────────┴──────────────────┴──────────────────────┘
//! ```
//!
//! Every slot up to `capacity` is written, not just the active agents, so a
//! restored store makes exactly the same growth decisions as the original.
//!
//! Saving writes to a uniquely named sibling temporary file and renames it
//! into place; the temporary is removed if any write fails.
//! Loading validates the header against the live schema before decoding any
//! payload and only swaps state in once everything decoded, so a failed
//! load never mutates the target store.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::info;

use crate::column::{ColumnVec, ElementType};
use crate::store::{MAX_CAPACITY, Property};
use crate::{AgentError, AgentResult, AgentStore};

const MAGIC: &[u8; 8] = b"EPISNAP\x01";

#[derive(Serialize, Deserialize)]
struct SnapshotHeader {
    count:             usize,
    capacity:          usize,
    forecast_capacity: usize,
    properties:        Vec<PropertyHeader>,
}

#[derive(Serialize, Deserialize)]
struct PropertyHeader {
    name:         String,
    element_type: ElementType,
    length:       usize,
    /// Little-endian encoding of the value used for unissued slots.
    default:      Vec<u8>,
}

impl AgentStore {
    /// Write `count`, `capacity` and every column to `path`.
    pub fn save_snapshot(&self, path: &Path) -> AgentResult<()> {
        let header = SnapshotHeader {
            count:             self.count,
            capacity:          self.capacity,
            forecast_capacity: self.forecast_capacity,
            properties:        self
                .properties
                .iter()
                .map(|p| PropertyHeader {
                    name:         p.name.clone(),
                    element_type: p.column.element_type(),
                    length:       p.column.len(),
                    default:      p.column.encode_default(),
                })
                .collect(),
        };
        let header_bytes = serde_json::to_vec(&header)?;

        // Uniquely named sibling; dropped (and deleted) on any early return.
        let dir = match path.parent() {
            Some(d) if !d.as_os_str().is_empty() => d,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        {
            let mut out = BufWriter::new(tmp.as_file_mut());
            out.write_all(MAGIC)?;
            out.write_all(&(header_bytes.len() as u64).to_le_bytes())?;
            out.write_all(&header_bytes)?;
            let mut buf = Vec::new();
            for p in &self.properties {
                buf.clear();
                p.column.encode_data(&mut buf);
                out.write_all(&buf)?;
            }
            out.flush()?;
        }
        tmp.persist(path).map_err(|e| e.error)?;

        info!(path = %path.display(), count = self.count, capacity = self.capacity, "snapshot saved");
        Ok(())
    }

    /// Replace this store's state with the snapshot at `path`.
    ///
    /// The file must declare exactly this store's properties (same names,
    /// same element types, same order).  On any error the store is left
    /// untouched.
    pub fn load_snapshot(&mut self, path: &Path) -> AgentResult<()> {
        let bytes = fs::read(path)?;
        let (header, payload) = parse_header(&bytes)?;

        let live = self.schema();
        if live.len() != header.properties.len() {
            return Err(AgentError::SnapshotSchema(format!(
                "file declares {} properties, store declares {}",
                header.properties.len(),
                live.len()
            )));
        }
        for (want, got) in live.iter().zip(&header.properties) {
            if want.name != got.name || want.element_type != got.element_type {
                return Err(AgentError::SnapshotSchema(format!(
                    "expected property {:?} ({}), file has {:?} ({})",
                    want.name, want.element_type, got.name, got.element_type
                )));
            }
        }

        let columns = decode_columns(&header, payload)?;
        for (p, column) in self.properties.iter_mut().zip(columns) {
            p.column = column;
        }
        self.count = header.count;
        self.capacity = header.capacity;
        self.forecast_capacity = header.forecast_capacity;

        info!(path = %path.display(), count = self.count, capacity = self.capacity, "snapshot loaded");
        Ok(())
    }

    /// Build a new store whose schema is taken from the snapshot itself.
    pub fn from_snapshot(path: &Path) -> AgentResult<Self> {
        let bytes = fs::read(path)?;
        let (header, payload) = parse_header(&bytes)?;
        let columns = decode_columns(&header, payload)?;

        let mut index = FxHashMap::default();
        let mut properties = Vec::with_capacity(columns.len());
        for (h, column) in header.properties.iter().zip(columns) {
            if index.insert(h.name.clone(), properties.len()).is_some() {
                return Err(AgentError::SnapshotFormat(format!("property {:?} declared twice", h.name)));
            }
            properties.push(Property { name: h.name.clone(), column });
        }
        Ok(Self {
            count:             header.count,
            capacity:          header.capacity,
            forecast_capacity: header.forecast_capacity,
            properties,
            index,
        })
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn parse_header(bytes: &[u8]) -> AgentResult<(SnapshotHeader, &[u8])> {
    let rest = bytes
        .strip_prefix(MAGIC.as_slice())
        .ok_or_else(|| AgentError::SnapshotFormat("missing magic bytes".to_owned()))?;
    if rest.len() < 8 {
        return Err(AgentError::SnapshotFormat("truncated header length".to_owned()));
    }
    let (len_bytes, rest) = rest.split_at(8);
    let mut len_buf = [0u8; 8];
    len_buf.copy_from_slice(len_bytes);
    let header_len = usize::try_from(u64::from_le_bytes(len_buf))
        .map_err(|_| AgentError::SnapshotFormat("header length overflows usize".to_owned()))?;
    if rest.len() < header_len {
        return Err(AgentError::SnapshotFormat("truncated header".to_owned()));
    }
    let (header_bytes, payload) = rest.split_at(header_len);
    let header: SnapshotHeader = serde_json::from_slice(header_bytes)?;

    if header.count > header.capacity || header.capacity > MAX_CAPACITY {
        return Err(AgentError::SnapshotFormat(format!(
            "count {} / capacity {} out of range",
            header.count, header.capacity
        )));
    }
    if let Some(p) = header.properties.iter().find(|p| p.length != header.capacity) {
        return Err(AgentError::SnapshotFormat(format!(
            "property {:?} has length {}, capacity is {}",
            p.name, p.length, header.capacity
        )));
    }
    Ok((header, payload))
}

fn decode_columns(header: &SnapshotHeader, mut payload: &[u8]) -> AgentResult<Vec<Box<dyn ColumnVec>>> {
    let mut columns = Vec::with_capacity(header.properties.len());
    for p in &header.properties {
        let width = p.length.checked_mul(p.element_type.size()).ok_or_else(|| {
            AgentError::SnapshotFormat(format!("property {:?} is too large", p.name))
        })?;
        if payload.len() < width {
            return Err(AgentError::SnapshotFormat(format!("payload for {:?} is truncated", p.name)));
        }
        let (data, rest) = payload.split_at(width);
        payload = rest;
        let column = p.element_type.decode_column(data, &p.default).ok_or_else(|| {
            AgentError::SnapshotFormat(format!("cannot decode property {:?}", p.name))
        })?;
        columns.push(column);
    }
    if !payload.is_empty() {
        return Err(AgentError::SnapshotFormat(format!("{} trailing bytes", payload.len())));
    }
    Ok(columns)
}
