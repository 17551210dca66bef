//! Type-erased, fixed-width property columns.
//!
//! # Design
//!
//! Each property is a `Vec<T>` of a fixed-width [`Element`] type stored
//! behind a `Box<dyn ColumnVec>`.  Every column is exactly `capacity` long;
//! slots `[count, capacity)` hold the property's default value until `add`
//! hands them out.
//!
//! The `ColumnVec` trait carries everything the store needs without knowing
//! `T`: growth into fresh storage, compaction, summaries and the
//! little-endian byte encoding used by snapshots.  Typed access goes through
//! `as_any` downcasts to [`TypedColumn<T>`].

use std::any::Any;
use std::collections::TryReserveError;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::describe::SummaryStats;

// ── ElementType ───────────────────────────────────────────────────────────────

/// Runtime tag for a column's element type.  Part of the snapshot schema.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
    Bool,
}

impl ElementType {
    /// Encoded width of one element in bytes.
    pub fn size(self) -> usize {
        match self {
            ElementType::U8 | ElementType::I8 | ElementType::Bool => 1,
            ElementType::U16 | ElementType::I16 => 2,
            ElementType::U32 | ElementType::I32 | ElementType::F32 => 4,
            ElementType::U64 | ElementType::I64 | ElementType::F64 => 8,
        }
    }

    /// `true` for types summarized by level counts rather than min/max/mean.
    pub fn is_categorical(self) -> bool {
        matches!(self, ElementType::Bool)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ElementType::U8   => "u8",
            ElementType::I8   => "i8",
            ElementType::U16  => "u16",
            ElementType::I16  => "i16",
            ElementType::U32  => "u32",
            ElementType::I32  => "i32",
            ElementType::U64  => "u64",
            ElementType::I64  => "i64",
            ElementType::F32  => "f32",
            ElementType::F64  => "f64",
            ElementType::Bool => "bool",
        }
    }

    /// Build a column of this type from its little-endian encoding.
    ///
    /// `data` must hold a whole number of elements and `default` exactly one.
    pub(crate) fn decode_column(self, data: &[u8], default: &[u8]) -> Option<Box<dyn ColumnVec>> {
        fn decode<T: Element>(data: &[u8], default: &[u8]) -> Option<Box<dyn ColumnVec>> {
            let default = match T::decode_all(default)?.as_slice() {
                [single] => *single,
                _ => return None,
            };
            let data = T::decode_all(data)?;
            Some(Box::new(TypedColumn { data, default }))
        }
        match self {
            ElementType::U8   => decode::<u8>(data, default),
            ElementType::I8   => decode::<i8>(data, default),
            ElementType::U16  => decode::<u16>(data, default),
            ElementType::I16  => decode::<i16>(data, default),
            ElementType::U32  => decode::<u32>(data, default),
            ElementType::I32  => decode::<i32>(data, default),
            ElementType::U64  => decode::<u64>(data, default),
            ElementType::I64  => decode::<i64>(data, default),
            ElementType::F32  => decode::<f32>(data, default),
            ElementType::F64  => decode::<f64>(data, default),
            ElementType::Bool => decode::<bool>(data, default),
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Element ───────────────────────────────────────────────────────────────────

/// A fixed-width value that can live in a property column.
///
/// Sealed: the set of element types is closed so that snapshot files stay
/// readable by any build.
pub trait Element: Copy + PartialEq + fmt::Debug + Send + Sync + 'static + sealed::Sealed {
    const TYPE: ElementType;

    /// Append the little-endian encoding of `self`.
    fn encode(self, out: &mut Vec<u8>);

    /// Decode a packed little-endian buffer; `None` on a ragged length.
    fn decode_all(bytes: &[u8]) -> Option<Vec<Self>>;

    /// Numeric view used by summaries.
    fn to_f64(self) -> f64;
}

mod sealed {
    pub trait Sealed {}
}

macro_rules! numeric_element {
    ($($t:ty => $tag:ident),* $(,)?) => {$(
        impl sealed::Sealed for $t {}

        impl Element for $t {
            const TYPE: ElementType = ElementType::$tag;

            #[inline]
            fn encode(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            fn decode_all(bytes: &[u8]) -> Option<Vec<Self>> {
                const WIDTH: usize = std::mem::size_of::<$t>();
                if bytes.len() % WIDTH != 0 {
                    return None;
                }
                let values = bytes
                    .chunks_exact(WIDTH)
                    .map(|chunk| {
                        let mut buf = [0u8; WIDTH];
                        buf.copy_from_slice(chunk);
                        <$t>::from_le_bytes(buf)
                    })
                    .collect();
                Some(values)
            }

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }
        }
    )*};
}

numeric_element! {
    u8  => U8,
    i8  => I8,
    u16 => U16,
    i16 => I16,
    u32 => U32,
    i32 => I32,
    u64 => U64,
    i64 => I64,
    f32 => F32,
    f64 => F64,
}

impl sealed::Sealed for bool {}

impl Element for bool {
    const TYPE: ElementType = ElementType::Bool;

    #[inline]
    fn encode(self, out: &mut Vec<u8>) {
        out.push(self as u8);
    }

    fn decode_all(bytes: &[u8]) -> Option<Vec<Self>> {
        Some(bytes.iter().map(|&b| b != 0).collect())
    }

    #[inline]
    fn to_f64(self) -> f64 {
        if self { 1.0 } else { 0.0 }
    }
}

// ── ColumnVec ─────────────────────────────────────────────────────────────────

/// Type-erased interface for one property column.
pub trait ColumnVec: Send + Sync + 'static + sealed::Sealed {
    fn element_type(&self) -> ElementType;

    /// Allocated length (equals the store's capacity).
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy into freshly allocated storage of `new_len` slots, filling the
    /// tail with the default.  `self` is left untouched.
    fn try_grown(&self, new_len: usize) -> Result<Box<dyn ColumnVec>, TryReserveError>;

    /// Keep `data[i]` for every `i < keep.len()` with `keep[i]`, packed to
    /// the front in order; the vacated slots are reset to the default.
    fn compact(&mut self, keep: &[bool]);

    /// Reset `[from, len)` to the default value.
    fn reset_tail(&mut self, from: usize);

    /// Summary statistics over `[0, count)`.
    fn summarize(&self, count: usize) -> SummaryStats;

    /// Append the little-endian encoding of all `len()` slots.
    fn encode_data(&self, out: &mut Vec<u8>);

    /// Little-endian encoding of the default value.
    fn encode_default(&self) -> Vec<u8>;

    #[doc(hidden)]
    fn as_any(&self) -> &dyn Any;

    #[doc(hidden)]
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A `Vec<T>` column plus the value used for unissued slots.
///
/// `pub` so callers can downcast, but construct columns through
/// [`AgentStore::add_property`](crate::AgentStore::add_property).
pub struct TypedColumn<T: Element> {
    pub data: Vec<T>,
    pub default: T,
}

impl<T: Element> TypedColumn<T> {
    pub(crate) fn filled(len: usize, default: T) -> Result<Self, TryReserveError> {
        let mut data = Vec::new();
        data.try_reserve_exact(len)?;
        data.resize(len, default);
        Ok(Self { data, default })
    }
}

impl<T: Element> sealed::Sealed for TypedColumn<T> {}

impl<T: Element> ColumnVec for TypedColumn<T> {
    fn element_type(&self) -> ElementType {
        T::TYPE
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn try_grown(&self, new_len: usize) -> Result<Box<dyn ColumnVec>, TryReserveError> {
        let mut data = Vec::new();
        data.try_reserve_exact(new_len.max(self.data.len()))?;
        data.extend_from_slice(&self.data);
        data.resize(new_len.max(self.data.len()), self.default);
        Ok(Box::new(TypedColumn { data, default: self.default }))
    }

    fn compact(&mut self, keep: &[bool]) {
        let mut write = 0;
        for (read, &k) in keep.iter().enumerate() {
            if k {
                self.data[write] = self.data[read];
                write += 1;
            }
        }
        self.reset_tail(write);
    }

    fn reset_tail(&mut self, from: usize) {
        let default = self.default;
        for slot in self.data.iter_mut().skip(from) {
            *slot = default;
        }
    }

    fn summarize(&self, count: usize) -> SummaryStats {
        let active = &self.data[..count.min(self.data.len())];
        if active.is_empty() {
            return SummaryStats::Empty;
        }
        if T::TYPE.is_categorical() {
            let ones = active.iter().filter(|v| v.to_f64() != 0.0).count();
            return SummaryStats::Categorical {
                levels: vec![(0, active.len() - ones), (1, ones)],
            };
        }
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0_f64;
        for v in active {
            let x = v.to_f64();
            min = min.min(x);
            max = max.max(x);
            sum += x;
        }
        SummaryStats::Numeric { min, max, mean: sum / active.len() as f64 }
    }

    fn encode_data(&self, out: &mut Vec<u8>) {
        out.reserve(self.data.len() * T::TYPE.size());
        for &v in &self.data {
            v.encode(out);
        }
    }

    fn encode_default(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(T::TYPE.size());
        self.default.encode(&mut out);
        out
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
