//! Typed, flat column storage
//!
//! [`ArrayData`] holds one contiguous vector per dtype. It is both the
//! in-memory form of a stored array and the payload of an extension record.
//! `utc_datetime` columns hold microseconds since the Unix epoch.

use datachest_core::value::{datetime_to_micros, micros_to_datetime};
use datachest_core::{DType, Value};
use half::f16;
use num_complex::{Complex32, Complex64};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Flat typed column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArrayData {
    /// Booleans
    Bool(Vec<bool>),
    /// 8-bit signed integers
    Int8(Vec<i8>),
    /// 16-bit signed integers
    Int16(Vec<i16>),
    /// 32-bit signed integers
    Int32(Vec<i32>),
    /// 64-bit signed integers
    Int64(Vec<i64>),
    /// 8-bit unsigned integers
    UInt8(Vec<u8>),
    /// 16-bit unsigned integers
    UInt16(Vec<u16>),
    /// 32-bit unsigned integers
    UInt32(Vec<u32>),
    /// 64-bit unsigned integers
    UInt64(Vec<u64>),
    /// Half precision floats
    Float16(Vec<f16>),
    /// Single precision floats
    Float32(Vec<f32>),
    /// Double precision floats
    Float64(Vec<f64>),
    /// Single precision complex
    Complex64(Vec<Complex32>),
    /// Double precision complex
    Complex128(Vec<Complex64>),
    /// Microseconds since the Unix epoch
    DateTime(Vec<i64>),
    /// UTF-8 strings
    String(Vec<String>),
}

macro_rules! dispatch {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            ArrayData::Bool($v) => $body,
            ArrayData::Int8($v) => $body,
            ArrayData::Int16($v) => $body,
            ArrayData::Int32($v) => $body,
            ArrayData::Int64($v) => $body,
            ArrayData::UInt8($v) => $body,
            ArrayData::UInt16($v) => $body,
            ArrayData::UInt32($v) => $body,
            ArrayData::UInt64($v) => $body,
            ArrayData::Float16($v) => $body,
            ArrayData::Float32($v) => $body,
            ArrayData::Float64($v) => $body,
            ArrayData::Complex64($v) => $body,
            ArrayData::Complex128($v) => $body,
            ArrayData::DateTime($v) => $body,
            ArrayData::String($v) => $body,
        }
    };
}

impl ArrayData {
    /// Empty column of `dtype`
    pub fn empty(dtype: DType) -> Self {
        Self::with_capacity(dtype, 0)
    }

    /// Empty column of `dtype` with reserved capacity
    pub fn with_capacity(dtype: DType, capacity: usize) -> Self {
        match dtype {
            DType::Bool => ArrayData::Bool(Vec::with_capacity(capacity)),
            DType::Int8 => ArrayData::Int8(Vec::with_capacity(capacity)),
            DType::Int16 => ArrayData::Int16(Vec::with_capacity(capacity)),
            DType::Int32 => ArrayData::Int32(Vec::with_capacity(capacity)),
            DType::Int64 => ArrayData::Int64(Vec::with_capacity(capacity)),
            DType::UInt8 => ArrayData::UInt8(Vec::with_capacity(capacity)),
            DType::UInt16 => ArrayData::UInt16(Vec::with_capacity(capacity)),
            DType::UInt32 => ArrayData::UInt32(Vec::with_capacity(capacity)),
            DType::UInt64 => ArrayData::UInt64(Vec::with_capacity(capacity)),
            DType::Float16 => ArrayData::Float16(Vec::with_capacity(capacity)),
            DType::Float32 => ArrayData::Float32(Vec::with_capacity(capacity)),
            DType::Float64 => ArrayData::Float64(Vec::with_capacity(capacity)),
            DType::Complex64 => ArrayData::Complex64(Vec::with_capacity(capacity)),
            DType::Complex128 => ArrayData::Complex128(Vec::with_capacity(capacity)),
            DType::UtcDateTime => ArrayData::DateTime(Vec::with_capacity(capacity)),
            DType::String => ArrayData::String(Vec::with_capacity(capacity)),
        }
    }

    /// Build a column from scalar values, casting each into `dtype`
    ///
    /// Returns the first value that cannot be cast on failure.
    pub fn from_values<'a, I>(dtype: DType, values: I) -> Result<Self, &'a Value>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let iter = values.into_iter();
        let mut data = Self::with_capacity(dtype, iter.size_hint().0);
        for value in iter {
            if !data.push(value) {
                return Err(value);
            }
        }
        Ok(data)
    }

    /// Element dtype
    pub fn dtype(&self) -> DType {
        match self {
            ArrayData::Bool(_) => DType::Bool,
            ArrayData::Int8(_) => DType::Int8,
            ArrayData::Int16(_) => DType::Int16,
            ArrayData::Int32(_) => DType::Int32,
            ArrayData::Int64(_) => DType::Int64,
            ArrayData::UInt8(_) => DType::UInt8,
            ArrayData::UInt16(_) => DType::UInt16,
            ArrayData::UInt32(_) => DType::UInt32,
            ArrayData::UInt64(_) => DType::UInt64,
            ArrayData::Float16(_) => DType::Float16,
            ArrayData::Float32(_) => DType::Float32,
            ArrayData::Float64(_) => DType::Float64,
            ArrayData::Complex64(_) => DType::Complex64,
            ArrayData::Complex128(_) => DType::Complex128,
            ArrayData::DateTime(_) => DType::UtcDateTime,
            ArrayData::String(_) => DType::String,
        }
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        dispatch!(self, v => v.len())
    }

    /// Check if the column holds no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cast `value` into this column's dtype and append it
    ///
    /// Returns false, leaving the column untouched, when the cast is not allowed.
    pub fn push(&mut self, value: &Value) -> bool {
        let Some(cast) = value.cast(self.dtype()) else {
            return false;
        };
        match (self, cast) {
            (ArrayData::Bool(v), Value::Bool(x)) => v.push(x),
            (ArrayData::Int8(v), Value::Int8(x)) => v.push(x),
            (ArrayData::Int16(v), Value::Int16(x)) => v.push(x),
            (ArrayData::Int32(v), Value::Int32(x)) => v.push(x),
            (ArrayData::Int64(v), Value::Int64(x)) => v.push(x),
            (ArrayData::UInt8(v), Value::UInt8(x)) => v.push(x),
            (ArrayData::UInt16(v), Value::UInt16(x)) => v.push(x),
            (ArrayData::UInt32(v), Value::UInt32(x)) => v.push(x),
            (ArrayData::UInt64(v), Value::UInt64(x)) => v.push(x),
            (ArrayData::Float16(v), Value::Float16(x)) => v.push(x),
            (ArrayData::Float32(v), Value::Float32(x)) => v.push(x),
            (ArrayData::Float64(v), Value::Float64(x)) => v.push(x),
            (ArrayData::Complex64(v), Value::Complex64(x)) => v.push(x),
            (ArrayData::Complex128(v), Value::Complex128(x)) => v.push(x),
            (ArrayData::DateTime(v), Value::DateTime(x)) => v.push(datetime_to_micros(&x)),
            (ArrayData::String(v), Value::String(x)) => v.push(x),
            _ => return false,
        }
        true
    }

    /// Append all elements of `other`; false if the dtypes differ
    pub fn append(&mut self, other: ArrayData) -> bool {
        match (self, other) {
            (ArrayData::Bool(a), ArrayData::Bool(b)) => a.extend(b),
            (ArrayData::Int8(a), ArrayData::Int8(b)) => a.extend(b),
            (ArrayData::Int16(a), ArrayData::Int16(b)) => a.extend(b),
            (ArrayData::Int32(a), ArrayData::Int32(b)) => a.extend(b),
            (ArrayData::Int64(a), ArrayData::Int64(b)) => a.extend(b),
            (ArrayData::UInt8(a), ArrayData::UInt8(b)) => a.extend(b),
            (ArrayData::UInt16(a), ArrayData::UInt16(b)) => a.extend(b),
            (ArrayData::UInt32(a), ArrayData::UInt32(b)) => a.extend(b),
            (ArrayData::UInt64(a), ArrayData::UInt64(b)) => a.extend(b),
            (ArrayData::Float16(a), ArrayData::Float16(b)) => a.extend(b),
            (ArrayData::Float32(a), ArrayData::Float32(b)) => a.extend(b),
            (ArrayData::Float64(a), ArrayData::Float64(b)) => a.extend(b),
            (ArrayData::Complex64(a), ArrayData::Complex64(b)) => a.extend(b),
            (ArrayData::Complex128(a), ArrayData::Complex128(b)) => a.extend(b),
            (ArrayData::DateTime(a), ArrayData::DateTime(b)) => a.extend(b),
            (ArrayData::String(a), ArrayData::String(b)) => a.extend(b),
            _ => return false,
        }
        true
    }

    /// Element at `index` as a value
    pub fn get(&self, index: usize) -> Option<Value> {
        let value = match self {
            ArrayData::Bool(v) => Value::Bool(*v.get(index)?),
            ArrayData::Int8(v) => Value::Int8(*v.get(index)?),
            ArrayData::Int16(v) => Value::Int16(*v.get(index)?),
            ArrayData::Int32(v) => Value::Int32(*v.get(index)?),
            ArrayData::Int64(v) => Value::Int64(*v.get(index)?),
            ArrayData::UInt8(v) => Value::UInt8(*v.get(index)?),
            ArrayData::UInt16(v) => Value::UInt16(*v.get(index)?),
            ArrayData::UInt32(v) => Value::UInt32(*v.get(index)?),
            ArrayData::UInt64(v) => Value::UInt64(*v.get(index)?),
            ArrayData::Float16(v) => Value::Float16(*v.get(index)?),
            ArrayData::Float32(v) => Value::Float32(*v.get(index)?),
            ArrayData::Float64(v) => Value::Float64(*v.get(index)?),
            ArrayData::Complex64(v) => Value::Complex64(*v.get(index)?),
            ArrayData::Complex128(v) => Value::Complex128(*v.get(index)?),
            ArrayData::DateTime(v) => Value::DateTime(micros_to_datetime(*v.get(index)?)?),
            ArrayData::String(v) => Value::String(v.get(index)?.clone()),
        };
        Some(value)
    }

    /// Elements in `range` as values; the range is clamped to the column length
    pub fn slice(&self, range: Range<usize>) -> Vec<Value> {
        let end = range.end.min(self.len());
        (range.start.min(end)..end).filter_map(|i| self.get(i)).collect()
    }
}
