//! Value types for DataChest
//!
//! This module defines the closed dtype enumeration every stored column uses
//! and the dynamic [`Value`] that carries cells, rows and parameters across
//! the API boundary.
//!
//! ## Casting Rules
//!
//! A value may be written into a column when its dtype equals the column
//! dtype or widens losslessly into it:
//! - signed integers into wider signed integers
//! - unsigned integers into wider unsigned integers, or strictly wider signed
//! - any integer or narrower float into a float
//! - any integer, or a float of at most half the width, into a complex
//!
//! Booleans, datetimes and strings never convert.

use chrono::{DateTime, TimeZone, Utc};
use half::f16;
use num_complex::{Complex32, Complex64};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Storable element type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DType {
    /// Boolean
    Bool,
    /// 8-bit signed integer
    Int8,
    /// 16-bit signed integer
    Int16,
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// 8-bit unsigned integer
    UInt8,
    /// 16-bit unsigned integer
    UInt16,
    /// 32-bit unsigned integer
    UInt32,
    /// 64-bit unsigned integer
    UInt64,
    /// IEEE-754 half precision
    Float16,
    /// IEEE-754 single precision
    Float32,
    /// IEEE-754 double precision
    Float64,
    /// Complex number of two f32
    Complex64,
    /// Complex number of two f64
    Complex128,
    /// UTC timestamp with microsecond resolution
    UtcDateTime,
    /// UTF-8 string
    String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    Bool,
    Signed(u8),
    Unsigned(u8),
    Float(u8),
    Complex(u8),
    Time,
    Text,
}

impl DType {
    /// Every supported dtype, in declaration order
    pub const ALL: [DType; 16] = [
        DType::Bool,
        DType::Int8,
        DType::Int16,
        DType::Int32,
        DType::Int64,
        DType::UInt8,
        DType::UInt16,
        DType::UInt32,
        DType::UInt64,
        DType::Float16,
        DType::Float32,
        DType::Float64,
        DType::Complex64,
        DType::Complex128,
        DType::UtcDateTime,
        DType::String,
    ];

    /// Canonical name stored in dataset metadata
    pub fn name(&self) -> &'static str {
        match self {
            DType::Bool => "bool",
            DType::Int8 => "int8",
            DType::Int16 => "int16",
            DType::Int32 => "int32",
            DType::Int64 => "int64",
            DType::UInt8 => "uint8",
            DType::UInt16 => "uint16",
            DType::UInt32 => "uint32",
            DType::UInt64 => "uint64",
            DType::Float16 => "float16",
            DType::Float32 => "float32",
            DType::Float64 => "float64",
            DType::Complex64 => "complex64",
            DType::Complex128 => "complex128",
            DType::UtcDateTime => "utc_datetime",
            DType::String => "string",
        }
    }

    /// Parse a canonical name or one of the legacy numpy aliases
    pub fn parse(name: &str) -> Option<DType> {
        let dtype = match name {
            "bool" | "bool_" => DType::Bool,
            "int8" => DType::Int8,
            "int16" => DType::Int16,
            "int32" => DType::Int32,
            "int64" | "int_" => DType::Int64,
            "uint8" => DType::UInt8,
            "uint16" => DType::UInt16,
            "uint32" => DType::UInt32,
            "uint64" => DType::UInt64,
            "float16" => DType::Float16,
            "float32" => DType::Float32,
            "float64" | "float_" => DType::Float64,
            "complex64" => DType::Complex64,
            "complex128" | "complex_" => DType::Complex128,
            "utc_datetime" => DType::UtcDateTime,
            "string" | "str" => DType::String,
            _ => return None,
        };
        Some(dtype)
    }

    fn class(&self) -> Class {
        match self {
            DType::Bool => Class::Bool,
            DType::Int8 => Class::Signed(8),
            DType::Int16 => Class::Signed(16),
            DType::Int32 => Class::Signed(32),
            DType::Int64 => Class::Signed(64),
            DType::UInt8 => Class::Unsigned(8),
            DType::UInt16 => Class::Unsigned(16),
            DType::UInt32 => Class::Unsigned(32),
            DType::UInt64 => Class::Unsigned(64),
            DType::Float16 => Class::Float(16),
            DType::Float32 => Class::Float(32),
            DType::Float64 => Class::Float(64),
            DType::Complex64 => Class::Complex(64),
            DType::Complex128 => Class::Complex(128),
            DType::UtcDateTime => Class::Time,
            DType::String => Class::Text,
        }
    }

    /// Check if this is a boolean, integer, float or complex dtype
    pub fn is_numeric(&self) -> bool {
        !matches!(self.class(), Class::Time | Class::Text)
    }

    /// Check if values of `src` may be stored in a column of this dtype
    pub fn accepts(&self, src: DType) -> bool {
        if *self == src {
            return true;
        }
        match (self.class(), src.class()) {
            (Class::Signed(t), Class::Signed(s)) => s <= t,
            (Class::Signed(t), Class::Unsigned(s)) => s < t,
            (Class::Unsigned(t), Class::Unsigned(s)) => s <= t,
            (Class::Float(_), Class::Signed(_) | Class::Unsigned(_)) => true,
            (Class::Float(t), Class::Float(s)) => s <= t,
            (Class::Complex(_), Class::Signed(_) | Class::Unsigned(_)) => true,
            (Class::Complex(t), Class::Float(s)) => 2 * (s as u16) <= t as u16,
            (Class::Complex(t), Class::Complex(s)) => s <= t,
            _ => false,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DType::parse(s).ok_or_else(|| {
            let valid: Vec<&str> = DType::ALL.iter().map(|d| d.name()).collect();
            Error::Schema(format!(
                "unsupported dtype {:?}; valid dtypes are {}",
                s,
                valid.join(", ")
            ))
        })
    }
}

/// Dynamic DataChest value
///
/// Cells, rows and parameters are all expressed as values. Scalars carry
/// their exact dtype; `Array` nests to express multi-dimensional cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Boolean
    Bool(bool),
    /// 8-bit signed integer
    Int8(i8),
    /// 16-bit signed integer
    Int16(i16),
    /// 32-bit signed integer
    Int32(i32),
    /// 64-bit signed integer
    Int64(i64),
    /// 8-bit unsigned integer
    UInt8(u8),
    /// 16-bit unsigned integer
    UInt16(u16),
    /// 32-bit unsigned integer
    UInt32(u32),
    /// 64-bit unsigned integer
    UInt64(u64),
    /// Half precision float
    Float16(f16),
    /// Single precision float
    Float32(f32),
    /// Double precision float
    Float64(f64),
    /// Single precision complex
    Complex64(Complex32),
    /// Double precision complex
    Complex128(Complex64),
    /// UTC timestamp
    DateTime(DateTime<Utc>),
    /// UTF-8 string
    String(String),
    /// Ordered sequence of values
    Array(Vec<Value>),
}

impl Value {
    /// Dtype of a scalar value; `None` for arrays
    pub fn dtype(&self) -> Option<DType> {
        let dtype = match self {
            Value::Bool(_) => DType::Bool,
            Value::Int8(_) => DType::Int8,
            Value::Int16(_) => DType::Int16,
            Value::Int32(_) => DType::Int32,
            Value::Int64(_) => DType::Int64,
            Value::UInt8(_) => DType::UInt8,
            Value::UInt16(_) => DType::UInt16,
            Value::UInt32(_) => DType::UInt32,
            Value::UInt64(_) => DType::UInt64,
            Value::Float16(_) => DType::Float16,
            Value::Float32(_) => DType::Float32,
            Value::Float64(_) => DType::Float64,
            Value::Complex64(_) => DType::Complex64,
            Value::Complex128(_) => DType::Complex128,
            Value::DateTime(_) => DType::UtcDateTime,
            Value::String(_) => DType::String,
            Value::Array(_) => return None,
        };
        Some(dtype)
    }

    /// Returns the type name as a string (for error messages)
    pub fn type_name(&self) -> &'static str {
        self.dtype().map(|d| d.name()).unwrap_or("array")
    }

    /// Check if this value is an array
    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Try to get as array slice
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Try to get as string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer value widened to i128
    pub fn as_i128(&self) -> Option<i128> {
        let v = match self {
            Value::Int8(v) => *v as i128,
            Value::Int16(v) => *v as i128,
            Value::Int32(v) => *v as i128,
            Value::Int64(v) => *v as i128,
            Value::UInt8(v) => *v as i128,
            Value::UInt16(v) => *v as i128,
            Value::UInt32(v) => *v as i128,
            Value::UInt64(v) => *v as i128,
            _ => return None,
        };
        Some(v)
    }

    /// Integer or float value as f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float16(v) => Some(v.to_f64()),
            Value::Float32(v) => Some(*v as f64),
            Value::Float64(v) => Some(*v),
            other => other.as_i128().map(|v| v as f64),
        }
    }

    /// Any numeric value as a double precision complex
    pub fn as_complex(&self) -> Option<Complex64> {
        match self {
            Value::Complex64(c) => Some(Complex64::new(c.re as f64, c.im as f64)),
            Value::Complex128(c) => Some(*c),
            other => other.as_f64().map(|re| Complex64::new(re, 0.0)),
        }
    }

    /// Shape of this value; scalars have the empty shape
    ///
    /// Returns `None` for ragged arrays (siblings of different shapes).
    pub fn shape(&self) -> Option<Vec<usize>> {
        match self {
            Value::Array(items) => {
                let inner = match items.first() {
                    Some(first) => first.shape()?,
                    None => Vec::new(),
                };
                for item in items.iter().skip(1) {
                    if item.shape()? != inner {
                        return None;
                    }
                }
                let mut shape = Vec::with_capacity(inner.len() + 1);
                shape.push(items.len());
                shape.extend(inner);
                Some(shape)
            }
            _ => Some(Vec::new()),
        }
    }

    /// All scalar leaves in row-major order
    pub fn leaves(&self) -> Vec<&Value> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Value>) {
        match self {
            Value::Array(items) => {
                for item in items {
                    item.collect_leaves(out);
                }
            }
            scalar => out.push(scalar),
        }
    }

    /// Convert a scalar into `target` following the casting rules
    ///
    /// Returns `None` for arrays and for conversions the rules forbid.
    pub fn cast(&self, target: DType) -> Option<Value> {
        let src = self.dtype()?;
        if src == target {
            return Some(self.clone());
        }
        if !target.accepts(src) {
            return None;
        }
        let cast = match target {
            DType::Int8 => Value::Int8(i8::try_from(self.as_i128()?).ok()?),
            DType::Int16 => Value::Int16(i16::try_from(self.as_i128()?).ok()?),
            DType::Int32 => Value::Int32(i32::try_from(self.as_i128()?).ok()?),
            DType::Int64 => Value::Int64(i64::try_from(self.as_i128()?).ok()?),
            DType::UInt8 => Value::UInt8(u8::try_from(self.as_i128()?).ok()?),
            DType::UInt16 => Value::UInt16(u16::try_from(self.as_i128()?).ok()?),
            DType::UInt32 => Value::UInt32(u32::try_from(self.as_i128()?).ok()?),
            DType::UInt64 => Value::UInt64(u64::try_from(self.as_i128()?).ok()?),
            DType::Float16 => Value::Float16(f16::from_f64(self.as_f64()?)),
            DType::Float32 => Value::Float32(self.as_f64()? as f32),
            DType::Float64 => Value::Float64(self.as_f64()?),
            DType::Complex64 => {
                let c = self.as_complex()?;
                Value::Complex64(Complex32::new(c.re as f32, c.im as f32))
            }
            DType::Complex128 => Value::Complex128(self.as_complex()?),
            DType::Bool | DType::UtcDateTime | DType::String => return None,
        };
        Some(cast)
    }

    /// Reshape a flat run of scalars into nested arrays of `shape`
    ///
    /// The shape `[1]` unwraps to the bare scalar. `values.len()` must equal
    /// the product of `shape`.
    pub fn reshape(values: Vec<Value>, shape: &[usize]) -> Value {
        if shape == [1] && values.len() == 1 {
            return values.into_iter().next().unwrap_or(Value::Array(Vec::new()));
        }
        Self::nest(values, shape)
    }

    fn nest(values: Vec<Value>, shape: &[usize]) -> Value {
        match shape {
            [] | [_] => Value::Array(values),
            [outer, rest @ ..] => {
                let stride: usize = rest.iter().product();
                let mut iter = values.into_iter();
                let mut items = Vec::with_capacity(*outer);
                for _ in 0..*outer {
                    let chunk: Vec<Value> = iter.by_ref().take(stride).collect();
                    items.push(Self::nest(chunk, rest));
                }
                Value::Array(items)
            }
        }
    }
}

macro_rules! impl_from_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from_scalar! {
    bool => Bool,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    f16 => Float16,
    f32 => Float32,
    f64 => Float64,
    Complex32 => Complex64,
    Complex64 => Complex128,
    DateTime<Utc> => DateTime,
    String => String,
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Clone + Into<Value>> From<&[T]> for Value {
    fn from(items: &[T]) -> Self {
        Value::Array(items.iter().cloned().map(Into::into).collect())
    }
}

/// Microseconds since the Unix epoch, the on-disk form of `utc_datetime`
pub fn datetime_to_micros(dt: &DateTime<Utc>) -> i64 {
    dt.timestamp_micros()
}

/// Inverse of [`datetime_to_micros`]
pub fn micros_to_datetime(micros: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_micros(micros).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dtype_names_round_trip() {
        for dtype in DType::ALL {
            assert_eq!(DType::parse(dtype.name()), Some(dtype));
        }
    }

    #[test]
    fn test_legacy_aliases() {
        assert_eq!(DType::parse("float_"), Some(DType::Float64));
        assert_eq!(DType::parse("int_"), Some(DType::Int64));
        assert_eq!(DType::parse("bool_"), Some(DType::Bool));
        assert_eq!(DType::parse("complex_"), Some(DType::Complex128));
        assert!("float128".parse::<DType>().is_err());
    }

    #[test]
    fn test_widening_rules() {
        assert!(DType::Float64.accepts(DType::Int32));
        assert!(DType::Float64.accepts(DType::Float32));
        assert!(!DType::Float32.accepts(DType::Float64));
        assert!(DType::Int64.accepts(DType::UInt32));
        assert!(!DType::Int64.accepts(DType::UInt64));
        assert!(!DType::UInt8.accepts(DType::Int8));
        assert!(DType::Complex128.accepts(DType::Float64));
        assert!(!DType::Complex64.accepts(DType::Float64));
        assert!(!DType::String.accepts(DType::Int8));
        assert!(!DType::Bool.accepts(DType::UInt8));
    }

    #[test]
    fn test_cast() {
        assert_eq!(Value::Int32(3).cast(DType::Float64), Some(Value::Float64(3.0)));
        assert_eq!(Value::Float64(1.5).cast(DType::Int64), None);
        assert_eq!(
            Value::Float64(2.0).cast(DType::Complex128),
            Some(Value::Complex128(Complex64::new(2.0, 0.0)))
        );
        assert_eq!(Value::from("x").cast(DType::String), Some(Value::from("x")));
        assert_eq!(Value::from(vec![1.0]).cast(DType::Float64), None);
    }

    #[test]
    fn test_shape_inference() {
        assert_eq!(Value::Float64(1.0).shape(), Some(vec![]));
        assert_eq!(Value::from(vec![1.0, 2.0]).shape(), Some(vec![2]));
        let matrix = Value::from(vec![vec![1, 2, 3], vec![4, 5, 6]]);
        assert_eq!(matrix.shape(), Some(vec![2, 3]));
        let ragged = Value::Array(vec![Value::from(vec![1, 2]), Value::from(vec![3])]);
        assert_eq!(ragged.shape(), None);
    }

    #[test]
    fn test_leaves_are_row_major() {
        let matrix = Value::from(vec![vec![1, 2], vec![3, 4]]);
        let leaves: Vec<i128> = matrix.leaves().iter().filter_map(|v| v.as_i128()).collect();
        assert_eq!(leaves, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_reshape() {
        let flat: Vec<Value> = (0..6).map(Value::Int64).collect();
        let nested = Value::reshape(flat.clone(), &[2, 3]);
        assert_eq!(nested.shape(), Some(vec![2, 3]));
        assert_eq!(nested.leaves().len(), 6);

        assert_eq!(Value::reshape(vec![Value::Int64(7)], &[1]), Value::Int64(7));
        assert_eq!(Value::reshape(flat, &[6]).shape(), Some(vec![6]));
    }

    #[test]
    fn test_datetime_micros() {
        let dt = Utc.with_ymd_and_hms(2020, 5, 17, 12, 30, 0).unwrap();
        let micros = datetime_to_micros(&dt);
        assert_eq!(micros_to_datetime(micros), Some(dt));
    }
}
