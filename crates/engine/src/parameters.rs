//! Typed parameter metadata
//!
//! Each parameter lives in its own sub-group `parameters/<name>` carrying
//! three attributes: `value`, the `dtype` kind tag and `units`. Older files
//! stored simple parameters as flat attributes directly on the `parameters`
//! group; those read back as bare, unitless values.
//!
//! The kind of a value is decided once, when the caller converts it into a
//! [`ParamValue`]. Anything without a dedicated kind goes through
//! [`ParamValue::Compound`] and is stored as JSON text.

use datachest_core::names;
use datachest_core::{Complex32, Complex64, Error, NameKind, Result, Value};
use tracing::debug;

use crate::dataset::{Dataset, PARAMETERS_GROUP};

const ATTR_VALUE: &str = "value";
const ATTR_DTYPE: &str = "dtype";
const ATTR_UNITS: &str = "units";

/// Storable parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Unsigned integer
    UInt(u64),
    /// Float
    Float(f64),
    /// Complex number
    Complex(Complex64),
    /// Text
    String(String),
    /// Homogeneous integer array
    IntArray(Vec<i64>),
    /// Homogeneous float array
    FloatArray(Vec<f64>),
    /// Homogeneous complex array
    ComplexArray(Vec<Complex64>),
    /// Anything else, stored as JSON
    Compound(serde_json::Value),
}

impl ParamValue {
    /// Kind tag stored next to the value
    pub fn tag(&self) -> &'static str {
        match self {
            ParamValue::Bool(_) => "bool",
            ParamValue::Int(_) => "int",
            ParamValue::UInt(_) => "uint",
            ParamValue::Float(_) => "float",
            ParamValue::Complex(_) => "complex",
            ParamValue::String(_) => "string",
            ParamValue::IntArray(_) => "int_array",
            ParamValue::FloatArray(_) => "float_array",
            ParamValue::ComplexArray(_) => "complex_array",
            ParamValue::Compound(_) => "compound",
        }
    }

    fn to_stored(&self) -> Result<Value> {
        let value = match self {
            ParamValue::Bool(b) => Value::Bool(*b),
            ParamValue::Int(i) => Value::Int64(*i),
            ParamValue::UInt(u) => Value::UInt64(*u),
            ParamValue::Float(f) => Value::Float64(*f),
            ParamValue::Complex(c) => Value::Complex128(*c),
            ParamValue::String(s) => Value::String(s.clone()),
            ParamValue::IntArray(v) => Value::Array(v.iter().map(|x| Value::Int64(*x)).collect()),
            ParamValue::FloatArray(v) => {
                Value::Array(v.iter().map(|x| Value::Float64(*x)).collect())
            }
            ParamValue::ComplexArray(v) => {
                Value::Array(v.iter().map(|x| Value::Complex128(*x)).collect())
            }
            ParamValue::Compound(json) => Value::String(
                serde_json::to_string(json).map_err(|e| Error::Serialization(e.to_string()))?,
            ),
        };
        Ok(value)
    }

    fn from_stored(tag: &str, value: &Value) -> Option<ParamValue> {
        let decoded = match tag {
            "bool" => ParamValue::Bool(value.as_bool()?),
            "int" => ParamValue::Int(i64::try_from(value.as_i128()?).ok()?),
            "uint" => ParamValue::UInt(u64::try_from(value.as_i128()?).ok()?),
            "float" => ParamValue::Float(value.as_f64()?),
            "complex" => ParamValue::Complex(value.as_complex()?),
            "string" => ParamValue::String(value.as_str()?.to_string()),
            "int_array" => ParamValue::IntArray(
                value
                    .as_array()?
                    .iter()
                    .map(|v| v.as_i128().and_then(|i| i64::try_from(i).ok()))
                    .collect::<Option<Vec<i64>>>()?,
            ),
            "float_array" => ParamValue::FloatArray(
                value
                    .as_array()?
                    .iter()
                    .map(Value::as_f64)
                    .collect::<Option<Vec<f64>>>()?,
            ),
            "complex_array" => ParamValue::ComplexArray(
                value
                    .as_array()?
                    .iter()
                    .map(Value::as_complex)
                    .collect::<Option<Vec<Complex64>>>()?,
            ),
            "compound" => ParamValue::Compound(serde_json::from_str(value.as_str()?).ok()?),
            _ => return None,
        };
        Some(decoded)
    }

    /// Interpret an untagged legacy attribute
    fn from_legacy(value: &Value) -> Option<ParamValue> {
        let decoded = match value {
            Value::Bool(b) => ParamValue::Bool(*b),
            Value::Int8(_) | Value::Int16(_) | Value::Int32(_) | Value::Int64(_) => {
                ParamValue::Int(i64::try_from(value.as_i128()?).ok()?)
            }
            Value::UInt8(_) | Value::UInt16(_) | Value::UInt32(_) | Value::UInt64(_) => {
                ParamValue::UInt(u64::try_from(value.as_i128()?).ok()?)
            }
            Value::Float16(_) | Value::Float32(_) | Value::Float64(_) => {
                ParamValue::Float(value.as_f64()?)
            }
            Value::Complex64(_) | Value::Complex128(_) => ParamValue::Complex(value.as_complex()?),
            Value::String(s) => ParamValue::String(s.clone()),
            Value::DateTime(dt) => ParamValue::String(dt.to_rfc3339()),
            Value::Array(items) => {
                let leaves = value.leaves();
                if leaves.len() == items.len() && leaves.iter().all(|v| v.as_i128().is_some()) {
                    ParamValue::from_stored("int_array", value)?
                } else if leaves.len() == items.len() && leaves.iter().all(|v| v.as_f64().is_some()) {
                    ParamValue::from_stored("float_array", value)?
                } else if leaves.len() == items.len()
                    && leaves.iter().all(|v| v.as_complex().is_some())
                {
                    ParamValue::from_stored("complex_array", value)?
                } else {
                    return None;
                }
            }
        };
        Some(decoded)
    }
}

macro_rules! impl_from_param {
    ($($ty:ty => |$v:ident| $body:expr),* $(,)?) => {
        $(
            impl From<$ty> for ParamValue {
                fn from($v: $ty) -> Self {
                    $body
                }
            }
        )*
    };
}

impl_from_param! {
    bool => |v| ParamValue::Bool(v),
    i8 => |v| ParamValue::Int(v as i64),
    i16 => |v| ParamValue::Int(v as i64),
    i32 => |v| ParamValue::Int(v as i64),
    i64 => |v| ParamValue::Int(v),
    u8 => |v| ParamValue::UInt(v as u64),
    u16 => |v| ParamValue::UInt(v as u64),
    u32 => |v| ParamValue::UInt(v as u64),
    u64 => |v| ParamValue::UInt(v),
    f32 => |v| ParamValue::Float(v as f64),
    f64 => |v| ParamValue::Float(v),
    Complex32 => |v| ParamValue::Complex(Complex64::new(v.re as f64, v.im as f64)),
    Complex64 => |v| ParamValue::Complex(v),
    &str => |v| ParamValue::String(v.to_string()),
    String => |v| ParamValue::String(v),
    Vec<i64> => |v| ParamValue::IntArray(v),
    Vec<i32> => |v| ParamValue::IntArray(v.into_iter().map(i64::from).collect()),
    Vec<f64> => |v| ParamValue::FloatArray(v),
    Vec<f32> => |v| ParamValue::FloatArray(v.into_iter().map(f64::from).collect()),
    Vec<Complex64> => |v| ParamValue::ComplexArray(v),
    serde_json::Value => |v| ParamValue::Compound(v),
}

/// A parameter as read back
#[derive(Debug, Clone, PartialEq)]
pub enum ParamEntry {
    /// Value stored without units
    Bare(ParamValue),
    /// Value with its units
    WithUnits(ParamValue, String),
}

impl ParamEntry {
    fn new(value: ParamValue, units: String) -> Self {
        if units.is_empty() {
            ParamEntry::Bare(value)
        } else {
            ParamEntry::WithUnits(value, units)
        }
    }

    /// The value, units aside
    pub fn value(&self) -> &ParamValue {
        match self {
            ParamEntry::Bare(value) | ParamEntry::WithUnits(value, _) => value,
        }
    }

    /// Units, empty for bare entries
    pub fn units(&self) -> &str {
        match self {
            ParamEntry::Bare(_) => "",
            ParamEntry::WithUnits(_, units) => units,
        }
    }
}

fn param_path(name: &str) -> String {
    format!("{}/{}", PARAMETERS_GROUP, name)
}

impl Dataset {
    fn legacy_parameter(&self, name: &str) -> Option<&Value> {
        self.container.attr(PARAMETERS_GROUP, name)
    }

    fn has_parameter_group(&self, name: &str) -> bool {
        self.container.group(&param_path(name)).is_some()
    }

    /// Store a parameter
    ///
    /// Fails with a state error on read-only handles, with
    /// [`Error::InvalidName`] when `name` is outside the parameter charset and
    /// with [`Error::AlreadyExists`] when the parameter exists and `overwrite`
    /// is not set. Overwriting a legacy flat parameter keeps it flat, so it
    /// cannot take units.
    pub fn add_parameter(
        &mut self,
        name: &str,
        value: impl Into<ParamValue>,
        units: &str,
        overwrite: bool,
    ) -> Result<()> {
        self.ensure_writable()?;
        names::validate(NameKind::Parameter, name)?;
        let value = value.into();
        let legacy = self.legacy_parameter(name).is_some();
        let grouped = self.has_parameter_group(name);

        if (legacy || grouped) && !overwrite {
            return Err(Error::AlreadyExists(format!(
                "parameter {:?}; pass overwrite to replace it",
                name
            )));
        }

        let stored = value.to_stored()?;
        if legacy {
            if !units.is_empty() {
                return Err(Error::State(format!(
                    "parameter {:?} is a legacy flat parameter and cannot carry units",
                    name
                )));
            }
            self.container.set_attr(PARAMETERS_GROUP, name, stored)?;
        } else {
            let path = param_path(name);
            if !grouped {
                self.container.create_group(&path)?;
            }
            self.container.set_attrs(
                &path,
                [
                    (ATTR_VALUE, stored),
                    (ATTR_DTYPE, Value::from(value.tag())),
                    (ATTR_UNITS, Value::from(units)),
                ],
            )?;
        }
        self.finish_write(Vec::new())?;

        debug!(file = %self.file_name, parameter = name, kind = value.tag(), "stored parameter");
        Ok(())
    }

    /// Read a parameter, failing with [`Error::NotFound`] when it is absent
    pub fn get_parameter(&self, name: &str) -> Result<ParamEntry> {
        self.try_get_parameter(name)?
            .ok_or_else(|| Error::NotFound(format!("parameter {:?}", name)))
    }

    /// Read a parameter, returning `None` when it is absent
    pub fn try_get_parameter(&self, name: &str) -> Result<Option<ParamEntry>> {
        self.touch();
        if let Some(value) = self.legacy_parameter(name) {
            let decoded = ParamValue::from_legacy(value).ok_or_else(|| {
                Error::Storage(format!("legacy parameter {:?} has an unreadable value", name))
            })?;
            return Ok(Some(ParamEntry::Bare(decoded)));
        }

        let path = param_path(name);
        let attrs = match self.container.group(&path) {
            Some(group) => group.attrs(),
            None => return Ok(None),
        };
        let tag = attrs
            .get(ATTR_DTYPE)
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Storage(format!("parameter {:?} has no kind tag", name)))?;
        let value = attrs
            .get(ATTR_VALUE)
            .and_then(|v| ParamValue::from_stored(tag, v))
            .ok_or_else(|| {
                Error::Storage(format!(
                    "parameter {:?} does not decode as its tagged kind {:?}",
                    name, tag
                ))
            })?;
        let units = attrs
            .get(ATTR_UNITS)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Ok(Some(ParamEntry::new(value, units)))
    }

    /// Names of every parameter, legacy ones included, sorted case-insensitively
    pub fn get_parameter_list(&self) -> Vec<String> {
        self.touch();
        let mut list: Vec<String> = Vec::new();
        if let Some(group) = self.container.group(PARAMETERS_GROUP) {
            list.extend(group.attrs().keys().cloned());
            list.extend(group.group_names().into_iter().map(str::to_string));
        }
        list.sort_by_key(|s| s.to_lowercase());
        list.dedup();
        list
    }

    fn grouped_parameter_path(&self, name: &str) -> Result<String> {
        if self.has_parameter_group(name) {
            return Ok(param_path(name));
        }
        if self.legacy_parameter(name).is_some() {
            return Err(Error::State(format!(
                "parameter {:?} is a legacy flat parameter without units",
                name
            )));
        }
        Err(Error::NotFound(format!("parameter {:?}", name)))
    }

    /// Replace the units of a parameter
    pub fn set_parameter_units(&mut self, name: &str, units: &str) -> Result<()> {
        self.ensure_writable()?;
        let path = self.grouped_parameter_path(name)?;
        self.container
            .set_attr(&path, ATTR_UNITS, Value::from(units))?;
        self.finish_write(Vec::new())?;
        debug!(file = %self.file_name, parameter = name, units, "set parameter units");
        Ok(())
    }

    /// Units of a parameter
    pub fn get_parameter_units(&self, name: &str) -> Result<String> {
        self.touch();
        let path = self.grouped_parameter_path(name)?;
        Ok(self
            .container
            .attr(&path, ATTR_UNITS)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }
}
