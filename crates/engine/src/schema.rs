//! Variable declarations, category classification and unique filenames
//!
//! Declarations arrive from callers as loose `(name, shape, dtype, units)`
//! tuples. [`validate_variables`] turns them into a [`VariableGroup`] whose
//! shapes and dtypes are canonical, and [`classify`] derives the dataset's
//! structural [`Category`] from those shapes. Both run once, at creation.

use datachest_core::names;
use datachest_core::{DType, Error, NameKind, Result, Shape, Value};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Maximum number of filename candidates tried before giving up
pub const MAX_NAME_ATTEMPTS: usize = 100;

/// A variable as a caller declares it
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDecl {
    /// Column name
    pub name: String,
    /// Declared cell shape; `[1]` for scalars
    pub shape: Vec<i64>,
    /// Dtype name, e.g. `"float64"`
    pub dtype: String,
    /// Free-form units, possibly empty
    pub units: String,
}

impl VariableDecl {
    /// Build a declaration
    pub fn new(
        name: impl Into<String>,
        shape: &[i64],
        dtype: impl Into<String>,
        units: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            shape: shape.to_vec(),
            dtype: dtype.into(),
            units: units.into(),
        }
    }
}

/// A validated variable
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    /// Column name
    pub name: String,
    /// Canonical declared shape
    pub shape: Shape,
    /// Element dtype
    pub dtype: DType,
    /// Units, possibly empty
    pub units: String,
}

/// Which variable group a declaration belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    /// Nominal inputs (time, swept parameters)
    Independent,
    /// Measured outputs
    Dependent,
}

impl VariableKind {
    /// Name of the container group holding this kind
    pub fn group_name(&self) -> &'static str {
        match self {
            VariableKind::Independent => "independents",
            VariableKind::Dependent => "dependents",
        }
    }
}

impl fmt::Display for VariableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableKind::Independent => f.write_str("independent"),
            VariableKind::Dependent => f.write_str("dependent"),
        }
    }
}

/// Validated, ordered variables of one kind
#[derive(Debug, Clone, PartialEq)]
pub struct VariableGroup {
    kind: VariableKind,
    variables: Vec<Variable>,
}

impl VariableGroup {
    /// Wrap already validated variables
    pub fn new(kind: VariableKind, variables: Vec<Variable>) -> Self {
        Self { kind, variables }
    }

    /// Group kind
    pub fn kind(&self) -> VariableKind {
        self.kind
    }

    /// Variables in declaration order
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Number of variables
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Check if the group has no variables
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Variable names
    pub fn names(&self) -> Vec<&str> {
        self.variables.iter().map(|v| v.name.as_str()).collect()
    }

    /// Declared shapes
    pub fn shapes(&self) -> Vec<&Shape> {
        self.variables.iter().map(|v| &v.shape).collect()
    }

    /// Dtypes
    pub fn dtypes(&self) -> Vec<DType> {
        self.variables.iter().map(|v| v.dtype).collect()
    }

    /// Units
    pub fn units(&self) -> Vec<&str> {
        self.variables.iter().map(|v| v.units.as_str()).collect()
    }

    /// Variable by name
    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }
}

/// Validate declarations of one kind
///
/// Rejects an empty list, illegal names (with a suggested correction),
/// duplicate names, non-positive dimensions and unsupported dtypes.
pub fn validate_variables(kind: VariableKind, decls: &[VariableDecl]) -> Result<VariableGroup> {
    if decls.is_empty() {
        return Err(Error::Schema(format!(
            "at least one {} variable is required",
            kind
        )));
    }

    let mut seen = HashSet::new();
    let mut variables = Vec::with_capacity(decls.len());
    for decl in decls {
        names::validate(NameKind::Variable, &decl.name)?;
        if !seen.insert(decl.name.as_str()) {
            return Err(Error::Schema(format!(
                "duplicate {} variable name {:?}",
                kind, decl.name
            )));
        }
        let shape = Shape::from_dims(&decl.shape).map_err(|e| match e {
            Error::Schema(msg) => Error::Schema(format!("variable {:?}: {}", decl.name, msg)),
            other => other,
        })?;
        let dtype: DType = decl.dtype.parse()?;
        variables.push(Variable {
            name: decl.name.clone(),
            shape,
            dtype,
            units: decl.units.clone(),
        });
    }
    Ok(VariableGroup::new(kind, variables))
}

/// Structural category of a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Every variable is a scalar
    ArbitraryScalar,
    /// Every variable shares one non-scalar shape
    ArbitraryArray,
    /// One `[start, stop]` independent swept against array dependents
    OneDScan,
    /// One scalar and one `[start, stop]` independent against array dependents
    TwoDScan,
    /// Anything else
    Other,
}

impl Category {
    /// Stored name of the category
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::ArbitraryScalar => "Arbitrary Type 1",
            Category::ArbitraryArray => "Arbitrary Type 2",
            Category::OneDScan => "1D Scan",
            Category::TwoDScan => "2D Scan",
            Category::Other => "Other",
        }
    }

    /// Parse a stored category name
    pub fn parse(s: &str) -> Option<Category> {
        match s {
            "Arbitrary Type 1" => Some(Category::ArbitraryScalar),
            "Arbitrary Type 2" => Some(Category::ArbitraryArray),
            "1D Scan" => Some(Category::OneDScan),
            "2D Scan" => Some(Category::TwoDScan),
            "Other" => Some(Category::Other),
            _ => None,
        }
    }

    /// Check if this is one of the scan categories
    pub fn is_scan(&self) -> bool {
        matches!(self, Category::OneDScan | Category::TwoDScan)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Category::parse(s).ok_or_else(|| Error::Storage(format!("unknown data category {:?}", s)))
    }
}

/// Flat length shared by every dependent, if there is one and it is at least 2
fn shared_flat_len(shapes: &[Shape]) -> Option<usize> {
    let first = shapes.first()?.flat_len();
    if first >= 2 && shapes.iter().all(|s| s.flat_len() == first) {
        Some(first)
    } else {
        None
    }
}

/// Classify a dataset from its declared shapes
///
/// The rules are tested in order; the first that holds wins.
pub fn classify(indeps: &[Shape], deps: &[Shape]) -> Category {
    let mut all = indeps.iter().chain(deps.iter());
    let first = match all.clone().next() {
        Some(first) => first,
        None => return Category::Other,
    };

    if all.clone().all(Shape::is_scalar) {
        return Category::ArbitraryScalar;
    }
    if all.all(|s| s == first) {
        return Category::ArbitraryArray;
    }
    if indeps.len() == 1 && indeps[0].is_range() && shared_flat_len(deps).is_some() {
        return Category::OneDScan;
    }
    if indeps.len() == 2 && shared_flat_len(deps).is_some() {
        let (a, b) = (&indeps[0], &indeps[1]);
        if (a.is_scalar() && b.is_range()) || (a.is_range() && b.is_scalar()) {
            return Category::TwoDScan;
        }
    }
    Category::Other
}

/// Classify validated variable groups
pub fn classify_groups(indeps: &VariableGroup, deps: &VariableGroup) -> Category {
    let i: Vec<Shape> = indeps.shapes().into_iter().cloned().collect();
    let d: Vec<Shape> = deps.shapes().into_iter().cloned().collect();
    classify(&i, &d)
}

/// Pick a filename for `base` that is not in `existing`
///
/// Candidates are `<token>_<base>.<ext>` followed by `<token>_<n>_<base>.<ext>`
/// for `n = 1, 2, ...`; comparison is case-insensitive. Fails with
/// [`Error::UniquenessExhausted`] after [`MAX_NAME_ATTEMPTS`] candidates.
pub fn unique_name(existing: &[String], base: &str, token: &str, extension: &str) -> Result<String> {
    let taken: HashSet<String> = existing.iter().map(|s| s.to_lowercase()).collect();
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let candidate = if attempt == 0 {
            format!("{}_{}.{}", token, base, extension)
        } else {
            format!("{}_{}_{}.{}", token, attempt, base, extension)
        };
        if !taken.contains(&candidate.to_lowercase()) {
            return Ok(candidate);
        }
    }
    Err(Error::UniquenessExhausted {
        base: base.to_string(),
        attempts: MAX_NAME_ATTEMPTS,
    })
}

/// Encode a variable group into its four descriptor attributes
///
/// Returns `(names, shapes, types, units)`; shapes are stored structurally
/// as arrays of unsigned dimensions.
pub fn encode_descriptor(group: &VariableGroup) -> [(&'static str, Value); 4] {
    let names = group
        .variables()
        .iter()
        .map(|v| Value::from(v.name.as_str()))
        .collect();
    let shapes = group
        .variables()
        .iter()
        .map(|v| Value::Array(v.shape.dims().iter().map(|d| Value::UInt64(*d as u64)).collect()))
        .collect();
    let types = group
        .variables()
        .iter()
        .map(|v| Value::from(v.dtype.name()))
        .collect();
    let units = group
        .variables()
        .iter()
        .map(|v| Value::from(v.units.as_str()))
        .collect();
    [
        ("names", Value::Array(names)),
        ("shapes", Value::Array(shapes)),
        ("types", Value::Array(types)),
        ("units", Value::Array(units)),
    ]
}

fn string_list(attr: Option<&Value>, what: &str) -> Result<Vec<String>> {
    let items = attr
        .and_then(Value::as_array)
        .ok_or_else(|| Error::Storage(format!("missing or malformed {} descriptor", what)))?;
    items
        .iter()
        .map(|v| {
            v.as_str()
                .map(str::to_string)
                .ok_or_else(|| Error::Storage(format!("non-string entry in {} descriptor", what)))
        })
        .collect()
}

/// Decode one stored shape descriptor entry
///
/// Current files store an array of dimensions; older files stored the
/// shape as text such as `"[5]"` or `"(2, 3)"`. Both normalize to [`Shape`].
pub fn decode_shape(entry: &Value) -> Result<Shape> {
    match entry {
        Value::Array(dims) => {
            let dims: Option<Vec<i64>> = dims
                .iter()
                .map(|d| d.as_i128().and_then(|d| i64::try_from(d).ok()))
                .collect();
            let dims = dims.ok_or_else(|| {
                Error::Storage(format!("non-integer dimension in shape {:?}", entry))
            })?;
            Shape::from_dims(&dims)
        }
        Value::String(text) => {
            warn!(shape = %text, "decoding legacy textual shape");
            Shape::parse_text(text)
        }
        other => Shape::from_dims(&[other
            .as_i128()
            .and_then(|d| i64::try_from(d).ok())
            .ok_or_else(|| Error::Storage(format!("malformed shape {:?}", other)))?]),
    }
}

/// Rebuild a variable group from its stored descriptor attributes
///
/// `attr` looks up one descriptor attribute by name.
pub fn decode_descriptor<'a, F>(kind: VariableKind, attr: F) -> Result<VariableGroup>
where
    F: Fn(&str) -> Option<&'a Value>,
{
    let names = string_list(attr("names"), "names")?;
    let types = string_list(attr("types"), "types")?;
    let units = string_list(attr("units"), "units")?;
    let shapes = attr("shapes")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::Storage("missing or malformed shapes descriptor".to_string()))?;

    if types.len() != names.len() || units.len() != names.len() || shapes.len() != names.len() {
        return Err(Error::Storage(format!(
            "{} descriptor lists have different lengths",
            kind
        )));
    }

    let mut variables = Vec::with_capacity(names.len());
    for (((name, dtype), units), shape) in names.into_iter().zip(types).zip(units).zip(shapes) {
        let dtype = DType::parse(&dtype)
            .ok_or_else(|| Error::Storage(format!("unknown stored dtype {:?}", dtype)))?;
        variables.push(Variable {
            name,
            shape: decode_shape(shape)?,
            dtype,
            units,
        });
    }
    Ok(VariableGroup::new(kind, variables))
}
