//! Declared cell shapes
//!
//! A [`Shape`] is the canonical in-memory form of a variable's declared
//! shape: a non-empty list of positive dimensions. `[1]` denotes a scalar
//! cell. Stored arrays are always flat; the shape is reshape metadata only.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Non-empty list of positive dimensions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape(Vec<usize>);

impl Shape {
    /// The scalar shape `[1]`
    pub fn scalar() -> Self {
        Shape(vec![1])
    }

    /// Build a shape from signed dimensions, rejecting empty or non-positive input
    pub fn from_dims(dims: &[i64]) -> Result<Self> {
        if dims.is_empty() {
            return Err(Error::Schema(
                "shapes cannot be empty; use [1] for a scalar".to_string(),
            ));
        }
        let mut out = Vec::with_capacity(dims.len());
        for &dim in dims {
            if dim <= 0 {
                return Err(Error::Schema(format!(
                    "shape {:?} has a zero or negative dimension",
                    dims
                )));
            }
            out.push(dim as usize);
        }
        Ok(Shape(out))
    }

    /// Parse the textual encoding older files used, e.g. `"[5]"`, `"(2, 3)"`, `"[5L]"`
    pub fn parse_text(text: &str) -> Result<Self> {
        let trimmed = text
            .trim()
            .trim_start_matches(['[', '('])
            .trim_end_matches([']', ')']);
        let mut dims = Vec::new();
        for part in trimmed.split(',') {
            let part = part.trim().trim_end_matches(['L', 'l']);
            if part.is_empty() {
                continue;
            }
            let dim: i64 = part
                .parse()
                .map_err(|_| Error::Schema(format!("unparseable shape text {:?}", text)))?;
            dims.push(dim);
        }
        Self::from_dims(&dims)
    }

    /// Dimensions
    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    /// Number of scalar slots one cell of this shape occupies
    pub fn flat_len(&self) -> usize {
        self.0.iter().product()
    }

    /// Check if this is the scalar shape `[1]`
    pub fn is_scalar(&self) -> bool {
        self.0 == [1]
    }

    /// Check if this is the range shape `[2]` used by scan independents
    pub fn is_range(&self) -> bool {
        self.0 == [2]
    }

    /// Check if a value of inferred shape `actual` fits this declared shape
    ///
    /// A bare scalar matches `[1]`.
    pub fn matches(&self, actual: &[usize]) -> bool {
        if actual.is_empty() {
            return self.is_scalar();
        }
        self.0 == actual
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Shape(dims)
    }
}
