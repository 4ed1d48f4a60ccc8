//! Row retrieval
//!
//! Bounds follow "negative counts from the end" semantics and stored flat
//! arrays are reshaped back to each variable's declared shape.

use datachest_core::{Error, Result, Value};

use crate::dataset::{array_path, Dataset};
use crate::schema::{Category, Variable, VariableKind};

/// Result of [`Dataset::get_data`]
#[derive(Debug, Clone, PartialEq)]
pub enum DataBlock {
    /// One entry per row, each holding one cell per requested variable
    Rows(Vec<Vec<Value>>),
    /// One flat array per requested variable covering every requested row;
    /// returned for `Arbitrary Type 2` datasets
    Columns(Vec<Value>),
}

impl DataBlock {
    /// Row-major view, if this block holds rows
    pub fn rows(&self) -> Option<&[Vec<Value>]> {
        match self {
            DataBlock::Rows(rows) => Some(rows),
            DataBlock::Columns(_) => None,
        }
    }

    /// Column-major view, if this block holds columns
    pub fn columns(&self) -> Option<&[Value]> {
        match self {
            DataBlock::Columns(columns) => Some(columns),
            DataBlock::Rows(_) => None,
        }
    }

    /// Check if no data was returned
    pub fn is_empty(&self) -> bool {
        match self {
            DataBlock::Rows(rows) => rows.is_empty(),
            DataBlock::Columns(columns) => columns
                .iter()
                .all(|c| c.as_array().map_or(true, <[Value]>::is_empty)),
        }
    }
}

/// Resolve optional, possibly negative bounds against `rows`
///
/// Omitted `start` is 0 and omitted `stop` is `rows`; a negative value means
/// `rows - |value|`; a `start` without `stop` selects exactly one row.
pub fn resolve_bounds(start: Option<i64>, stop: Option<i64>, rows: u64) -> Result<(u64, u64)> {
    let n = rows as i64;
    let resolve = |v: i64| if v < 0 { n + v } else { v };
    let (s, e) = match (start, stop) {
        (None, None) => (0, n),
        (Some(s), None) => {
            let s = resolve(s);
            (s, s.saturating_add(1))
        }
        (None, Some(e)) => (0, resolve(e)),
        (Some(s), Some(e)) => (resolve(s), resolve(e)),
    };
    if s < 0 || e < s || e > n {
        return Err(Error::IndexRange { start, stop, rows });
    }
    Ok((s as u64, e as u64))
}

impl Dataset {
    /// Requested variables in request order; unknown names are dropped
    pub(crate) fn select_variables(
        &self,
        names: Option<&[&str]>,
    ) -> Vec<(VariableKind, &Variable)> {
        match names {
            None => self.all_variables().collect(),
            Some(names) => names
                .iter()
                .filter_map(|name| self.all_variables().find(|(_, v)| v.name == *name))
                .collect(),
        }
    }

    pub(crate) fn read_cells(
        &self,
        kind: VariableKind,
        var: &Variable,
        range: std::ops::Range<u64>,
    ) -> Result<Vec<Value>> {
        let path = array_path(kind, &var.name);
        let array = self
            .container
            .array(&path)
            .ok_or_else(|| Error::Storage(format!("missing array {}", path)))?;
        let flat = var.shape.flat_len();
        let cells = range
            .map(|row| {
                let at = row as usize * flat;
                Value::reshape(array.data().slice(at..at + flat), var.shape.dims())
            })
            .collect();
        Ok(cells)
    }

    /// Read rows `[start, stop)` of the requested variables
    ///
    /// `variables` restricts and orders the returned cells; names that are
    /// not stored are ignored. Fails with [`Error::IndexRange`] when the
    /// bounds do not resolve inside the stored rows.
    pub fn get_data(
        &self,
        start: Option<i64>,
        stop: Option<i64>,
        variables: Option<&[&str]>,
    ) -> Result<DataBlock> {
        self.touch();
        let (s, e) = resolve_bounds(start, stop, self.readable_rows())?;
        let selected = self.select_variables(variables);

        if self.category == Category::ArbitraryArray {
            let mut columns = Vec::with_capacity(selected.len());
            for (kind, var) in selected {
                let path = array_path(kind, &var.name);
                let array = self
                    .container
                    .array(&path)
                    .ok_or_else(|| Error::Storage(format!("missing array {}", path)))?;
                let flat = var.shape.flat_len();
                let values = array
                    .data()
                    .slice(s as usize * flat..e as usize * flat);
                columns.push(Value::Array(values));
            }
            return Ok(DataBlock::Columns(columns));
        }

        let mut per_var = Vec::with_capacity(selected.len());
        for (kind, var) in &selected {
            per_var.push(self.read_cells(*kind, var, s..e)?.into_iter());
        }
        let rows = (s..e)
            .map(|_| per_var.iter_mut().filter_map(|cells| cells.next()).collect())
            .collect();
        Ok(DataBlock::Rows(rows))
    }
}
