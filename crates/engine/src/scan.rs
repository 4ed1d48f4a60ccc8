//! Scan expansion
//!
//! Scan datasets store each swept independent as its `[start, stop]` range.
//! [`Dataset::get_scan_data`] expands those ranges into the points the
//! dependents were measured at.

use datachest_core::{Error, Result, Value};

use crate::dataset::Dataset;
use crate::parameters::ParamValue;
use crate::read::resolve_bounds;
use crate::schema::VariableKind;

/// Parameter naming the point spacing of a scan
pub const SCAN_TYPE_PARAMETER: &str = "Scan Type";

/// Point spacing between a scan's start and stop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanType {
    /// Evenly spaced points
    #[default]
    Linear,
    /// Geometrically spaced points
    Logarithmic,
}

impl ScanType {
    /// Parse a stored scan type; matching is case-insensitive
    pub fn parse(s: &str) -> Option<ScanType> {
        match s.to_ascii_lowercase().as_str() {
            "linear" => Some(ScanType::Linear),
            "logarithmic" | "log" => Some(ScanType::Logarithmic),
            _ => None,
        }
    }

    /// `n` points from `start` to `stop`, both included
    pub fn points(&self, start: f64, stop: f64, n: usize) -> Result<Vec<f64>> {
        if n == 1 {
            return Ok(vec![start]);
        }
        let last = (n - 1) as f64;
        match self {
            ScanType::Linear => Ok((0..n)
                .map(|i| start + (stop - start) * i as f64 / last)
                .collect()),
            ScanType::Logarithmic => {
                if start <= 0.0 || stop <= 0.0 {
                    return Err(Error::State(format!(
                        "logarithmic scan needs positive bounds, got [{}, {}]",
                        start, stop
                    )));
                }
                let ratio = stop / start;
                Ok((0..n)
                    .map(|i| start * ratio.powf(i as f64 / last))
                    .collect())
            }
        }
    }
}

impl Dataset {
    /// Spacing configured by the `Scan Type` parameter, linear by default
    pub fn scan_type(&self) -> Result<ScanType> {
        match self.try_get_parameter(SCAN_TYPE_PARAMETER)? {
            Some(entry) => match entry.value() {
                ParamValue::String(s) => ScanType::parse(s)
                    .ok_or_else(|| Error::State(format!("unknown scan type {:?}", s))),
                other => Err(Error::State(format!(
                    "scan type parameter has kind {}, expected string",
                    other.tag()
                ))),
            },
            None => Ok(ScanType::default()),
        }
    }

    /// Read rows `[start, stop)` of a scan dataset with ranges expanded
    ///
    /// Every row holds one cell per variable. Range independents become `n`
    /// points, scalar independents are repeated `n` times, and dependents are
    /// returned as stored; `n` is the first dimension of the first
    /// dependent. Fails with a state error for non-scan categories.
    pub fn get_scan_data(&self, start: Option<i64>, stop: Option<i64>) -> Result<Vec<Vec<Value>>> {
        if !self.category.is_scan() {
            return Err(Error::State(format!(
                "{} is a {} dataset, not a scan",
                self.file_name, self.category
            )));
        }
        self.touch();
        let scan_type = self.scan_type()?;
        let (s, e) = resolve_bounds(start, stop, self.readable_rows())?;
        let n = self
            .dependents
            .variables()
            .first()
            .and_then(|v| v.shape.dims().first().copied())
            .unwrap_or(1);

        let mut per_var = Vec::new();
        for (kind, var) in self.all_variables() {
            let cells = self.read_cells(kind, var, s..e)?;
            let cells = if kind == VariableKind::Independent {
                cells
                    .into_iter()
                    .map(|cell| expand(&var.name, &cell, var.shape.is_range(), scan_type, n))
                    .collect::<Result<Vec<Value>>>()?
            } else {
                cells
            };
            per_var.push(cells.into_iter());
        }

        Ok((s..e)
            .map(|_| per_var.iter_mut().filter_map(|cells| cells.next()).collect())
            .collect())
    }
}

fn expand(name: &str, cell: &Value, is_range: bool, scan_type: ScanType, n: usize) -> Result<Value> {
    let not_numeric = || Error::State(format!("independent {:?} is not numeric", name));
    if is_range {
        let bounds = cell.as_array().ok_or_else(not_numeric)?;
        let (start, stop) = match bounds {
            [a, b] => (
                a.as_f64().ok_or_else(not_numeric)?,
                b.as_f64().ok_or_else(not_numeric)?,
            ),
            _ => return Err(not_numeric()),
        };
        let points = scan_type.points(start, stop, n)?;
        Ok(Value::Array(points.into_iter().map(Value::Float64).collect()))
    } else {
        Ok(Value::Array(vec![cell.clone(); n]))
    }
}
