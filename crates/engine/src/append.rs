//! Category-aware row appends
//!
//! A batch is validated in full before anything is written, so a rejected
//! batch leaves the file unchanged. The row contract per category:
//!
//! | Category        | Row                                                  |
//! |-----------------|------------------------------------------------------|
//! | ArbitraryScalar | one scalar per column                                |
//! | ArbitraryArray  | one array per column, all of the shared shape        |
//! | OneDScan        | `[start, stop]`, then one array per dependent        |
//! | TwoDScan        | scalar and `[start, stop]` independents, then arrays |
//! | Other           | one cell per column holding `flat_len` elements      |
//!
//! The first four contracts all reduce to "each cell has its column's
//! declared shape"; `Other` only checks the element count.

use datachest_core::{Error, Result, Value};
use datachest_storage::ArrayData;
use tracing::debug;

use crate::dataset::{array_path, Dataset, ATTR_NUM_ROWS};
use crate::schema::{Category, Variable};

impl Dataset {
    /// Append a batch of rows
    ///
    /// Every row lists one cell per independent followed by one cell per
    /// dependent. Fails with a state error on read-only handles, with
    /// [`Error::RowFormat`] on a wrong number of cells or ragged arrays, with
    /// [`Error::ShapeMismatch`] when a cell's shape differs from its
    /// declaration and with [`Error::TypeMismatch`] when an element cannot be
    /// stored in its column's dtype.
    pub fn add_data(&mut self, rows: &[Vec<Value>]) -> Result<()> {
        self.ensure_writable()?;
        self.validate_batch(rows)?;

        let columns: Vec<(String, &Variable)> = self
            .all_variables()
            .map(|(kind, var)| (array_path(kind, &var.name), var))
            .collect();

        let mut chunks = Vec::with_capacity(columns.len());
        for (col, (_, var)) in columns.iter().enumerate() {
            let leaves = rows.iter().flat_map(|row| row[col].leaves());
            let data = ArrayData::from_values(var.dtype, leaves).map_err(|bad| {
                Error::TypeMismatch {
                    column: var.name.clone(),
                    expected: var.dtype.to_string(),
                    received: bad.type_name().to_string(),
                }
            })?;
            chunks.push(data);
        }
        let paths: Vec<String> = columns.into_iter().map(|(path, _)| path).collect();

        for (path, data) in paths.iter().zip(chunks) {
            self.container.extend_array(path, data)?;
        }
        self.num_rows += rows.len() as u64;
        self.finish_write(vec![(ATTR_NUM_ROWS, Value::UInt64(self.num_rows))])?;

        debug!(
            file = %self.file_name,
            added = rows.len(),
            rows = self.num_rows,
            "appended rows"
        );
        Ok(())
    }

    fn validate_batch(&self, rows: &[Vec<Value>]) -> Result<()> {
        if rows.is_empty() {
            return Err(Error::RowFormat("no rows supplied".to_string()));
        }
        let variables: Vec<&Variable> = self.all_variables().map(|(_, var)| var).collect();

        for (index, row) in rows.iter().enumerate() {
            if row.len() != variables.len() {
                return Err(Error::RowFormat(format!(
                    "row {} has {} cells; a {} row has {} ({} independent, {} dependent)",
                    index,
                    row.len(),
                    self.category,
                    variables.len(),
                    self.independents.len(),
                    self.dependents.len()
                )));
            }
            for (cell, var) in row.iter().zip(&variables) {
                self.validate_cell(index, cell, var)?;
            }
        }
        Ok(())
    }

    fn validate_cell(&self, index: usize, cell: &Value, var: &Variable) -> Result<()> {
        let shape = cell.shape().ok_or_else(|| {
            Error::RowFormat(format!(
                "row {}: column {:?} holds a ragged array",
                index, var.name
            ))
        })?;

        if self.category == Category::Other {
            let count = cell.leaves().len();
            if count != var.shape.flat_len() {
                return Err(Error::ShapeMismatch {
                    column: var.name.clone(),
                    expected: var.shape.dims().to_vec(),
                    received: vec![count],
                });
            }
        } else if !var.shape.matches(&shape) {
            return Err(Error::ShapeMismatch {
                column: var.name.clone(),
                expected: var.shape.dims().to_vec(),
                received: shape,
            });
        }

        for leaf in cell.leaves() {
            if leaf.cast(var.dtype).is_none() {
                return Err(Error::TypeMismatch {
                    column: var.name.clone(),
                    expected: var.dtype.to_string(),
                    received: leaf.type_name().to_string(),
                });
            }
        }
        Ok(())
    }
}
