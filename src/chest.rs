//! The caller-facing storage handle.
//!
//! A [`DataChest`] bundles one working directory with at most one open
//! dataset. Instrument pollers and browsing tools each hold their own
//! instance; nothing is shared between instances.

use datachest_core::{Error, Result, Value};
use datachest_engine::{
    Category, DataBlock, Dataset, Listing, NamespaceManager, ParamEntry, ParamValue, PathSpec,
    VariableDecl, VariableGroup,
};
use std::path::{Path, PathBuf};

use crate::config::ChestConfig;

/// Directory navigation plus one open dataset.
///
/// # Example
///
/// ```ignore
/// use datachest::prelude::*;
///
/// let mut chest = DataChest::from_env()?;
/// chest.cd("cooldown_12")?;
/// chest.create_dataset(
///     "fridge",
///     &[VariableDecl::new("time", &[1], "utc_datetime", "")],
///     &[VariableDecl::new("temperature", &[1], "float64", "K")],
/// )?;
/// chest.add_data(&[vec![Value::DateTime(now), Value::from(0.012)]])?;
/// ```
#[derive(Debug)]
pub struct DataChest {
    config: ChestConfig,
    namespace: NamespaceManager,
    dataset: Option<Dataset>,
}

impl DataChest {
    /// Open a handle positioned at the configured root.
    pub fn new(config: ChestConfig) -> Result<Self> {
        let namespace = NamespaceManager::new(config.root(), config.extension())?;
        Ok(Self {
            config,
            namespace,
            dataset: None,
        })
    }

    /// Open a handle rooted at `DATA_CHEST_ROOT`.
    pub fn from_env() -> Result<Self> {
        Self::new(ChestConfig::from_env()?)
    }

    /// Configuration this handle was built from.
    pub fn config(&self) -> &ChestConfig {
        &self.config
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Datasets and subdirectories of the working directory.
    pub fn ls(&self) -> Result<Listing> {
        self.namespace.list()
    }

    /// Change the working directory; see [`NamespaceManager::change_directory`].
    pub fn cd(&mut self, path: impl Into<PathSpec>) -> Result<()> {
        self.namespace.change_directory(path)
    }

    /// Create a subdirectory of the working directory.
    pub fn mkdir(&self, name: &str) -> Result<PathBuf> {
        self.namespace.make_directory(name)
    }

    /// Working directory relative to the root.
    pub fn pwd(&self) -> String {
        self.namespace.pwd()
    }

    /// Absolute working directory.
    pub fn cwd(&self) -> &Path {
        self.namespace.cwd()
    }

    // ========================================================================
    // Dataset lifecycle
    // ========================================================================

    /// Create a dataset in the working directory and make it the open one.
    ///
    /// Any previously open dataset is closed first. Returns the filename.
    pub fn create_dataset(
        &mut self,
        name: &str,
        indeps: &[VariableDecl],
        deps: &[VariableDecl],
    ) -> Result<String> {
        self.create_dataset_with_stamp(name, indeps, deps, None)
    }

    /// Like [`create_dataset`](Self::create_dataset) with an explicit date stamp token.
    pub fn create_dataset_with_stamp(
        &mut self,
        name: &str,
        indeps: &[VariableDecl],
        deps: &[VariableDecl],
        date_stamp: Option<&str>,
    ) -> Result<String> {
        self.close_dataset()?;
        let dataset = Dataset::create(
            self.namespace.cwd(),
            self.config.extension(),
            name,
            indeps,
            deps,
            date_stamp,
        )?;
        let file_name = dataset.name().to_string();
        self.dataset = Some(dataset);
        Ok(file_name)
    }

    /// Open a dataset of the working directory, read-only unless `modify`.
    pub fn open_dataset(&mut self, name: &str, modify: bool) -> Result<()> {
        self.close_dataset()?;
        let dataset = Dataset::open(self.namespace.cwd(), self.config.extension(), name, modify)?;
        self.dataset = Some(dataset);
        Ok(())
    }

    /// Close the open dataset, if any.
    pub fn close_dataset(&mut self) -> Result<()> {
        match self.dataset.take() {
            Some(dataset) => dataset.close(),
            None => Ok(()),
        }
    }

    /// The open dataset, if any.
    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    fn current(&self) -> Result<&Dataset> {
        self.dataset.as_ref().ok_or_else(Error::no_dataset_open)
    }

    fn current_mut(&mut self) -> Result<&mut Dataset> {
        self.dataset.as_mut().ok_or_else(Error::no_dataset_open)
    }

    /// Pick up records another writer appended to the open dataset.
    pub fn refresh(&mut self) -> Result<u64> {
        self.current_mut()?.refresh()
    }

    // ========================================================================
    // Metadata
    // ========================================================================

    /// Independent and dependent variable descriptors.
    pub fn get_variables(&self) -> Result<(VariableGroup, VariableGroup)> {
        let (indeps, deps) = self.current()?.variables();
        Ok((indeps.clone(), deps.clone()))
    }

    /// Filename of the open dataset.
    pub fn get_dataset_name(&self) -> Result<String> {
        Ok(self.current()?.name().to_string())
    }

    /// Category of the open dataset.
    pub fn get_data_category(&self) -> Result<Category> {
        Ok(self.current()?.category())
    }

    /// Rows appended to the open dataset.
    pub fn get_num_rows(&self) -> Result<u64> {
        Ok(self.current()?.num_rows())
    }

    // ========================================================================
    // Rows
    // ========================================================================

    /// Append rows to the open dataset.
    pub fn add_data(&mut self, rows: &[Vec<Value>]) -> Result<()> {
        self.current_mut()?.add_data(rows)
    }

    /// Read rows `[start, stop)` of the requested variables.
    pub fn get_data(
        &self,
        start: Option<i64>,
        stop: Option<i64>,
        variables: Option<&[&str]>,
    ) -> Result<DataBlock> {
        self.current()?.get_data(start, stop, variables)
    }

    /// Read scan rows with range independents expanded.
    pub fn get_scan_data(&self, start: Option<i64>, stop: Option<i64>) -> Result<Vec<Vec<Value>>> {
        self.current()?.get_scan_data(start, stop)
    }

    // ========================================================================
    // Parameters
    // ========================================================================

    /// Store a parameter on the open dataset.
    pub fn add_parameter(
        &mut self,
        name: &str,
        value: impl Into<ParamValue>,
        units: &str,
        overwrite: bool,
    ) -> Result<()> {
        self.current_mut()?
            .add_parameter(name, value, units, overwrite)
    }

    /// Read a parameter; missing names fail with a not-found error.
    pub fn get_parameter(&self, name: &str) -> Result<ParamEntry> {
        self.current()?.get_parameter(name)
    }

    /// Read a parameter; missing names yield `None`.
    pub fn try_get_parameter(&self, name: &str) -> Result<Option<ParamEntry>> {
        self.current()?.try_get_parameter(name)
    }

    /// Names of every parameter of the open dataset.
    pub fn get_parameter_list(&self) -> Result<Vec<String>> {
        Ok(self.current()?.get_parameter_list())
    }

    /// Replace the units of a parameter.
    pub fn set_parameter_units(&mut self, name: &str, units: &str) -> Result<()> {
        self.current_mut()?.set_parameter_units(name, units)
    }

    /// Units of a parameter.
    pub fn get_parameter_units(&self, name: &str) -> Result<String> {
        self.current()?.get_parameter_units(name)
    }
}

impl Drop for DataChest {
    fn drop(&mut self) {
        if let Some(dataset) = self.dataset.take() {
            if let Err(e) = dataset.close() {
                tracing::warn!(error = %e, "failed to close dataset on drop");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn chest(dir: &TempDir) -> DataChest {
        DataChest::new(ChestConfig::builder().root(dir.path()).build().unwrap()).unwrap()
    }

    #[test]
    fn test_operations_need_an_open_dataset() {
        let dir = TempDir::new().unwrap();
        let mut chest = chest(&dir);
        assert!(chest.get_num_rows().unwrap_err().is_state_error());
        assert!(chest.get_variables().unwrap_err().is_state_error());
        assert!(chest.add_data(&[]).unwrap_err().is_state_error());
        assert!(chest.get_parameter("x").unwrap_err().is_state_error());
        assert!(chest.close_dataset().is_ok());
    }

    #[test]
    fn test_datasets_live_in_the_working_directory() {
        let dir = TempDir::new().unwrap();
        let mut chest = chest(&dir);
        chest.mkdir("run_1").unwrap();
        chest.cd("run_1").unwrap();
        let name = chest
            .create_dataset_with_stamp(
                "trace",
                &[VariableDecl::new("t", &[1], "float64", "s")],
                &[VariableDecl::new("v", &[1], "float64", "V")],
                Some("aaa0000aaa"),
            )
            .unwrap();
        assert_eq!(chest.ls().unwrap().datasets, vec![name.clone()]);
        assert!(dir.path().join("run_1").join(&name).is_file());

        chest.cd("").unwrap();
        assert!(chest.open_dataset(&name, false).unwrap_err().is_not_found());
        assert!(chest.dataset().is_none());
    }
}
