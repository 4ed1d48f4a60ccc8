//! Dataset handle: file lifecycle and metadata bookkeeping
//!
//! A dataset file holds three groups, `independents`, `dependents` and
//! `parameters`. Each variable is one flat resizable array whose element
//! count is `rows * flat_len(shape)`; the declared shape lives in the group's
//! descriptor attributes and is only used to reshape on read.
//!
//! File-level attributes:
//! - `Data Category`: one of the [`Category`] names
//! - `Number Of Rows Added`: rows appended so far
//! - `Date Created`, `Date Modified`, `Date Accessed`: ISO timestamps

use chrono::{Local, NaiveDateTime};
use datachest_core::names;
use datachest_core::{datestamp, Error, NameKind, Result, Value};
use datachest_storage::{AccessMode, Container};
use std::cell::Cell;
use std::path::Path;
use tracing::{debug, info};

use crate::namespace::list_dir;
use crate::schema::{
    classify_groups, decode_descriptor, encode_descriptor, unique_name, validate_variables,
    Category, Variable, VariableDecl, VariableGroup, VariableKind,
};

/// Root attribute holding the category name
pub const ATTR_CATEGORY: &str = "Data Category";
/// Root attribute holding the number of appended rows
pub const ATTR_NUM_ROWS: &str = "Number Of Rows Added";
/// Root attribute holding the creation timestamp
pub const ATTR_CREATED: &str = "Date Created";
/// Root attribute holding the last write timestamp
pub const ATTR_MODIFIED: &str = "Date Modified";
/// Root attribute holding the last access timestamp
pub const ATTR_ACCESSED: &str = "Date Accessed";
/// Group holding parameters
pub const PARAMETERS_GROUP: &str = "parameters";

pub(crate) fn now_iso() -> String {
    datestamp::format_iso(&Local::now().naive_local())
}

pub(crate) fn array_path(kind: VariableKind, name: &str) -> String {
    format!("{}/{}", kind.group_name(), name)
}

/// An open dataset
///
/// Handles are writable after [`Dataset::create`] and after
/// [`Dataset::open`] with `modify = true`; otherwise every mutation fails
/// with a state error. The mode never changes for the life of a handle.
#[derive(Debug)]
pub struct Dataset {
    pub(crate) container: Container,
    pub(crate) file_name: String,
    pub(crate) category: Category,
    pub(crate) independents: VariableGroup,
    pub(crate) dependents: VariableGroup,
    pub(crate) num_rows: u64,
    accessed: Cell<NaiveDateTime>,
    accessed_dirty: Cell<bool>,
}

impl Dataset {
    /// Create a dataset in `dir` and open it writable
    ///
    /// `name` becomes part of the filename and must satisfy the dataset
    /// charset. `date_stamp` overrides the creation time with an existing
    /// token; the timestamps are derived from it.
    pub fn create(
        dir: &Path,
        extension: &str,
        name: &str,
        indeps: &[VariableDecl],
        deps: &[VariableDecl],
        date_stamp: Option<&str>,
    ) -> Result<Self> {
        names::validate(NameKind::Dataset, name)?;
        let independents = validate_variables(VariableKind::Independent, indeps)?;
        let dependents = validate_variables(VariableKind::Dependent, deps)?;
        let category = classify_groups(&independents, &dependents);

        let token = match date_stamp {
            Some(token) => token.to_string(),
            None => datestamp::now()?,
        };
        let created = datestamp::invert_datetime(&token)?;
        let created_iso = datestamp::format_iso(&created);

        let existing = list_dir(dir, extension)?.datasets;
        let file_name = unique_name(&existing, name, &token, extension)?;
        let mut container = Container::create(dir.join(&file_name))?;

        for group in [&independents, &dependents] {
            let group_name = group.kind().group_name();
            container.create_group(group_name)?;
            container.set_attrs(group_name, encode_descriptor(group))?;
            for var in group.variables() {
                container.create_array(
                    &array_path(group.kind(), &var.name),
                    var.dtype,
                    var.shape.flat_len() as u64,
                )?;
            }
        }
        container.create_group(PARAMETERS_GROUP)?;

        container.set_attrs(
            "",
            [
                (ATTR_CATEGORY, Value::from(category.as_str())),
                (ATTR_NUM_ROWS, Value::UInt64(0)),
                (ATTR_CREATED, Value::from(created_iso.as_str())),
                (ATTR_MODIFIED, Value::from(created_iso.as_str())),
                (ATTR_ACCESSED, Value::from(created_iso.as_str())),
            ],
        )?;
        container.flush()?;

        info!(file = %file_name, category = %category, "created dataset");
        Ok(Self {
            container,
            file_name,
            category,
            independents,
            dependents,
            num_rows: 0,
            accessed: Cell::new(created),
            accessed_dirty: Cell::new(false),
        })
    }

    /// Open an existing dataset in `dir`
    ///
    /// The extension is appended to `name` when omitted. The handle is
    /// read-only unless `modify` is set.
    pub fn open(dir: &Path, extension: &str, name: &str, modify: bool) -> Result<Self> {
        let suffix = format!(".{}", extension);
        let file_name = if name.ends_with(&suffix) {
            name.to_string()
        } else {
            format!("{}{}", name, suffix)
        };
        // Only regular files listed in `dir` may be opened
        if !list_dir(dir, extension)?.datasets.contains(&file_name) {
            return Err(Error::NotFound(format!(
                "dataset {:?} in {}",
                file_name,
                dir.display()
            )));
        }

        let mode = if modify {
            AccessMode::ReadWrite
        } else {
            AccessMode::ReadOnly
        };
        let container = Container::open(dir.join(&file_name), mode)?;

        let category = container
            .attr("", ATTR_CATEGORY)
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Storage(format!("{} has no data category", file_name)))?
            .parse::<Category>()?;
        let independents = Self::load_group(&container, VariableKind::Independent)?;
        let dependents = Self::load_group(&container, VariableKind::Dependent)?;
        let num_rows = Self::stored_rows(&container);

        info!(file = %file_name, ?mode, rows = num_rows, "opened dataset");
        Ok(Self {
            container,
            file_name,
            category,
            independents,
            dependents,
            num_rows,
            accessed: Cell::new(Local::now().naive_local()),
            accessed_dirty: Cell::new(true),
        })
    }

    fn load_group(container: &Container, kind: VariableKind) -> Result<VariableGroup> {
        let group = kind.group_name();
        decode_descriptor(kind, |attr| container.attr(group, attr))
    }

    fn stored_rows(container: &Container) -> u64 {
        container
            .attr("", ATTR_NUM_ROWS)
            .and_then(Value::as_i128)
            .and_then(|n| u64::try_from(n).ok())
            .unwrap_or(0)
    }

    pub(crate) fn touch(&self) {
        self.accessed.set(Local::now().naive_local());
        self.accessed_dirty.set(true);
    }

    pub(crate) fn ensure_writable(&self) -> Result<()> {
        if self.container.is_writable() {
            Ok(())
        } else {
            Err(Error::read_only(&self.file_name))
        }
    }

    /// Stamp Modified and Accessed along with `extra` root attributes in one
    /// record, then flush; called after every write
    pub(crate) fn finish_write(&mut self, mut extra: Vec<(&'static str, Value)>) -> Result<()> {
        let now = now_iso();
        extra.push((ATTR_MODIFIED, Value::from(now.as_str())));
        extra.push((ATTR_ACCESSED, Value::from(now.as_str())));
        self.container.set_attrs("", extra)?;
        self.accessed_dirty.set(false);
        self.container.flush()?;
        Ok(())
    }

    /// Rows that are complete in every variable
    ///
    /// Normally equal to the stored row count; smaller only when a crash cut
    /// an append short.
    pub(crate) fn readable_rows(&self) -> u64 {
        let mut rows = self.num_rows;
        for (kind, var) in self.all_variables() {
            let flat = var.shape.flat_len().max(1) as u64;
            let available = self
                .container
                .array(&array_path(kind, &var.name))
                .map(|a| a.len() as u64 / flat)
                .unwrap_or(0);
            rows = rows.min(available);
        }
        rows
    }

    pub(crate) fn all_variables(&self) -> impl Iterator<Item = (VariableKind, &Variable)> {
        let indeps = self
            .independents
            .variables()
            .iter()
            .map(|v| (VariableKind::Independent, v));
        let deps = self
            .dependents
            .variables()
            .iter()
            .map(|v| (VariableKind::Dependent, v));
        indeps.chain(deps)
    }

    /// Independent and dependent variable descriptors
    pub fn variables(&self) -> (&VariableGroup, &VariableGroup) {
        self.touch();
        (&self.independents, &self.dependents)
    }

    /// Filename of the dataset, extension included
    pub fn name(&self) -> &str {
        self.touch();
        &self.file_name
    }

    /// Structural category
    pub fn category(&self) -> Category {
        self.touch();
        self.category
    }

    /// Number of rows appended so far
    pub fn num_rows(&self) -> u64 {
        self.touch();
        self.num_rows
    }

    /// Check if the handle accepts writes
    pub fn is_writable(&self) -> bool {
        self.container.is_writable()
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        self.container.path()
    }

    /// Stored creation timestamp
    pub fn date_created(&self) -> Option<&str> {
        self.container.attr("", ATTR_CREATED).and_then(Value::as_str)
    }

    /// Stored last-write timestamp
    pub fn date_modified(&self) -> Option<&str> {
        self.container.attr("", ATTR_MODIFIED).and_then(Value::as_str)
    }

    /// Last access time, including accesses not yet persisted
    pub fn date_accessed(&self) -> String {
        datestamp::format_iso(&self.accessed.get())
    }

    /// Pick up rows and parameters appended by another writer
    ///
    /// Only meaningful for read-only handles; a writable handle is the only
    /// writer of its file. Returns the number of records applied.
    pub fn refresh(&mut self) -> Result<u64> {
        let applied = self.container.refresh()?;
        if applied > 0 {
            self.num_rows = Self::stored_rows(&self.container);
            debug!(file = %self.file_name, applied, rows = self.num_rows, "refreshed dataset");
        }
        Ok(applied)
    }

    /// Persist the access time (writable handles) and release the file
    pub fn close(mut self) -> Result<()> {
        if self.container.is_writable() && self.accessed_dirty.get() {
            let accessed = self.date_accessed();
            self.container
                .set_attr("", ATTR_ACCESSED, Value::from(accessed.as_str()))?;
        }
        info!(file = %self.file_name, "closed dataset");
        self.container.close()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn scalar_decls() -> (Vec<VariableDecl>, Vec<VariableDecl>) {
        (
            vec![VariableDecl::new("t", &[1], "float64", "s")],
            vec![VariableDecl::new("v", &[1], "float64", "V")],
        )
    }

    #[test]
    fn test_create_lays_out_file() {
        let dir = TempDir::new().unwrap();
        let (i, d) = scalar_decls();
        let ds = Dataset::create(dir.path(), "chest", "runA", &i, &d, Some("aaa0000aaa")).unwrap();

        assert_eq!(ds.name(), "aaa0000aaa_runA.chest");
        assert_eq!(ds.category(), Category::ArbitraryScalar);
        assert_eq!(ds.num_rows(), 0);
        assert!(ds.is_writable());
        assert_eq!(ds.date_created(), Some("2015-01-01T00:00:00.000000"));
        assert!(ds.container.group(PARAMETERS_GROUP).is_some());
        assert_eq!(
            ds.container.array("dependents/v").unwrap().dtype(),
            datachest_core::DType::Float64
        );
    }

    #[test]
    fn test_create_avoids_collisions() {
        let dir = TempDir::new().unwrap();
        let (i, d) = scalar_decls();
        let a = Dataset::create(dir.path(), "chest", "runA", &i, &d, Some("aaa0000aaa")).unwrap();
        let b = Dataset::create(dir.path(), "chest", "runA", &i, &d, Some("aaa0000aaa")).unwrap();
        assert_eq!(a.name(), "aaa0000aaa_runA.chest");
        assert_eq!(b.name(), "aaa0000aaa_1_runA.chest");
    }

    #[test]
    fn test_create_rejects_bad_input() {
        let dir = TempDir::new().unwrap();
        let (i, d) = scalar_decls();
        assert!(matches!(
            Dataset::create(dir.path(), "chest", "run A", &i, &d, None),
            Err(Error::InvalidName { .. })
        ));
        assert!(matches!(
            Dataset::create(dir.path(), "chest", "runA", &[], &d, None),
            Err(Error::Schema(_))
        ));
        assert!(matches!(
            Dataset::create(dir.path(), "chest", "runA", &i, &d, Some("bogus")),
            Err(Error::InvalidDateStamp(_))
        ));
        assert!(list_dir(dir.path(), "chest").unwrap().datasets.is_empty());
    }

    #[test]
    fn test_open_modes() {
        let dir = TempDir::new().unwrap();
        let (i, d) = scalar_decls();
        let ds = Dataset::create(dir.path(), "chest", "runA", &i, &d, Some("aaa0000aaa")).unwrap();
        ds.close().unwrap();

        let ro = Dataset::open(dir.path(), "chest", "aaa0000aaa_runA", false).unwrap();
        assert!(!ro.is_writable());
        assert!(ro.ensure_writable().unwrap_err().is_state_error());
        let (indeps, deps) = ro.variables();
        assert_eq!(indeps.names(), vec!["t"]);
        assert_eq!(deps.units(), vec!["V"]);
        drop(ro);

        let rw = Dataset::open(dir.path(), "chest", "aaa0000aaa_runA.chest", true).unwrap();
        assert!(rw.is_writable());

        assert!(matches!(
            Dataset::open(dir.path(), "chest", "missing", false),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_open_stays_in_directory() {
        let outer = TempDir::new().unwrap();
        let (i, d) = scalar_decls();
        Dataset::create(outer.path(), "chest", "secret", &i, &d, Some("aaa0000aaa"))
            .unwrap()
            .close()
            .unwrap();
        let sub = outer.path().join("sub");
        std::fs::create_dir(&sub).unwrap();

        for name in [
            "../aaa0000aaa_secret",
            "../aaa0000aaa_secret.chest",
            "sub/../aaa0000aaa_secret.chest",
        ] {
            assert!(matches!(
                Dataset::open(&sub, "chest", name, false),
                Err(Error::NotFound(_))
            ));
        }

        let elsewhere = TempDir::new().unwrap();
        let absolute = outer.path().join("aaa0000aaa_secret.chest");
        assert!(matches!(
            Dataset::open(elsewhere.path(), "chest", absolute.to_str().unwrap(), false),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_append_writes_one_metadata_record() {
        let dir = TempDir::new().unwrap();
        let (i, d) = scalar_decls();
        let mut ds =
            Dataset::create(dir.path(), "chest", "runA", &i, &d, Some("aaa0000aaa")).unwrap();
        let before = ds.container.record_count();
        ds.add_data(&[vec![Value::from(0.0), Value::from(1.0)]])
            .unwrap();
        // one extend per variable plus a single attribute record
        assert_eq!(ds.container.record_count(), before + 3);
        assert_eq!(
            ds.container.attr("", ATTR_NUM_ROWS),
            Some(&Value::UInt64(1))
        );
        assert!(ds.date_modified().is_some());
    }

    #[test]
    fn test_close_persists_access_time_for_writers_only() {
        let dir = TempDir::new().unwrap();
        let (i, d) = scalar_decls();
        let ds = Dataset::create(dir.path(), "chest", "runA", &i, &d, Some("aaa0000aaa")).unwrap();
        ds.close().unwrap();
        let path = dir.path().join("aaa0000aaa_runA.chest");
        let len = std::fs::metadata(&path).unwrap().len();

        let ro = Dataset::open(dir.path(), "chest", "aaa0000aaa_runA", false).unwrap();
        ro.num_rows();
        ro.close().unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), len);

        let rw = Dataset::open(dir.path(), "chest", "aaa0000aaa_runA", true).unwrap();
        rw.num_rows();
        rw.close().unwrap();
        let reopened = Dataset::open(dir.path(), "chest", "aaa0000aaa_runA", false).unwrap();
        assert_ne!(
            reopened.container.attr("", ATTR_ACCESSED).and_then(Value::as_str),
            Some("2015-01-01T00:00:00.000000")
        );
    }
}
