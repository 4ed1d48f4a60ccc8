//! Dataset engine for DataChest
//!
//! This crate implements everything between a caller and the container file:
//! - NamespaceManager: root-confined directory navigation
//! - Schema: variable validation, category classification, unique filenames
//! - Dataset: create/open/close and metadata bookkeeping
//! - Appends, reads, scan expansion and typed parameters on an open Dataset
//!
//! All operations are synchronous and single-threaded. A dataset handle is
//! the only writer of its file; readers may follow it with `refresh`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod append;
pub mod dataset;
pub mod namespace;
pub mod parameters;
pub mod read;
pub mod scan;
pub mod schema;

pub use dataset::Dataset;
pub use namespace::{Listing, NamespaceManager, PathSpec};
pub use parameters::{ParamEntry, ParamValue};
pub use read::DataBlock;
pub use scan::ScanType;
pub use schema::{
    classify, validate_variables, Category, Variable, VariableDecl, VariableGroup, VariableKind,
};
