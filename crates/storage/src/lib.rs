//! Container layer for DataChest
//!
//! This crate implements the file format datasets are stored in:
//! - Container: a tree of groups and resizable typed arrays with attributes
//! - ArrayData: flat typed columns, the unit of append
//! - Record: the framed, checksummed mutation log the container replays
//!
//! Writers append records; readers replay them and can `refresh` to pick up
//! records appended since they opened the file.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod array;
pub mod container;
pub mod error;
pub mod format;
pub mod record;

pub use array::ArrayData;
pub use container::{AccessMode, Array, Attributes, Container, Group, Node};
pub use error::{StorageError, StorageResult};
pub use record::Record;
