//! # DataChest
//!
//! Schema-validated, append-only dataset storage for instrument polling loops.
//!
//! A dataset is one self-describing file holding independent and dependent
//! variable columns, row-count and timestamp metadata, and typed parameters.
//! Datasets live in a directory tree confined to one storage root.
//!
//! ## Quick Start
//!
//! ```ignore
//! use datachest::prelude::*;
//!
//! let mut chest = DataChest::new(ChestConfig::builder().root("/data").build()?)?;
//! chest.create_dataset(
//!     "runA",
//!     &[VariableDecl::new("t", &[1], "float64", "s")],
//!     &[VariableDecl::new("v", &[1], "float64", "V")],
//! )?;
//! chest.add_data(&[vec![0.0.into(), 1.0.into()], vec![1.0.into(), 1.5.into()]])?;
//! chest.add_parameter("Gain", 10, "", false)?;
//! let rows = chest.get_data(None, None, None)?;
//! ```
//!
//! ## Categories
//!
//! Every dataset is classified once, at creation, from its declared shapes:
//!
//! - `Arbitrary Type 1` - every variable is a scalar
//! - `Arbitrary Type 2` - every variable shares one array shape
//! - `1D Scan` - one `[start, stop]` independent swept against array dependents
//! - `2D Scan` - a scalar and a `[start, stop]` independent against array dependents
//! - `Other` - anything else, with minimal row checks

#![warn(missing_docs)]

mod chest;
mod config;

pub mod prelude;

// Re-export main entry points
pub use chest::DataChest;
pub use config::{ChestConfig, ChestConfigBuilder, DEFAULT_EXTENSION, ROOT_ENV_VAR};
pub use datachest_core::{datestamp, Complex32, Complex64, DType, Error, NameKind, Result, Shape, Value};
pub use datachest_engine::{
    Category, DataBlock, Listing, ParamEntry, ParamValue, PathSpec, ScanType, Variable,
    VariableDecl, VariableGroup, VariableKind,
};

/// Lower layers, for callers that need more than the facade
pub mod engine {
    pub use datachest_engine::*;
}

/// Container file access
pub mod storage {
    pub use datachest_storage::*;
}
