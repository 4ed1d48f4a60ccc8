//! Core types for DataChest
//!
//! This crate defines the vocabulary shared by the container and the
//! dataset engine:
//! - [`Value`] and [`DType`]: dynamic values and the closed dtype enumeration
//! - [`Shape`]: canonical declared cell shapes
//! - [`Error`]: the error taxonomy every public operation reports
//! - [`datestamp`]: the compact timestamp tokens used in filenames
//! - [`names`]: allow-lists for dataset, variable, parameter and directory names

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod datestamp;
pub mod error;
pub mod names;
pub mod shape;
pub mod value;

pub use error::{Error, NameKind, Result};
pub use shape::Shape;
pub use value::{DType, Value};

// Re-exported element types so callers do not need direct dependencies
pub use half::f16;
pub use num_complex::{Complex32, Complex64};
