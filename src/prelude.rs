//! Convenient imports for DataChest.
//!
//! ```ignore
//! use datachest::prelude::*;
//!
//! let mut chest = DataChest::from_env()?;
//! chest.open_dataset("aaa0000aaa_runA", false)?;
//! ```

// Main entry point
pub use crate::chest::DataChest;
pub use crate::config::ChestConfig;

// Error handling
pub use crate::{Error, Result};

// Declarations and values
pub use crate::{Category, DType, Value, VariableDecl};

// Read results and parameters
pub use crate::{DataBlock, ParamEntry, ParamValue};
