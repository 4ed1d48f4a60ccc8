//! Storage configuration.
//!
//! A [`ChestConfig`] names the storage root every dataset path is resolved
//! against and the extension dataset files carry. Build one with
//! [`ChestConfig::builder`] or read the root from the environment with
//! [`ChestConfig::from_env`].

use datachest_core::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable naming the storage root
pub const ROOT_ENV_VAR: &str = "DATA_CHEST_ROOT";

/// Default dataset file extension
pub const DEFAULT_EXTENSION: &str = "chest";

/// Validated storage configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChestConfig {
    root: PathBuf,
    extension: String,
}

impl ChestConfig {
    /// Create a builder for storage configuration.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let config = ChestConfig::builder()
    ///     .root("/data/chest")
    ///     .create_root(true)
    ///     .build()?;
    /// ```
    pub fn builder() -> ChestConfigBuilder {
        ChestConfigBuilder::new()
    }

    /// Configuration rooted at the directory named by `DATA_CHEST_ROOT`
    pub fn from_env() -> Result<Self> {
        let root = std::env::var_os(ROOT_ENV_VAR).ok_or_else(|| {
            Error::Configuration(format!("environment variable {} is not set", ROOT_ENV_VAR))
        })?;
        Self::builder().root(PathBuf::from(root)).build()
    }

    /// Storage root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Dataset file extension, without the dot
    pub fn extension(&self) -> &str {
        &self.extension
    }
}

/// Builder for [`ChestConfig`].
#[derive(Debug, Clone)]
pub struct ChestConfigBuilder {
    root: Option<PathBuf>,
    extension: String,
    create_root: bool,
}

impl ChestConfigBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            root: None,
            extension: DEFAULT_EXTENSION.to_string(),
            create_root: false,
        }
    }

    /// Set the storage root.
    pub fn root(mut self, root: impl AsRef<Path>) -> Self {
        self.root = Some(root.as_ref().to_path_buf());
        self
    }

    /// Set the dataset file extension (a leading dot is ignored).
    pub fn extension(mut self, extension: &str) -> Self {
        self.extension = extension.trim_start_matches('.').to_string();
        self
    }

    /// Create the root directory when it does not exist.
    pub fn create_root(mut self, create: bool) -> Self {
        self.create_root = create;
        self
    }

    /// Validate and build the configuration.
    ///
    /// Fails with [`Error::Configuration`] when the root is unset or empty,
    /// missing (unless `create_root` is set) or not a directory, or when the
    /// extension is empty.
    pub fn build(self) -> Result<ChestConfig> {
        let root = match self.root {
            Some(root) if !root.as_os_str().is_empty() => root,
            _ => return Err(Error::Configuration("storage root is not set".to_string())),
        };
        if self.extension.is_empty() {
            return Err(Error::Configuration(
                "dataset extension cannot be empty".to_string(),
            ));
        }

        if !root.exists() {
            if !self.create_root {
                return Err(Error::Configuration(format!(
                    "storage root {} does not exist",
                    root.display()
                )));
            }
            std::fs::create_dir_all(&root)?;
            info!(root = %root.display(), "created storage root");
        }
        if !root.is_dir() {
            return Err(Error::Configuration(format!(
                "storage root {} is not a directory",
                root.display()
            )));
        }

        Ok(ChestConfig {
            root,
            extension: self.extension,
        })
    }
}

impl Default for ChestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
