//! Root-confined directory navigation
//!
//! A [`NamespaceManager`] owns one working directory that always stays at or
//! below its configured root. Every caller that needs an independent working
//! directory holds its own manager; nothing here is process-global.

use datachest_core::names;
use datachest_core::{Error, NameKind, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

/// Contents of one directory, each list sorted case-insensitively
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    /// Dataset files (names carry the extension)
    pub datasets: Vec<String>,
    /// Subdirectories
    pub directories: Vec<String>,
}

/// Argument to [`NamespaceManager::change_directory`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSpec {
    /// One `/`-separated path; a leading `/` starts from the root
    Single(String),
    /// Path segments applied in order; an empty segment moves to the root
    Segments(Vec<String>),
}

impl From<&str> for PathSpec {
    fn from(s: &str) -> Self {
        PathSpec::Single(s.to_string())
    }
}

impl From<String> for PathSpec {
    fn from(s: String) -> Self {
        PathSpec::Single(s)
    }
}

impl From<Vec<String>> for PathSpec {
    fn from(v: Vec<String>) -> Self {
        PathSpec::Segments(v)
    }
}

impl From<Vec<&str>> for PathSpec {
    fn from(v: Vec<&str>) -> Self {
        PathSpec::Segments(v.into_iter().map(String::from).collect())
    }
}

impl<const N: usize> From<[&str; N]> for PathSpec {
    fn from(v: [&str; N]) -> Self {
        PathSpec::Segments(v.iter().map(|s| s.to_string()).collect())
    }
}

/// Navigation step after parsing a [`PathSpec`]
#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Root,
    Parent,
    Child(String),
}

impl PathSpec {
    fn steps(&self) -> Vec<Step> {
        fn push_path(steps: &mut Vec<Step>, path: &str) {
            if path.is_empty() {
                steps.push(Step::Root);
                return;
            }
            if path.starts_with('/') {
                steps.push(Step::Root);
            }
            for segment in path.split('/') {
                match segment {
                    "" | "." => {}
                    ".." => steps.push(Step::Parent),
                    name => steps.push(Step::Child(name.to_string())),
                }
            }
        }

        let mut steps = Vec::new();
        match self {
            PathSpec::Single(path) => push_path(&mut steps, path),
            PathSpec::Segments(segments) => {
                for segment in segments {
                    push_path(&mut steps, segment);
                }
            }
        }
        steps
    }
}

impl std::fmt::Display for PathSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathSpec::Single(path) => f.write_str(path),
            PathSpec::Segments(segments) => write!(f, "{:?}", segments),
        }
    }
}

/// List the dataset files and subdirectories of `dir`
///
/// Hidden entries (leading `.`) are skipped. Files count as datasets when
/// their extension equals `extension`.
pub fn list_dir(dir: &Path, extension: &str) -> Result<Listing> {
    let mut listing = Listing::default();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(_) => continue,
        };
        if name.starts_with('.') {
            continue;
        }
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            listing.directories.push(name);
        } else if file_type.is_file()
            && Path::new(&name).extension().and_then(|e| e.to_str()) == Some(extension)
        {
            listing.datasets.push(name);
        }
    }
    listing.datasets.sort_by_key(|s| s.to_lowercase());
    listing.directories.sort_by_key(|s| s.to_lowercase());
    Ok(listing)
}

/// Root-confined working directory
#[derive(Debug, Clone)]
pub struct NamespaceManager {
    root: PathBuf,
    cwd: PathBuf,
    extension: String,
}

impl NamespaceManager {
    /// Create a manager positioned at `root`
    ///
    /// Fails with a configuration error when `root` is empty, missing or not
    /// a directory.
    pub fn new(root: impl AsRef<Path>, extension: &str) -> Result<Self> {
        let root = root.as_ref();
        if root.as_os_str().is_empty() {
            return Err(Error::Configuration("storage root is empty".to_string()));
        }
        if !root.is_dir() {
            return Err(Error::Configuration(format!(
                "storage root {} does not exist or is not a directory",
                root.display()
            )));
        }
        let root = fs::canonicalize(root)?;
        debug!(root = %root.display(), "namespace initialized");
        Ok(Self {
            cwd: root.clone(),
            root,
            extension: extension.to_string(),
        })
    }

    /// Configured root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute current directory
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Dataset file extension used for listings
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Current directory relative to the root, `/` at the root
    pub fn pwd(&self) -> String {
        let relative = self.cwd.strip_prefix(&self.root).unwrap_or(Path::new(""));
        let parts: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        format!("/{}", parts.join("/"))
    }

    /// Check if the current directory is the root
    pub fn at_root(&self) -> bool {
        self.cwd == self.root
    }

    /// Datasets and subdirectories of the current directory
    pub fn list(&self) -> Result<Listing> {
        list_dir(&self.cwd, &self.extension)
    }

    /// Create a subdirectory of the current directory
    ///
    /// The working directory does not change.
    pub fn make_directory(&self, name: &str) -> Result<PathBuf> {
        names::validate(NameKind::Directory, name)?;
        let lower = name.to_lowercase();
        let listing = self.list()?;
        if listing
            .directories
            .iter()
            .any(|existing| existing.to_lowercase() == lower)
        {
            return Err(Error::AlreadyExists(format!(
                "directory {:?} in {}",
                name,
                self.pwd()
            )));
        }
        let path = self.cwd.join(name);
        fs::create_dir(&path)?;
        info!(path = %path.display(), "created directory");
        Ok(path)
    }

    /// Move the working directory
    ///
    /// `..` moves to the parent and an empty path moves to the root. An
    /// unknown segment fails with [`Error::NotFound`] and leaves the working
    /// directory unchanged. A path that would leave the root resets the
    /// working directory to the root and fails with [`Error::Confinement`].
    pub fn change_directory(&mut self, path: impl Into<PathSpec>) -> Result<()> {
        let spec = path.into();
        let mut target = self.cwd.clone();

        for step in spec.steps() {
            match step {
                Step::Root => target = self.root.clone(),
                Step::Parent => {
                    if target == self.root {
                        return Err(self.confinement_violation(&spec));
                    }
                    target.pop();
                }
                Step::Child(name) => {
                    let next = target.join(&name);
                    if !next.is_dir() {
                        return Err(Error::NotFound(format!(
                            "directory {:?} below {}",
                            name,
                            target.display()
                        )));
                    }
                    // Symlinks may point outside the root
                    let resolved = fs::canonicalize(&next)?;
                    if !resolved.starts_with(&self.root) {
                        return Err(self.confinement_violation(&spec));
                    }
                    target = resolved;
                }
            }
        }

        self.cwd = target;
        debug!(cwd = %self.pwd(), "changed directory");
        Ok(())
    }

    fn confinement_violation(&mut self, spec: &PathSpec) -> Error {
        warn!(attempted = %spec, "navigation would leave the storage root; resetting to root");
        self.cwd = self.root.clone();
        Error::Confinement {
            attempted: spec.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn manager() -> (TempDir, NamespaceManager) {
        let dir = TempDir::new().unwrap();
        let ns = NamespaceManager::new(dir.path(), "chest").unwrap();
        (dir, ns)
    }

    #[test]
    fn test_root_must_exist() {
        assert!(matches!(
            NamespaceManager::new("", "chest"),
            Err(Error::Configuration(_))
        ));
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            NamespaceManager::new(&missing, "chest"),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_list_sorts_case_insensitively() {
        let (dir, ns) = manager();
        fs::create_dir(dir.path().join("beta")).unwrap();
        fs::create_dir(dir.path().join("Alpha")).unwrap();
        fs::create_dir(dir.path().join(".hidden")).unwrap();
        fs::write(dir.path().join("b_run.chest"), b"").unwrap();
        fs::write(dir.path().join("A_run.chest"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let listing = ns.list().unwrap();
        assert_eq!(listing.directories, vec!["Alpha", "beta"]);
        assert_eq!(listing.datasets, vec!["A_run.chest", "b_run.chest"]);
    }

    #[test]
    fn test_make_directory_rejects_duplicates_and_bad_names() {
        let (_dir, ns) = manager();
        ns.make_directory("Cooldown-1").unwrap();
        assert!(matches!(
            ns.make_directory("cooldown-1"),
            Err(Error::AlreadyExists(_))
        ));
        assert!(matches!(
            ns.make_directory("bad/name"),
            Err(Error::InvalidName { .. })
        ));
        assert!(ns.at_root());
    }

    #[test]
    fn test_change_directory_forms() {
        let (_dir, mut ns) = manager();
        ns.make_directory("a").unwrap();
        ns.change_directory("a").unwrap();
        ns.make_directory("b").unwrap();

        ns.change_directory("b").unwrap();
        assert_eq!(ns.pwd(), "/a/b");
        ns.change_directory("..").unwrap();
        assert_eq!(ns.pwd(), "/a");
        ns.change_directory("").unwrap();
        assert_eq!(ns.pwd(), "/");
        ns.change_directory(["a", "b"]).unwrap();
        assert_eq!(ns.pwd(), "/a/b");
        ns.change_directory("/a").unwrap();
        assert_eq!(ns.pwd(), "/a");
        ns.change_directory(vec!["", "a/b"]).unwrap();
        assert_eq!(ns.pwd(), "/a/b");
    }

    #[test]
    fn test_unknown_segment_leaves_cwd() {
        let (_dir, mut ns) = manager();
        ns.make_directory("a").unwrap();
        ns.change_directory("a").unwrap();
        assert!(matches!(
            ns.change_directory("missing"),
            Err(Error::NotFound(_))
        ));
        assert_eq!(ns.pwd(), "/a");
    }

    #[test]
    fn test_escape_from_root_resets_and_fails() {
        let (_dir, mut ns) = manager();
        ns.make_directory("a").unwrap();
        ns.change_directory("a").unwrap();

        let err = ns.change_directory("../..").unwrap_err();
        assert!(matches!(err, Error::Confinement { .. }));
        assert!(err.is_state_error());
        assert!(ns.at_root());

        let err = ns.change_directory("..").unwrap_err();
        assert!(matches!(err, Error::Confinement { .. }));
        assert_eq!(ns.cwd(), ns.root());
    }

    proptest! {
        #[test]
        fn prop_navigation_stays_under_root(
            ops in proptest::collection::vec(
                prop_oneof![
                    Just(".."), Just("a"), Just("b"), Just(""), Just("a/b"), Just("../.."), Just("zz")
                ],
                0..20,
            )
        ) {
            let (_dir, mut ns) = manager();
            ns.make_directory("a").unwrap();
            ns.make_directory("b").unwrap();
            ns.change_directory("a").unwrap();
            ns.make_directory("b").unwrap();
            ns.change_directory("").unwrap();

            for op in ops {
                let was_root = ns.at_root();
                let result = ns.change_directory(op);
                prop_assert!(ns.cwd().starts_with(ns.root()));
                if was_root && op == ".." {
                    prop_assert!(result.is_err());
                    prop_assert!(ns.at_root());
                }
            }
        }
    }
}
