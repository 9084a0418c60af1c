//! Test-case discovery
//!
//! Walks the corpus root depth-first with entries sorted by file name, so the
//! same tree always yields the same sequence. Symlinks are not followed: a link
//! is neither reported as a test nor descended into. Hidden entries get no
//! special treatment. Unreadable entries below the root are logged and skipped;
//! only an unreadable root is fatal.

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::errors::{HarnessError, Result};

/// A single test file, identified by absolute path and reported by its path
/// relative to the corpus root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    /// Absolute path passed to the interpreter
    pub path: PathBuf,
    /// Root-relative path using `/` separators
    pub display: String,
}

impl TestCase {
    fn new(root: &Path, path: PathBuf) -> Self {
        let display = display_path(path.strip_prefix(root).unwrap_or(&path));
        Self { path, display }
    }
}

/// Find every regular file under `root` whose name ends with `suffix`.
pub fn discover(root: &Path, suffix: &str) -> Result<Vec<TestCase>> {
    let discovery_error = |source| HarnessError::Discovery {
        path: root.to_path_buf(),
        source,
    };

    let root = fs::canonicalize(root).map_err(discovery_error)?;
    // Surface a missing or unreadable root before walking.
    fs::read_dir(&root).map_err(discovery_error)?;

    let mut cases = Vec::new();
    for entry in WalkDir::new(&root).follow_links(false).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => {
                let source = err.into_io_error().unwrap_or_else(|| std::io::Error::other("walk failed"));
                return Err(discovery_error(source));
            }
            Err(err) => {
                warn!("skipping unreadable entry: {}", err);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }
        if !entry.file_name().to_string_lossy().ends_with(suffix) {
            continue;
        }

        debug!("discovered {}", entry.path().display());
        cases.push(TestCase::new(&root, entry.into_path()));
    }

    Ok(cases)
}

fn display_path(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
