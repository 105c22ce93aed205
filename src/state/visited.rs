//! Pages fetched during the current run

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Set of page paths already fetched in this run
///
/// Grows monotonically and is shared by every in-flight crawl branch. The
/// check-and-insert in [`VisitedPaths::insert`] is a single locked step, so two
/// branches racing on the same path cannot both win.
#[derive(Debug, Default)]
pub struct VisitedPaths {
    paths: Mutex<HashSet<String>>,
}

impl VisitedPaths {
    /// Creates an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `path` as visited
    ///
    /// Returns false if it had already been visited.
    pub fn insert(&self, path: &str) -> bool {
        let mut paths = self.lock();
        if paths.contains(path) {
            return false;
        }
        paths.insert(path.to_string())
    }

    /// Returns true if `path` has been visited
    pub fn contains(&self, path: &str) -> bool {
        self.lock().contains(path)
    }

    /// Number of visited paths
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.paths.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
