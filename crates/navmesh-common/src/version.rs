//! Geometry versions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Version of a tile's geometry: (generation, revision)
///
/// `generation` identifies a manager incarnation and changes only when the manager is
/// torn down and recreated. `revision` is bumped on every accepted mutation within a
/// generation. Ordering is lexicographic, but versions from different generations are
/// only meaningful as "different".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version {
    pub generation: u64,
    pub revision: u64,
}

impl Version {
    pub const fn new(generation: u64, revision: u64) -> Self {
        Self {
            generation,
            revision,
        }
    }

    /// Check if both versions belong to the same manager incarnation
    pub fn same_generation(&self, other: &Version) -> bool {
        self.generation == other.generation
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.generation, self.revision)
    }
}
