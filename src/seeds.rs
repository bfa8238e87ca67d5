//! Seed management for layout generation
//!
//! Provides separate seeds for each generation system, so a batch run can vary
//! one aspect of a layout while keeping the others constant. Regenerating with
//! the same master seed reproduces every structure bit-identically.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Seeds for all layout generation systems.
///
/// Each system gets its own seed, derived deterministically from a master seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayoutSeeds {
    /// Master seed (used for display/reference)
    pub master: u64,
    /// BSP partitioning (split ratios and axis tie-breaks)
    pub partition: u64,
    /// Room building (door and window positions)
    pub rooms: u64,
    /// L-system expansion (stochastic production selection)
    pub grammar: u64,
}

impl LayoutSeeds {
    /// Create seeds from a master seed, deriving all sub-seeds deterministically.
    pub fn from_master(master: u64) -> Self {
        Self {
            master,
            partition: derive_seed(master, "partition"),
            rooms: derive_seed(master, "rooms"),
            grammar: derive_seed(master, "grammar"),
        }
    }
}

impl Default for LayoutSeeds {
    fn default() -> Self {
        Self::from_master(rand::random())
    }
}

/// Derive a sub-seed from a master seed and a system name.
/// Hashing ensures different systems get different but deterministic seeds.
fn derive_seed(master: u64, system: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    master.hash(&mut hasher);
    system.hash(&mut hasher);
    hasher.finish()
}

impl std::fmt::Display for LayoutSeeds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "LayoutSeeds {{ master: {}, partition: {}, rooms: {}, grammar: {} }}",
            self.master, self.partition, self.rooms, self.grammar,
        )
    }
}
