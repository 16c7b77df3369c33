/// Named boolean facts of a playthrough.

use rustc_hash::FxHashSet;

use crate::schema::bounded::CapacityExceeded;

/// Default number of distinct flags a playthrough may hold.
pub const MAX_FLAGS: usize = 64;

/// An unordered, deduplicated set of flag names with a fixed capacity.
///
/// Adding to a full store fails with [`CapacityExceeded`] and leaves the
/// store untouched; callers treat that as a dropped flag, not a fault.
/// The empty name is never stored and always counts as present, matching
/// the "unspecified predicate holds" rule of auto-checks.
#[derive(Debug, Clone)]
pub struct FlagStore {
    flags: FxHashSet<String>,
    capacity: usize,
}

impl Default for FlagStore {
    fn default() -> Self {
        Self::with_capacity(MAX_FLAGS)
    }
}

impl FlagStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            flags: FxHashSet::default(),
            capacity,
        }
    }

    pub fn has(&self, name: &str) -> bool {
        name.is_empty() || self.flags.contains(name)
    }

    /// Insert `name`. Returns whether the set changed.
    pub fn add(&mut self, name: &str) -> Result<bool, CapacityExceeded> {
        if name.is_empty() || self.flags.contains(name) {
            return Ok(false);
        }
        if self.flags.len() >= self.capacity {
            return Err(CapacityExceeded {
                capacity: self.capacity,
            });
        }
        self.flags.insert(name.to_string());
        Ok(true)
    }

    /// Remove `name` if present. Returns whether the set changed.
    pub fn remove(&mut self, name: &str) -> bool {
        self.flags.remove(name)
    }

    pub fn clear(&mut self) {
        self.flags.clear();
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Flag names in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.flags.iter().map(String::as_str)
    }

    /// Flag names sorted, for stable display.
    pub fn sorted(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.iter().collect();
        names.sort_unstable();
        names
    }
}
