//! Memoization with explicit invalidation.
//!
//! A [`Dirty`] cell holds a derived value next to its validity. Setters on the
//! owning type call [`Dirty::invalidate`]; getters go through
//! [`Dirty::get_or_rebuild`], which recomputes only when the cell is invalid.
//! The rebuild counter makes the cycle observable in tests.

use std::cell::Cell;

#[derive(Debug, Clone, Default)]
pub struct Dirty<T: Copy> {
    cached: Cell<Option<T>>,
    rebuilds: Cell<u64>,
}

impl<T: Copy> Dirty<T> {
    pub fn new() -> Self {
        Self {
            cached: Cell::new(None),
            rebuilds: Cell::new(0),
        }
    }

    pub fn invalidate(&mut self) {
        self.cached.set(None);
    }

    pub fn is_dirty(&self) -> bool {
        self.cached.get().is_none()
    }

    /// Returns the cached value, running `rebuild` first if the cell was
    /// invalidated. The cell only becomes valid once `rebuild` has returned.
    pub fn get_or_rebuild(&self, rebuild: impl FnOnce() -> T) -> T {
        if let Some(value) = self.cached.get() {
            return value;
        }
        let value = rebuild();
        self.cached.set(Some(value));
        self.rebuilds.set(self.rebuilds.get() + 1);
        value
    }

    /// How many times the value has been recomputed.
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds.get()
    }
}
