//! Per-transition lookup table

use crate::status::BuildTransition;

/// One optional entry per [`BuildTransition`], indexed by ordinal.
///
/// A missing entry means "do nothing" for that transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionTable<T> {
    entries: [Option<T>; 4],
}

impl<T> Default for TransitionTable<T> {
    fn default() -> Self {
        Self {
            entries: [None, None, None, None],
        }
    }
}

impl<T> TransitionTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill every entry from `f`
    pub fn from_fn(mut f: impl FnMut(BuildTransition) -> Option<T>) -> Self {
        let mut table = Self::new();
        for transition in BuildTransition::ALL {
            table.entries[transition.ordinal()] = f(transition);
        }
        table
    }

    pub fn with(mut self, transition: BuildTransition, value: T) -> Self {
        self.set(transition, Some(value));
        self
    }

    pub fn set(&mut self, transition: BuildTransition, value: Option<T>) {
        self.entries[transition.ordinal()] = value;
    }

    pub fn get(&self, transition: BuildTransition) -> Option<&T> {
        self.entries[transition.ordinal()].as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(Option::is_none)
    }
}
