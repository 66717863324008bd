//! The linear indexer (spec §4.G/H): `O(n)` scan, the zero-configuration
//! default. Stateless — "a singleton constant; no allocation is associated
//! with it" (spec §4.H), modelled here as a unit struct rather than an
//! actual process-wide singleton (spec.md §9: thread-local/global
//! singletons should become ordinary per-task state).

use super::{Indexer, Keyed, PutOutcome};

/// Scans the element slice on every lookup. `set` is a no-op: a linear
/// indexer carries no state to patch up.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinearIndexer;

impl<T: Keyed> Indexer<T> for LinearIndexer {
    fn get(&self, elements: &[T], key: &T::Key) -> Option<usize> {
        elements.iter().position(|e| e.key() == key)
    }

    fn put(&mut self, elements: &[T], key: &T::Key) -> PutOutcome {
        match Indexer::get(self, elements, key) {
            Some(i) => PutOutcome::Existing(i),
            None => PutOutcome::New,
        }
    }

    fn del(&mut self, elements: &[T], key: &T::Key) -> Option<usize> {
        Indexer::get(self, elements, key)
    }

    fn set(&mut self, _elements: &[T], _index: usize, _key: &T::Key) {}
}
