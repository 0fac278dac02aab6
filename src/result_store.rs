//! Storage for encoded results of the latest run.

use std::sync::Arc;

use dashmap::DashMap;
use palettize::Encoded;
use parking_lot::Mutex;

use crate::common::generate_unique_id;

const ID_LEN: usize = 32;

/// Holds the results of the most recent run only. Starting a new run revokes every result of
/// the previous one.
#[derive(Default)]
pub struct ResultStore {
    results: DashMap<String, Arc<Encoded>>,
    generation: Mutex<u64>,
}

impl ResultStore {
    /// Revokes all stored results and returns the generation new results have to be stored
    /// under.
    pub fn begin_run(&self) -> u64 {
        let mut generation = self.generation.lock();
        *generation += 1;
        self.results.clear();
        *generation
    }

    /// Stores a result and returns its ID, unless a newer run has started since `generation`.
    pub fn insert(&self, generation: u64, encoded: Encoded) -> Option<String> {
        // Held while inserting so that a concurrent `begin_run` cannot slip in between.
        let current = self.generation.lock();
        if *current != generation {
            return None;
        }
        let id = generate_unique_id(ID_LEN);
        self.results.insert(id.clone(), Arc::new(encoded));
        Some(id)
    }

    pub fn get(&self, id: &str) -> Option<Arc<Encoded>> {
        self.results.get(id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }
}

#[cfg(test)]
mod tests {
    use palettize::OutputFormat;

    use super::*;

    fn encoded(byte: u8) -> Encoded {
        Encoded {
            width: 1,
            height: 1,
            format: OutputFormat::Png,
            bytes: vec![byte],
        }
    }

    #[test]
    fn new_runs_revoke_old_results() {
        let store = ResultStore::default();
        let first = store.begin_run();
        let id = store.insert(first, encoded(1)).unwrap();
        assert_eq!(store.get(&id).unwrap().bytes, [1]);

        let second = store.begin_run();
        assert!(store.get(&id).is_none());
        assert_eq!(store.len(), 0);

        assert!(store.insert(first, encoded(2)).is_none());
        let id = store.insert(second, encoded(3)).unwrap();
        assert_eq!(store.get(&id).unwrap().bytes, [3]);
        assert_eq!(store.len(), 1);
    }
}
