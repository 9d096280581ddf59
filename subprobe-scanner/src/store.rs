use crate::result::CandidateEndpoint;
use crate::validate::normalize_url_path;
use std::collections::HashSet;

/// Deduplicating, insertion-ordered collection of candidates for one run.
///
/// Entries are keyed on normalized path plus source. The first entry for a
/// key wins; later ones are dropped without merging.
#[derive(Debug, Default)]
pub struct ResultStore {
    entries: Vec<CandidateEndpoint>,
    keys: HashSet<String>,
}

/// Dedup key for a candidate.
pub fn dedup_key(entry: &CandidateEndpoint) -> String {
    format!("{}|{}", normalize_url_path(&entry.value), entry.source)
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts the entry unless its key is already present. Returns whether
    /// the entry was stored.
    pub fn add_result(&mut self, entry: CandidateEndpoint) -> bool {
        if !self.keys.insert(dedup_key(&entry)) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    /// All stored entries in insertion order.
    pub fn get_all_results(&self) -> &[CandidateEndpoint] {
        &self.entries
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut CandidateEndpoint> {
        self.entries.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_results(self) -> Vec<CandidateEndpoint> {
        self.entries
    }
}
