//! Layout store
//!
//! Owns every loaded layout, keyed by `LayoutId`.
//! Removing an entry drops its loaded resource.

use log::{debug, warn};
use std::collections::{HashMap, HashSet};

use super::{LayoutEntry, LayoutId};

/// Mapping from layout id to loaded layout
#[derive(Debug, Default)]
pub struct LayoutStore {
    entries: HashMap<LayoutId, LayoutEntry>,
    /// Bumped on every insertion or removal
    revision: u64,
}

impl LayoutStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &LayoutId) -> Option<&LayoutEntry> {
        self.entries.get(id)
    }

    pub fn get_mut(&mut self, id: &LayoutId) -> Option<&mut LayoutEntry> {
        self.entries.get_mut(id)
    }

    pub fn contains(&self, id: &LayoutId) -> bool {
        self.entries.contains_key(id)
    }

    /// Insert an entry, replacing any entry with the same id
    pub fn insert(&mut self, entry: LayoutEntry) {
        debug!("Adding layout '{}'", entry.id);
        self.revision += 1;
        self.entries.insert(entry.id.clone(), entry);
    }

    /// Evict an entry and release its resource
    ///
    /// The terminal entry is permanent and is never removed.
    pub fn remove(&mut self, id: &LayoutId) -> Option<LayoutEntry> {
        if id.is_terminal() {
            warn!("Refusing to remove permanent layout '{}'", id);
            return None;
        }
        let entry = self.entries.remove(id)?;
        debug!("Removing layout '{}'", id);
        self.revision += 1;
        Some(entry)
    }

    /// Ids of all evictable entries (everything but `terminal`)
    pub fn xkb_ids(&self) -> HashSet<LayoutId> {
        self.entries
            .keys()
            .filter(|id| !id.is_terminal())
            .cloned()
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LayoutEntry> {
        self.entries.values()
    }

    /// Sorted ids of all entries, `terminal` included
    pub fn ids(&self) -> Vec<LayoutId> {
        let mut ids: Vec<LayoutId> = self.entries.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Mutation counter, unchanged when nothing was inserted or removed
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{LayoutKind, LayoutResource};

    fn entry(id: &str) -> LayoutEntry {
        let kind = if id == "terminal" { LayoutKind::Terminal } else { LayoutKind::Xkb };
        LayoutEntry::new(LayoutId::new(id), kind, LayoutResource::new(id))
    }

    #[test]
    fn test_insert_and_remove() {
        let mut store = LayoutStore::new();
        store.insert(entry("terminal"));
        store.insert(entry("us"));
        store.insert(entry("de"));
        assert_eq!(store.ids().len(), 3);
        assert_eq!(store.xkb_ids().len(), 2);

        let removed = store.remove(&LayoutId::new("de"));
        assert_eq!(removed.map(|e| e.id), Some(LayoutId::new("de")));
        assert!(!store.contains(&LayoutId::new("de")));
        assert!(store.remove(&LayoutId::new("de")).is_none());
    }

    #[test]
    fn test_terminal_is_permanent() {
        let mut store = LayoutStore::new();
        store.insert(entry("terminal"));
        let rev = store.revision();
        assert!(store.remove(&LayoutId::terminal()).is_none());
        assert!(store.contains(&LayoutId::terminal()));
        assert_eq!(store.revision(), rev);
        assert!(store.xkb_ids().is_empty());
    }

    #[test]
    fn test_ids_sorted() {
        let mut store = LayoutStore::new();
        store.insert(entry("us"));
        store.insert(entry("de+neo"));
        store.insert(entry("terminal"));
        let ids: Vec<String> = store.ids().iter().map(|id| id.to_string()).collect();
        assert_eq!(ids, vec!["de+neo", "terminal", "us"]);
    }
}
