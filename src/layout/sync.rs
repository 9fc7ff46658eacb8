//! Layout synchronization
//!
//! Reconcile the layout store against the configured input sources.
//! Repeated passes with an unchanged source list neither load nor evict
//! anything, since the configuration can signal changes for unrelated keys.

use log::{debug, info, warn};
use std::collections::HashSet;

use super::loader::{LayoutLoader, LoadError};
use super::store::LayoutStore;
use super::{LayoutEntry, LayoutId, LayoutKind, LayoutResource};
use crate::constants::{FALLBACK_DISPLAY_NAME, FALLBACK_LAYOUT_ID, SOURCE_TYPE_XKB};
use crate::session::SessionError;

/// One configured input source, e.g. `("xkb", "de+neo")`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub kind: String,
    pub id: String,
}

impl SourceDescriptor {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }

    pub fn xkb(id: impl Into<String>) -> Self {
        Self::new(SOURCE_TYPE_XKB, id)
    }

    pub fn is_xkb(&self) -> bool {
        self.kind == SOURCE_TYPE_XKB
    }

    /// Resolve to the canonical `layout[+variant]` id
    pub fn layout_id(&self) -> Result<LayoutId, LoadError> {
        let (layout, variant) = match self.id.split_once('+') {
            Some((layout, variant)) => (layout, Some(variant)),
            None => (self.id.as_str(), None),
        };
        let layout = layout.trim();
        if layout.is_empty() {
            return Err(LoadError::InvalidId(self.id.clone()));
        }
        Ok(LayoutId::from_xkb(layout, variant.map(str::trim)))
    }
}

/// Outcome of a reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncResult {
    /// Every id held by the store after the pass, `terminal` included
    pub layouts: Vec<LayoutId>,
    /// New active layout, `None` when the selection is left unchanged
    pub selected: Option<LayoutId>,
    /// Layouts loaded during this pass
    pub loaded: Vec<LayoutId>,
    /// Layouts evicted during this pass
    pub evicted: Vec<LayoutId>,
}

/// Owns the layout store and keeps it in line with the configured sources
pub struct LayoutSynchronizer<L: LayoutLoader> {
    store: LayoutStore,
    loader: L,
    /// Source snapshot of the previous pass
    last_sources: Vec<SourceDescriptor>,
    /// Layouts that failed to load for `last_sources`
    failed: HashSet<LayoutId>,
}

impl<L: LayoutLoader> LayoutSynchronizer<L> {
    pub fn new(loader: L) -> Self {
        Self {
            store: LayoutStore::new(),
            loader,
            last_sources: Vec::new(),
            failed: HashSet::new(),
        }
    }

    pub fn store(&self) -> &LayoutStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut LayoutStore {
        &mut self.store
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Install the permanent terminal layout
    ///
    /// Uses the built-in terminal layout when the loader has no resource for it.
    pub fn install_terminal(&mut self) {
        let id = LayoutId::terminal();
        if self.store.contains(&id) {
            return;
        }
        let resource = match self.loader.load(LayoutKind::Terminal, &id) {
            Ok(resource) => resource,
            Err(e) => {
                debug!("No terminal layout resource ({}), using built-in", e);
                LayoutResource::builtin_terminal()
            }
        };
        self.store.insert(LayoutEntry::new(id, LayoutKind::Terminal, resource));
    }

    /// Look up `id` in the store, loading it when absent
    ///
    /// Returns true if the layout had to be loaded.
    pub fn ensure_layout(&mut self, id: &LayoutId) -> Result<bool, LoadError> {
        if self.store.contains(id) {
            return Ok(false);
        }
        let resource = self.loader.load(LayoutKind::Xkb, id)?;
        self.store.insert(LayoutEntry::new(id.clone(), LayoutKind::Xkb, resource));
        Ok(true)
    }

    fn ensure_fallback(&mut self) -> Result<(LayoutId, bool), LoadError> {
        let id = LayoutId::new(FALLBACK_LAYOUT_ID);
        if self.store.contains(&id) {
            return Ok((id, false));
        }
        let mut resource = self.loader.load(LayoutKind::Xkb, &id)?;
        resource.display_name = FALLBACK_DISPLAY_NAME.to_string();
        self.store.insert(LayoutEntry::new(id.clone(), LayoutKind::Xkb, resource));
        Ok((id, true))
    }

    /// Reconcile the store against `sources`
    ///
    /// `active` is the currently presented layout. It stays selected when it
    /// survives the pass, otherwise the first resolved source is selected.
    /// A source that fails to resolve is skipped, it never aborts the pass.
    /// Failed layouts are not requested again until the snapshot changes.
    /// Fails only when the fallback layout cannot be installed, in which case
    /// no layout has been evicted.
    pub fn reconcile(
        &mut self,
        sources: &[SourceDescriptor],
        active: Option<&LayoutId>,
    ) -> Result<SyncResult, SessionError> {
        if self.last_sources != sources {
            self.failed.clear();
            self.last_sources = sources.to_vec();
        }

        let old = self.store.xkb_ids();
        let mut new: Vec<LayoutId> = Vec::new();
        let mut loaded = Vec::new();
        let mut first: Option<LayoutId> = None;

        for source in sources {
            if !source.is_xkb() {
                debug!("Not a xkb layout: '{}' ({}) - ignoring", source.id, source.kind);
                continue;
            }

            let id = match source.layout_id() {
                Ok(id) => id,
                Err(e) => {
                    warn!("Failed to get layout info for '{}': {}", source.id, e);
                    continue;
                }
            };

            if self.failed.contains(&id) {
                debug!("Skipping '{}', failed to load for this snapshot", id);
                continue;
            }

            match self.ensure_layout(&id) {
                Ok(true) => loaded.push(id.clone()),
                Ok(false) => {}
                Err(e) => {
                    warn!("Failed to load osk layout for '{}': {}", id, e);
                    self.failed.insert(id);
                    continue;
                }
            }

            if first.is_none() {
                first = Some(id.clone());
            }
            if !new.contains(&id) {
                new.push(id);
            }
        }

        // Never leave the keyboard without an xkb layout
        if new.is_empty() {
            let (id, was_loaded) = self
                .ensure_fallback()
                .map_err(|source| SessionError::EmptyLayoutSet { source })?;
            info!("No usable input source, using fallback layout '{}'", id);
            if was_loaded {
                loaded.push(id.clone());
            }
            new.push(id);
        }

        let mut evicted: Vec<LayoutId> = old.into_iter().filter(|id| !new.contains(id)).collect();
        evicted.sort();
        for id in &evicted {
            self.store.remove(id);
        }

        let selected = match active {
            Some(prev) if prev.is_terminal() || new.contains(prev) => None,
            _ => first.or_else(|| new.first().cloned()),
        };

        debug!(
            "Reconciled {} sources: {} loaded, {} evicted, selected {:?}",
            sources.len(),
            loaded.len(),
            evicted.len(),
            selected
        );

        Ok(SyncResult {
            layouts: self.store.ids(),
            selected,
            loaded,
            evicted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Loader knowing a fixed set of layouts, counting requests
    struct FakeLoader {
        known: HashSet<&'static str>,
        requests: Vec<String>,
    }

    impl FakeLoader {
        fn new(known: &[&'static str]) -> Self {
            Self {
                known: known.iter().copied().collect(),
                requests: Vec::new(),
            }
        }
    }

    impl LayoutLoader for FakeLoader {
        fn load(&mut self, _kind: LayoutKind, id: &LayoutId) -> Result<LayoutResource, LoadError> {
            self.requests.push(id.to_string());
            if self.known.contains(id.as_str()) {
                Ok(LayoutResource::new(format!("Layout {}", id)))
            } else {
                Err(LoadError::NoLevels(id.to_string()))
            }
        }
    }

    fn sync(known: &[&'static str]) -> LayoutSynchronizer<FakeLoader> {
        let mut sync = LayoutSynchronizer::new(FakeLoader::new(known));
        sync.install_terminal();
        sync
    }

    fn ids(result: &SyncResult) -> Vec<&str> {
        result.layouts.iter().map(LayoutId::as_str).collect()
    }

    #[test]
    fn test_source_layout_id() {
        assert_eq!(SourceDescriptor::xkb("us").layout_id().unwrap().as_str(), "us");
        assert_eq!(SourceDescriptor::xkb("de+neo").layout_id().unwrap().as_str(), "de+neo");
        assert_eq!(SourceDescriptor::xkb("fr+").layout_id().unwrap().as_str(), "fr");
        assert!(SourceDescriptor::xkb("+neo").layout_id().is_err());
        assert!(SourceDescriptor::xkb("").layout_id().is_err());
    }

    #[test]
    fn test_terminal_uses_builtin_when_missing() {
        let sync = sync(&["us"]);
        let entry = sync.store().get(&LayoutId::terminal()).unwrap();
        assert_eq!(entry.kind, LayoutKind::Terminal);
        assert_eq!(entry.display_name(), "Terminal");
    }

    #[test]
    fn test_reconcile_selects_first_resolved() {
        let mut sync = sync(&["us", "de+neo"]);
        let sources = [SourceDescriptor::xkb("us"), SourceDescriptor::xkb("de+neo")];
        let result = sync.reconcile(&sources, None).unwrap();
        assert_eq!(ids(&result), vec!["de+neo", "terminal", "us"]);
        assert_eq!(result.selected, Some(LayoutId::new("us")));
        assert_eq!(result.loaded.len(), 2);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let mut sync = sync(&["us", "de"]);
        let sources = [SourceDescriptor::xkb("us"), SourceDescriptor::xkb("de")];
        let first = sync.reconcile(&sources, None).unwrap();
        let requests = sync.loader().requests.len();
        let revision = sync.store().revision();

        let second = sync.reconcile(&sources, first.selected.as_ref()).unwrap();
        assert_eq!(sync.loader().requests.len(), requests);
        assert_eq!(sync.store().revision(), revision);
        assert_eq!(second.layouts, first.layouts);
        assert_eq!(second.selected, None);
        assert!(second.loaded.is_empty());
        assert!(second.evicted.is_empty());
    }

    #[test]
    fn test_reconcile_empty_installs_fallback() {
        let mut sync = sync(&["us"]);
        let result = sync.reconcile(&[], None).unwrap();
        assert_eq!(ids(&result), vec!["terminal", "us"]);
        assert_eq!(result.selected, Some(LayoutId::new("us")));
        let us = sync.store().get(&LayoutId::new("us")).unwrap();
        assert_eq!(us.display_name(), "English (USA)");

        // Fallback is reused, not reloaded
        let revision = sync.store().revision();
        let again = sync.reconcile(&[], Some(&LayoutId::new("us"))).unwrap();
        assert_eq!(ids(&again), vec!["terminal", "us"]);
        assert_eq!(sync.store().revision(), revision);
        assert_eq!(again.selected, None);
    }

    #[test]
    fn test_reconcile_evicts_removed_layouts() {
        let mut sync = sync(&["us", "de"]);
        let both = [SourceDescriptor::xkb("us"), SourceDescriptor::xkb("de")];
        sync.reconcile(&both, None).unwrap();

        let result = sync
            .reconcile(&[SourceDescriptor::xkb("de")], Some(&LayoutId::new("us")))
            .unwrap();
        assert_eq!(ids(&result), vec!["de", "terminal"]);
        assert_eq!(result.evicted, vec![LayoutId::new("us")]);
        assert_eq!(result.selected, Some(LayoutId::new("de")));
    }

    #[test]
    fn test_reconcile_skips_bad_sources() {
        let mut sync = sync(&["us", "de"]);
        let sources = [
            SourceDescriptor::new("ibus", "anthy"),
            SourceDescriptor::xkb("xx"),
            SourceDescriptor::xkb("de"),
            SourceDescriptor::xkb("us"),
        ];
        let result = sync.reconcile(&sources, None).unwrap();
        assert_eq!(ids(&result), vec!["de", "terminal", "us"]);
        assert_eq!(result.selected, Some(LayoutId::new("de")));
        assert!(!sync.loader().requests.contains(&"anthy".to_string()));
    }

    #[test]
    fn test_reconcile_preserves_surviving_selection() {
        let mut sync = sync(&["us", "de"]);
        let sources = [SourceDescriptor::xkb("us"), SourceDescriptor::xkb("de")];
        sync.reconcile(&sources, None).unwrap();

        let result = sync.reconcile(&sources, Some(&LayoutId::new("de"))).unwrap();
        assert_eq!(result.selected, None);

        let result = sync.reconcile(&sources, Some(&LayoutId::terminal())).unwrap();
        assert_eq!(result.selected, None);
    }

    #[test]
    fn test_reconcile_fails_without_fallback() {
        let mut sync = sync(&["de"]);
        sync.reconcile(&[SourceDescriptor::xkb("de")], None).unwrap();

        let err = sync.reconcile(&[SourceDescriptor::xkb("xx")], Some(&LayoutId::new("de")));
        assert!(matches!(err, Err(SessionError::EmptyLayoutSet { .. })));
        // Nothing evicted on failure
        assert!(sync.store().contains(&LayoutId::new("de")));
    }

    #[test]
    fn test_failed_source_not_reloaded() {
        let mut sync = sync(&["de", "us"]);
        let sources = [SourceDescriptor::xkb("fr"), SourceDescriptor::xkb("de")];

        let first = sync.reconcile(&sources, None).unwrap();
        assert_eq!(first.selected, Some(LayoutId::new("de")));
        let requests = sync.loader().requests.len();

        let second = sync.reconcile(&sources, first.selected.as_ref()).unwrap();
        assert_eq!(sync.loader().requests.len(), requests);
        assert_eq!(second.selected, None);
        assert_eq!(ids(&second), vec!["de", "terminal"]);

        // A changed snapshot asks the loader again
        let sources = [SourceDescriptor::xkb("fr"), SourceDescriptor::xkb("us")];
        sync.reconcile(&sources, Some(&LayoutId::new("de"))).unwrap();
        let tail = &sync.loader().requests[requests..];
        assert_eq!(tail, ["fr".to_string(), "us".to_string()]);
    }
}
