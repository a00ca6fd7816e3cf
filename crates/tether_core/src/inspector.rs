//! # Inspector Registry
//!
//! Debugger-facing page list. A decorated runtime registers one page when
//! it is built with an inspector and unregisters it before the runtime
//! underneath is destroyed.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

/// Identifier of a registered inspector page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub u32);

/// One debuggable runtime as seen by an inspector frontend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InspectorPage {
    /// Page identifier.
    pub id: PageId,
    /// Title shown in the frontend.
    pub title: String,
    /// Engine description of the runtime behind the page.
    pub vm: String,
}

#[derive(Debug, Default)]
struct RegistryState {
    next_id: u32,
    pages: BTreeMap<PageId, InspectorPage>,
}

/// Shared page registry. Clones refer to the same set of pages.
#[derive(Clone, Debug, Default)]
pub struct InspectorRegistry {
    state: Arc<Mutex<RegistryState>>,
}

impl InspectorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a page. It stays listed until the registration is dropped.
    #[must_use]
    pub fn register(&self, title: impl Into<String>, vm: impl Into<String>) -> InspectorRegistration {
        let page = {
            let mut state = self.state.lock();
            let id = PageId(state.next_id);
            state.next_id = state.next_id.wrapping_add(1);
            let page = InspectorPage {
                id,
                title: title.into(),
                vm: vm.into(),
            };
            state.pages.insert(id, page.clone());
            page
        };

        tracing::debug!(page = page.id.0, title = %page.title, "inspector page registered");

        InspectorRegistration {
            registry: self.clone(),
            id: page.id,
        }
    }

    /// Snapshot of all registered pages, ordered by id.
    #[must_use]
    pub fn pages(&self) -> Vec<InspectorPage> {
        self.state.lock().pages.values().cloned().collect()
    }

    /// Looks up a single page.
    #[must_use]
    pub fn page(&self, id: PageId) -> Option<InspectorPage> {
        self.state.lock().pages.get(&id).cloned()
    }

    /// Number of registered pages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().pages.len()
    }

    /// Returns whether no pages are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn unregister(&self, id: PageId) -> bool {
        let removed = self.state.lock().pages.remove(&id).is_some();
        if removed {
            tracing::debug!(page = id.0, "inspector page unregistered");
        }
        removed
    }
}

/// Keeps a page listed. Dropping it removes the page.
#[derive(Debug)]
pub struct InspectorRegistration {
    registry: InspectorRegistry,
    id: PageId,
}

impl InspectorRegistration {
    /// The registered page id.
    #[must_use]
    pub const fn id(&self) -> PageId {
        self.id
    }
}

impl Drop for InspectorRegistration {
    fn drop(&mut self) {
        self.registry.unregister(self.id);
    }
}
