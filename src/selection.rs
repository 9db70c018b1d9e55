//! Tracks, per requested document, which data elements the holder has chosen to reveal.
//!
//! The store is the only mutable state shared between the UI toggle path and the
//! session's send path. Every mutation is a single atomic map update, so a
//! concurrent [`SelectionStore::snapshot`] always observes a fully-applied set of
//! toggles.

use std::sync::{Mutex, PoisonError};

use presentment_frontend::{DisclosedDocument, RequestedDocument};

/// Per-document disclosure selection for the current request.
#[derive(Debug, Default)]
pub struct SelectionStore {
    inner: Mutex<Vec<DocumentSelection>>,
}

#[derive(Debug, Clone)]
struct DocumentSelection {
    request: RequestedDocument,
    // Selection order, not request order, so callers can diff against earlier snapshots.
    selected: Vec<String>,
}

impl SelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a requested document with an empty selection.
    ///
    /// Registering the same document identifier again resets that document's
    /// selection. This is policy, not an error: the UI re-renders a request by
    /// re-registering its documents.
    pub fn register(&self, document: RequestedDocument) {
        let mut entries = self.lock();
        if let Some(entry) = entries.iter_mut().find(|e| e.request.id == document.id) {
            entry.request = document;
            entry.selected.clear();
        } else {
            entries.push(DocumentSelection {
                request: document,
                selected: Vec::new(),
            });
        }
    }

    /// Flip the selection state of one element of one document.
    ///
    /// A toggle for a document that was never registered, or for an element the
    /// verifier did not request, is dropped. The former guards against stale UI
    /// callbacks arriving after a session reset.
    pub fn toggle(&self, document_id: &str, element_id: &str) {
        let mut entries = self.lock();
        let Some(entry) = entries.iter_mut().find(|e| e.request.id == document_id) else {
            tracing::debug!(%document_id, "toggle for unregistered document dropped");
            return;
        };
        if !entry.request.elements.iter().any(|e| e == element_id) {
            tracing::debug!(%document_id, %element_id, "toggle for unrequested element dropped");
            return;
        }
        if let Some(position) = entry.selected.iter().position(|e| e == element_id) {
            entry.selected.remove(position);
        } else {
            entry.selected.push(element_id.to_owned());
        }
    }

    /// Project the current selection, one entry per registered document in
    /// registration order. Pure; the store is not modified.
    pub fn snapshot(&self) -> Vec<DisclosedDocument> {
        self.lock()
            .iter()
            .map(|entry| DisclosedDocument {
                id: entry.request.id.clone(),
                doc_type: entry.request.doc_type.clone(),
                selected_elements: entry.selected.clone(),
                requested: entry.request.clone(),
            })
            .collect()
    }

    /// Drop all registrations and selections. Called on new-request arrival and
    /// on session end.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<DocumentSelection>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod test {
    use presentment_frontend::ReaderIdentity;

    use super::*;

    fn mdl() -> RequestedDocument {
        RequestedDocument {
            id: "doc-1".into(),
            doc_type: "org.iso.18013.5.1.mDL".into(),
            elements: vec!["family_name".into(), "given_name".into(), "portrait".into()],
            reader: ReaderIdentity::default(),
        }
    }

    #[test]
    fn element_is_selected_iff_toggle_count_is_odd() {
        let store = SelectionStore::new();
        store.register(mdl());

        for round in 1..=4 {
            store.toggle("doc-1", "portrait");
            let selected = &store.snapshot()[0].selected_elements;
            if round % 2 == 1 {
                assert_eq!(selected, &["portrait".to_string()]);
            } else {
                assert!(selected.is_empty());
            }
        }
    }

    #[test]
    fn snapshot_never_contains_unrequested_elements() {
        let store = SelectionStore::new();
        store.register(mdl());

        store.toggle("doc-1", "family_name");
        store.toggle("doc-1", "nationality");
        store.toggle("doc-1", "portrait");

        let snapshot = store.snapshot();
        let request = &snapshot[0].requested;
        for element in &snapshot[0].selected_elements {
            assert!(request.elements.contains(element));
        }
        assert_eq!(
            snapshot[0].selected_elements,
            vec!["family_name".to_string(), "portrait".to_string()]
        );
    }

    #[test]
    fn reregistration_resets_selection() {
        let store = SelectionStore::new();
        store.register(mdl());
        store.toggle("doc-1", "family_name");
        store.toggle("doc-1", "portrait");

        store.register(mdl());
        assert!(store.snapshot()[0].selected_elements.is_empty());
    }

    #[test]
    fn toggle_for_unregistered_document_is_dropped() {
        let store = SelectionStore::new();
        store.toggle("doc-1", "family_name");
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn snapshot_preserves_registration_and_selection_order() {
        let store = SelectionStore::new();
        let mut second = mdl();
        second.id = "doc-2".into();
        store.register(mdl());
        store.register(second);

        store.toggle("doc-2", "portrait");
        store.toggle("doc-2", "family_name");

        let snapshot = store.snapshot();
        assert_eq!(snapshot[0].id, "doc-1");
        assert_eq!(snapshot[1].id, "doc-2");
        assert_eq!(
            snapshot[1].selected_elements,
            vec!["portrait".to_string(), "family_name".to_string()]
        );
    }

    #[test]
    fn clear_empties_registrations() {
        let store = SelectionStore::new();
        store.register(mdl());
        store.toggle("doc-1", "portrait");
        store.clear();
        assert!(store.snapshot().is_empty());
    }
}
