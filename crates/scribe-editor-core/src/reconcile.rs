//! Merging remote content into a live editor.
//!
//! Remote updates replace the whole document. The user's selection is
//! captured before the swap and put back after the host's next flush, once
//! the editor reports the new document size. Updates whose fingerprint
//! matches the current one (typically our own save echoed back) are ignored.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use scribe_common::{SyncEvent, SyncObserver, TracingObserver};

use crate::{EditorHandle, Fingerprint, Node, Scheduler, SelectionRange, hash_content};

/// Applies remote content to an editor.
pub struct UpdateReconciler<S> {
    scheduler: S,
    observer: Arc<dyn SyncObserver>,
}

impl<S: Scheduler> UpdateReconciler<S> {
    pub fn new(scheduler: S) -> Self {
        Self {
            scheduler,
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn SyncObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// `reconcile` with the standard content fingerprint.
    pub fn apply<E>(&self, editor: &Rc<RefCell<E>>, new_content: &Node, current: Fingerprint) -> Fingerprint
    where
        E: EditorHandle + 'static,
    {
        self.reconcile(editor, new_content, current, hash_content)
    }

    /// Apply `new_content` unless it hashes to `current`.
    ///
    /// Returns the fingerprint the caller should remember: the new one if the
    /// content was applied, otherwise `current`. A failed apply keeps
    /// `current` so the same update is tried again next time it arrives.
    pub fn reconcile<E, H>(
        &self,
        editor: &Rc<RefCell<E>>,
        new_content: &Node,
        current: Fingerprint,
        hash_fn: H,
    ) -> Fingerprint
    where
        E: EditorHandle + 'static,
        H: FnOnce(&Node) -> Fingerprint,
    {
        let next = hash_fn(new_content);
        if next == current {
            self.observer.on_event(&SyncEvent::UpdateSkipped {
                fingerprint: current.value(),
            });
            return current;
        }

        let selection = {
            let Ok(mut handle) = editor.try_borrow_mut() else {
                self.apply_failed("editor is busy");
                return current;
            };
            if handle.is_destroyed() {
                return current;
            }
            let selection = handle.selection();
            if let Err(e) = handle.set_content(new_content) {
                self.apply_failed(&e.to_string());
                return current;
            }
            selection
        };

        let weak = Rc::downgrade(editor);
        let observer = self.observer.clone();
        self.scheduler.after_flush(Box::new(move || {
            restore_selection(&weak, selection, observer.as_ref())
        }));

        self.observer.on_event(&SyncEvent::UpdateApplied {
            previous: current.value(),
            current: next.value(),
        });
        next
    }

    fn apply_failed(&self, error: &str) {
        self.observer
            .on_event(&SyncEvent::ApplyFailed { error: error.into() });
    }
}

/// Put `selection` back, clamped to the editor's current size.
fn restore_selection<E: EditorHandle>(
    editor: &Weak<RefCell<E>>,
    selection: SelectionRange,
    observer: &dyn SyncObserver,
) {
    let skipped = |reason: &str| {
        observer.on_event(&SyncEvent::SelectionSkipped {
            reason: reason.into(),
        })
    };

    let Some(editor) = editor.upgrade() else {
        return skipped("editor dropped");
    };
    let Ok(mut handle) = editor.try_borrow_mut() else {
        return skipped("editor busy");
    };
    if handle.is_destroyed() {
        return skipped("editor destroyed");
    }

    let clamped = selection.clamp(handle.doc_size());
    if !clamped.is_restorable() {
        return skipped("no selection to restore");
    }

    match handle.set_selection(clamped) {
        Ok(()) => observer.on_event(&SyncEvent::SelectionRestored {
            from: clamped.from,
            to: clamped.to,
        }),
        Err(e) => skipped(&e.to_string()),
    }
}
