//! The seam between scribe and a live rich-text editor.

use crate::{EditorError, Node, SelectionRange};

/// What scribe needs from an editor instance.
///
/// Both commands may fail; callers absorb failures rather than propagate
/// them into the sync loop.
pub trait EditorHandle {
    /// Current selection.
    fn selection(&self) -> SelectionRange;

    /// Size of the document content, the upper bound for selection endpoints.
    fn doc_size(&self) -> usize;

    /// Replace the whole document with `content`.
    fn set_content(&mut self, content: &Node) -> Result<(), EditorError>;

    /// Move the selection.
    fn set_selection(&mut self, selection: SelectionRange) -> Result<(), EditorError>;

    /// True once the editor has been torn down and must not be touched.
    fn is_destroyed(&self) -> bool {
        false
    }
}

/// Headless editor holding a node tree and a selection.
///
/// Useful for server-side sessions and tests; follows the same sizing rules
/// as a browser editor so selection clamping behaves identically.
#[derive(Debug, Clone)]
pub struct MemoryEditor {
    doc: Node,
    selection: SelectionRange,
    destroyed: bool,
}

impl MemoryEditor {
    pub fn new(doc: Node) -> Self {
        Self {
            doc,
            selection: SelectionRange::default(),
            destroyed: false,
        }
    }

    pub fn doc(&self) -> &Node {
        &self.doc
    }

    pub fn destroy(&mut self) {
        self.destroyed = true;
    }
}

impl EditorHandle for MemoryEditor {
    fn selection(&self) -> SelectionRange {
        self.selection
    }

    fn doc_size(&self) -> usize {
        self.doc.content_size()
    }

    fn set_content(&mut self, content: &Node) -> Result<(), EditorError> {
        if self.destroyed {
            return Err(EditorError::Destroyed);
        }
        self.doc = content.clone();
        // a fresh document keeps whatever part of the old selection still fits
        self.selection = self.selection.clamp(self.doc.content_size());
        Ok(())
    }

    fn set_selection(&mut self, selection: SelectionRange) -> Result<(), EditorError> {
        if self.destroyed {
            return Err(EditorError::Destroyed);
        }
        let size = self.doc.content_size();
        if !selection.fits(size) {
            return Err(EditorError::SelectionOutOfRange {
                from: selection.from,
                to: selection.to,
                size,
            });
        }
        self.selection = selection;
        Ok(())
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}
