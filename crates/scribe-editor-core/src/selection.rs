//! Selection ranges over the flattened document.

/// A `(from, to)` pair of document positions.
///
/// `from` may be greater than `to` for backwards selections; the pair is kept
/// as the editor reported it.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Default)]
pub struct SelectionRange {
    pub from: usize,
    pub to: usize,
}

impl SelectionRange {
    pub fn new(from: usize, to: usize) -> Self {
        Self { from, to }
    }

    /// Collapsed selection (cursor position).
    pub fn collapsed(offset: usize) -> Self {
        Self::new(offset, offset)
    }

    pub fn is_collapsed(&self) -> bool {
        self.from == self.to
    }

    /// Clamp both endpoints to `size`.
    pub fn clamp(self, size: usize) -> Self {
        Self {
            from: self.from.min(size),
            to: self.to.min(size),
        }
    }

    /// Whether this range is worth putting back after a content swap.
    ///
    /// A zero endpoint means the cursor sat at the very start (or there was
    /// no real selection), so restoring it would be a no-op at best.
    pub fn is_restorable(&self) -> bool {
        self.from > 0 && self.to > 0
    }

    pub fn fits(&self, size: usize) -> bool {
        self.from <= size && self.to <= size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp() {
        assert_eq!(SelectionRange::new(5, 5).clamp(3), SelectionRange::new(3, 3));
        assert_eq!(SelectionRange::new(2, 9).clamp(4), SelectionRange::new(2, 4));
        assert_eq!(SelectionRange::new(2, 3).clamp(10), SelectionRange::new(2, 3));
    }

    #[test]
    fn test_restorable() {
        assert!(SelectionRange::new(1, 4).is_restorable());
        assert!(!SelectionRange::new(0, 4).is_restorable());
        assert!(!SelectionRange::collapsed(0).is_restorable());
        assert!(!SelectionRange::new(5, 5).clamp(0).is_restorable());
    }

    #[test]
    fn test_fits() {
        assert!(SelectionRange::new(3, 3).fits(3));
        assert!(!SelectionRange::new(3, 4).fits(3));
    }
}
