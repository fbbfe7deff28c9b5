// cyclic index over a fixed sequence.

use crate::error::EmptyRingError;


/// Round-robin source over a fixed, non-empty sequence
///
/// Each call to [`next`](Self::next) yields the element under the cursor and advances it, wrapping
/// back to the first element after the last. Only the owner advances the cursor, so no
/// synchronization is involved.
#[derive(Debug, Clone)]
pub struct Ring<T> {
    elements: Vec<T>,
    idx: usize,
}

impl<T> Ring<T> {
    /// Construct over `elements`, failing if there are none
    pub fn new(elements: Vec<T>) -> Result<Self, EmptyRingError> {
        if elements.is_empty() {
            return Err(EmptyRingError);
        }
        Ok(Ring { elements, idx: 0 })
    }

    /// Yield the element under the cursor and advance the cursor
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> &T {
        let idx = self.idx;
        self.idx = (idx + 1) % self.elements.len();
        &self.elements[idx]
    }

    /// Number of elements in the ring
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Always false, since construction rejects empty sequences
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Take back the underlying sequence
    pub fn into_inner(self) -> Vec<T> {
        self.elements
    }
}
