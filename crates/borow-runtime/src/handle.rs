//! Reference handles: a caller's storage slot bound to a shared concept

use crate::concept::Concept;
use borow_core::{ConceptAddress, ConceptId, MetaSnapshot};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Aliasing handle over a caller-owned slot and the concept it is bound to.
///
/// Reads pull the concept's cached value into the slot first, writes go
/// through to both. Propagation between handles is lazy: a write is seen by
/// another handle of the same concept on that handle's next read.
pub struct Handle<'a, T> {
    slot: &'a mut T,
    concept: Arc<Concept>,
}

impl<'a, T> Handle<'a, T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(slot: &'a mut T, concept: Arc<Concept>) -> Self {
        Self { slot, concept }
    }

    /// Pull-then-read.
    pub fn value(&mut self) -> &T {
        self.concept.pull(&mut *self.slot);
        &*self.slot
    }

    pub fn get(&mut self) -> T {
        self.value().clone()
    }

    /// Write through to the slot and the concept.
    pub fn set(&mut self, value: T) {
        trace!(concept = %self.concept.id(), "Write through handle");
        self.concept.store(value.clone());
        *self.slot = value;
    }

    /// Read, transform, write. The two steps are separate: another holder of
    /// the same concept may write in between.
    pub fn modify(&mut self, f: impl FnOnce(T) -> T) {
        let current = self.get();
        self.set(f(current));
    }
}

impl<T> Handle<'_, T> {
    pub fn concept_id(&self) -> &ConceptId {
        self.concept.id()
    }

    pub fn display_name(&self) -> &str {
        self.concept.display_name()
    }

    pub fn address(&self) -> ConceptAddress {
        self.concept.id().address()
    }

    pub fn metadata(&self) -> MetaSnapshot {
        self.concept.snapshot()
    }

    pub fn concept(&self) -> &Arc<Concept> {
        &self.concept
    }
}

impl<T> fmt::Display for Handle<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} + meaning({})", self.address(), self.display_name())
    }
}

impl<T: fmt::Debug> fmt::Debug for Handle<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("concept", self.concept.id())
            .field("address", &self.address())
            .field("slot", &self.slot)
            .finish()
    }
}
