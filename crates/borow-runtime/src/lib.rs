//! Borow Runtime - concept registry, ambient contexts, and aliasing handles
//!
//! A handle binds a caller's storage slot to a named concept. Handles that
//! share a concept identity stay in step: a write through one is visible
//! through the others on their next read. Every handle also carries the
//! provenance recorded at acquisition (context, source, respect level).
//!
//! This is bookkeeping, not borrow checking: nothing here prevents aliasing.

pub mod ambient;
pub mod concept;
pub mod handle;
pub mod registry;

mod macros;

pub use ambient::{
    current_context, enter_context, scope, spawn, spawn_thread, with_context, ContextGuard,
};
pub use borow_core::{
    address_of, make_context, Callsite, ConceptAddress, ConceptId, Context, Error, MetaSnapshot,
    Result, RuntimeConfig,
};
pub use concept::{Binding, Concept};
pub use handle::Handle;
pub use registry::{configure_global, global, ConceptRegistry};

/// Acquire a handle through the process-wide registry.
pub fn acquire_reference<'a, T>(
    slot: &'a mut T,
    context: Option<&Context>,
    identity: Option<&str>,
    callsite: Callsite<'_>,
) -> Result<Handle<'a, T>>
where
    T: Clone + Send + Sync + 'static,
{
    global().acquire(slot, context, identity, callsite)
}
