//! Registry-resident concept records

use borow_core::{ConceptId, MetaSnapshot};
use chrono::{DateTime, Utc};
use std::any::{type_name, Any};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// What a fresh binding did with the caller's slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Binding {
    /// The concept already held a value of the slot's type; the slot took it.
    Adopted,
    /// The slot's value became the concept's cached value.
    Seeded,
}

/// Provenance stamped onto a concept by each acquisition.
#[derive(Clone, Debug)]
pub(crate) struct Observation {
    pub context_name: String,
    pub source: String,
    pub future_usage: String,
    pub respect_level: i32,
    pub callsite: String,
}

struct CachedValue {
    value: Box<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl CachedValue {
    fn new<T: Clone + Send + Sync + 'static>(value: T) -> Self {
        Self {
            value: Box::new(value),
            type_name: type_name::<T>(),
        }
    }

    fn get<T: 'static>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

struct ConceptState {
    value: Option<CachedValue>,
    is_aware: bool,
    is_intentional: bool,
    last_observed_at: DateTime<Utc>,
    last_mutated_at: Option<DateTime<Utc>>,
    context_name: String,
    source: String,
    future_usage: String,
    respect_level: i32,
    callsite: String,
}

/// The canonical, shared identity of a tracked value.
///
/// Field updates are individually consistent but a concept is not a
/// linearizable shared variable: handles on different flows may interleave
/// their reads and writes.
pub struct Concept {
    id: ConceptId,
    display_name: String,
    state: RwLock<ConceptState>,
}

impl Concept {
    pub(crate) fn new(id: ConceptId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            state: RwLock::new(ConceptState {
                value: None,
                is_aware: false,
                is_intentional: false,
                last_observed_at: Utc::now(),
                last_mutated_at: None,
                context_name: "default".into(),
                source: "unknown".into(),
                future_usage: "unspecified".into(),
                respect_level: borow_core::DEFAULT_RESPECT_LEVEL,
                callsite: String::new(),
            }),
        }
    }

    pub fn id(&self) -> &ConceptId {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn is_aware(&self) -> bool {
        self.read().is_aware
    }

    pub fn is_intentional(&self) -> bool {
        self.read().is_intentional
    }

    /// Record an acquisition and reconcile the caller's slot with the cached value.
    pub(crate) fn bind<T>(&self, observation: Observation, slot: &mut T) -> Binding
    where
        T: Clone + Send + Sync + 'static,
    {
        let mut state = self.write();
        state.is_aware = true;
        state.last_observed_at = Utc::now();
        state.context_name = observation.context_name;
        state.source = observation.source;
        state.future_usage = observation.future_usage;
        state.respect_level = observation.respect_level;
        state.callsite = observation.callsite;

        match state.value.as_ref().and_then(CachedValue::get::<T>) {
            Some(existing) => {
                *slot = existing.clone();
                Binding::Adopted
            }
            None => {
                if let Some(cached) = &state.value {
                    debug!(
                        concept = %self.id,
                        cached = cached.type_name,
                        handle = type_name::<T>(),
                        "Reseeding concept with a different value type"
                    );
                }
                state.value = Some(CachedValue::new(slot.clone()));
                Binding::Seeded
            }
        }
    }

    /// Copy the cached value into `slot` if it has the slot's type.
    pub(crate) fn pull<T>(&self, slot: &mut T) -> bool
    where
        T: Clone + 'static,
    {
        let state = self.read();
        match state.value.as_ref() {
            Some(cached) => match cached.get::<T>() {
                Some(value) => {
                    *slot = value.clone();
                    true
                }
                None => {
                    debug!(
                        concept = %self.id,
                        cached = cached.type_name,
                        handle = type_name::<T>(),
                        "Cached value type mismatch, keeping local slot"
                    );
                    false
                }
            },
            None => false,
        }
    }

    /// Replace the cached value and mark the concept as intentionally mutated.
    pub(crate) fn store<T>(&self, value: T)
    where
        T: Clone + Send + Sync + 'static,
    {
        let mut state = self.write();
        state.value = Some(CachedValue::new(value));
        state.is_intentional = true;
        state.last_mutated_at = Some(Utc::now());
    }

    pub fn snapshot(&self) -> MetaSnapshot {
        let state = self.read();
        MetaSnapshot {
            concept_id: self.id.clone(),
            display_name: self.display_name.clone(),
            context_name: state.context_name.clone(),
            source: state.source.clone(),
            future_usage: state.future_usage.clone(),
            respect_level: state.respect_level,
            is_aware: state.is_aware,
            is_intentional: state.is_intentional,
            observed_at: state.last_observed_at,
            mutated_at: state.last_mutated_at,
            callsite: state.callsite.clone(),
            value_type: state.value.as_ref().map(|v| v.type_name.to_string()),
        }
    }

    // The guarded state is plain metadata and every writer leaves it whole,
    // so a poisoned lock is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, ConceptState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ConceptState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Concept {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Concept")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .finish_non_exhaustive()
    }
}
