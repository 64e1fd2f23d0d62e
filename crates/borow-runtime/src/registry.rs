//! Process-wide concept registry
//!
//! Grow-only: concepts are created on first acquisition of an identity and
//! live for the rest of the process. There is no removal and no eviction.

use crate::ambient;
use crate::concept::{Concept, Observation};
use crate::handle::Handle;
use borow_core::{Callsite, ConceptId, Context, Error, MetaSnapshot, Result, RuntimeConfig};
use dashmap::DashMap;
use std::sync::{Arc, OnceLock};
use tracing::{debug, trace};

static GLOBAL_REGISTRY: OnceLock<ConceptRegistry> = OnceLock::new();

/// The process-wide registry, built from the default config on first use.
pub fn global() -> &'static ConceptRegistry {
    GLOBAL_REGISTRY.get_or_init(ConceptRegistry::new)
}

/// Install the config for the process-wide registry. Must run before the
/// first acquisition through [`global`].
pub fn configure_global(config: RuntimeConfig) -> Result<()> {
    GLOBAL_REGISTRY
        .set(ConceptRegistry::with_config(config))
        .map_err(|_| Error::AlreadyConfigured)
}

pub struct ConceptRegistry {
    concepts: DashMap<ConceptId, Arc<Concept>>,
    config: RuntimeConfig,
}

impl Default for ConceptRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConceptRegistry {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            concepts: DashMap::with_capacity(config.registry.capacity_hint),
            config,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Look up a concept, creating it on first sight. Concurrent callers with
    /// the same identity all receive the one instance.
    pub fn get_or_create(&self, id: &ConceptId, display_name: &str) -> Arc<Concept> {
        self.concepts
            .entry(id.clone())
            .or_insert_with(|| {
                debug!(concept = %id, display_name, "Concept created");
                Arc::new(Concept::new(id.clone(), display_name))
            })
            .clone()
    }

    pub fn get(&self, id: &str) -> Option<Arc<Concept>> {
        self.concepts.get(id).map(|c| c.clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.concepts.contains_key(id)
    }

    pub fn metadata(&self, id: &str) -> Option<MetaSnapshot> {
        self.get(id).map(|c| c.snapshot())
    }

    pub fn ids(&self) -> Vec<ConceptId> {
        self.concepts.iter().map(|e| e.key().clone()).collect()
    }

    pub fn snapshots(&self) -> Vec<MetaSnapshot> {
        self.concepts.iter().map(|e| e.value().snapshot()).collect()
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    /// Bind `slot` to a concept and return a handle over both.
    ///
    /// Context resolution: `context`, else the ambient context, else the
    /// configured default. Fields a context leaves unset take the default's
    /// values. Identity resolution: `identity` as given if non-blank, else the caller
    /// file joined with the expression text.
    pub fn acquire<'a, T>(
        &self,
        slot: &'a mut T,
        context: Option<&Context>,
        identity: Option<&str>,
        callsite: Callsite<'_>,
    ) -> Result<Handle<'a, T>>
    where
        T: Clone + Send + Sync + 'static,
    {
        if !callsite.has_personality() {
            return Err(Error::no_personality(callsite.expression));
        }

        let observation = self.observe(context, &callsite);
        let id = match identity.filter(|s| !s.trim().is_empty()) {
            Some(explicit) => ConceptId::new(explicit),
            None => ConceptId::fallback(&callsite),
        };

        let concept = self.get_or_create(&id, callsite.expression);
        let context_name = observation.context_name.clone();
        let binding = concept.bind(observation, &mut *slot);
        trace!(concept = %id, context = %context_name, ?binding, "Concept acquired");

        Ok(Handle::new(slot, concept))
    }

    fn observe(&self, explicit: Option<&Context>, callsite: &Callsite<'_>) -> Observation {
        let inherited = match explicit {
            Some(_) => None,
            None => ambient::current_frame(),
        };
        let fallback;
        let context = match explicit.or(inherited.as_deref()) {
            Some(ctx) => ctx,
            None => {
                fallback = self.config.default_context();
                &fallback
            }
        };

        let defaults = &self.config.default_context;
        Observation {
            context_name: context.name.clone(),
            source: context
                .source
                .clone()
                .unwrap_or_else(|| defaults.source.clone()),
            future_usage: context
                .future_usage
                .clone()
                .unwrap_or_else(|| defaults.future_usage.clone()),
            respect_level: context.respect_level,
            callsite: callsite.location(),
        }
    }
}
