//! Live object namespace (id -> live object).
//!
//! Design:
//! - Append-only: an id, once registered, always maps to the same object.
//! - A record id may alias an object with a different own id. This happens
//!   when a record describes an object that was already live (for example a
//!   default binding created when its queue was constructed).
//! - Name/key indexes only hold primary registrations (`object.id() == id`).

use std::collections::HashMap;
use std::sync::Arc;

use super::{Binding, EntityType, Exchange, LiveObject, ObjectId, Queue, RecoveryError};
use crate::ports::LiveLookup;

type BindingKey = (ObjectId, String, ObjectId);

#[derive(Debug, Default)]
pub struct LiveGraph {
    objects: HashMap<ObjectId, LiveObject>,

    /// Primary objects in registration order.
    primary: Vec<LiveObject>,

    exchanges_by_name: HashMap<String, Arc<Exchange>>,
    queues_by_name: HashMap<String, Arc<Queue>>,
    bindings_by_key: HashMap<BindingKey, Arc<Binding>>,
}

impl LiveGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `object` under `id`.
    ///
    /// Registering the same object twice under one id is a no-op; mapping an
    /// id to a different object is an invariant violation.
    pub fn register(&mut self, id: ObjectId, object: LiveObject) -> Result<(), RecoveryError> {
        if let Some(existing) = self.objects.get(&id) {
            if existing.is_same(&object) {
                return Ok(());
            }
            return Err(RecoveryError::inconsistency(
                id,
                format!(
                    "id already bound to {} '{}', refusing {} '{}'",
                    existing.entity_type(),
                    existing.name(),
                    object.entity_type(),
                    object.name()
                ),
            ));
        }

        if object.id() == id {
            self.index(&object);
            self.primary.push(object.clone());
        }
        self.objects.insert(id, object);
        Ok(())
    }

    fn index(&mut self, object: &LiveObject) {
        match object {
            LiveObject::Exchange(e) => {
                self.exchanges_by_name
                    .entry(e.name.clone())
                    .or_insert_with(|| e.clone());
            }
            LiveObject::Queue(q) => {
                self.queues_by_name
                    .entry(q.name.clone())
                    .or_insert_with(|| q.clone());
            }
            LiveObject::Binding(b) => {
                let key = (b.exchange.id, b.binding_key.clone(), b.queue.id);
                self.bindings_by_key.entry(key).or_insert_with(|| b.clone());
            }
        }
    }

    pub fn get(&self, id: ObjectId) -> Option<&LiveObject> {
        self.objects.get(&id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn exchange_named(&self, name: &str) -> Option<&Arc<Exchange>> {
        self.exchanges_by_name.get(name)
    }

    pub fn queue_named(&self, name: &str) -> Option<&Arc<Queue>> {
        self.queues_by_name.get(name)
    }

    pub fn find_binding(
        &self,
        exchange: ObjectId,
        binding_key: &str,
        queue: ObjectId,
    ) -> Option<&Arc<Binding>> {
        self.bindings_by_key
            .get(&(exchange, binding_key.to_string(), queue))
    }

    /// Primary objects, in the order they became live.
    pub fn objects(&self) -> impl Iterator<Item = &LiveObject> {
        self.primary.iter()
    }

    pub fn exchanges(&self) -> impl Iterator<Item = &Arc<Exchange>> {
        self.primary.iter().filter_map(LiveObject::as_exchange)
    }

    pub fn queues(&self) -> impl Iterator<Item = &Arc<Queue>> {
        self.primary.iter().filter_map(LiveObject::as_queue)
    }

    pub fn bindings(&self) -> impl Iterator<Item = &Arc<Binding>> {
        self.primary.iter().filter_map(LiveObject::as_binding)
    }

    /// Number of ids (primary and aliases) that resolve to a live object.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl LiveLookup for LiveGraph {
    fn lookup_live(&self, entity_type: &EntityType, id: ObjectId) -> Option<LiveObject> {
        self.objects
            .get(&id)
            .filter(|object| &object.entity_type() == entity_type)
            .cloned()
    }
}
