//! Binding records.
//!
//! A binding has two parents, the exchange it routes from and the queue it
//! routes to. Its `name` attribute is the binding key.

use std::sync::Arc;

use serde_json::{Map, Value};

use super::attrs::Attributes;
use crate::domain::{
    Dependency, EntityType, Exchange, LiveObject, ObjectId, PersistedRecord, Queue, RecoveryError,
};
use crate::ports::{BindingSpec, LiveLookup, ObjectSpec};
use crate::recovery::recoverer::wrong_parent_type;
use crate::recovery::{Outstanding, Recoverer, ResolveContext, UnresolvedObject};

pub struct BindingRecoverer;

impl Recoverer for BindingRecoverer {
    fn type_name(&self) -> EntityType {
        EntityType::BINDING
    }

    fn create_unresolved_object(
        &self,
        record: &PersistedRecord,
        lookup: &dyn LiveLookup,
    ) -> Result<Box<dyn UnresolvedObject>, RecoveryError> {
        Ok(Box::new(UnresolvedBinding::new(record, lookup)?))
    }
}

struct UnresolvedBinding {
    id: ObjectId,
    binding_key: String,
    arguments: Map<String, Value>,
    exchange: Option<Arc<Exchange>>,
    queue: Option<Arc<Queue>>,
    outstanding: Outstanding,
}

impl UnresolvedBinding {
    fn new(record: &PersistedRecord, lookup: &dyn LiveLookup) -> Result<Self, RecoveryError> {
        let attrs = Attributes::of(record);
        let exchange_id = attrs.required_parent(&EntityType::EXCHANGE)?;
        let queue_id = attrs.required_parent(&EntityType::QUEUE)?;

        let mut unresolved = Self {
            id: record.id(),
            binding_key: attrs.required_str("name")?,
            arguments: attrs.map_or_empty("arguments")?,
            exchange: None,
            queue: None,
            outstanding: Outstanding::new(),
        };

        match lookup.lookup_live(&EntityType::EXCHANGE, exchange_id) {
            Some(LiveObject::Exchange(exchange)) => unresolved.exchange = Some(exchange),
            _ => unresolved.outstanding.push(Dependency::new(
                exchange_id,
                EntityType::EXCHANGE,
                "exchange",
            )),
        }
        match lookup.lookup_live(&EntityType::QUEUE, queue_id) {
            Some(LiveObject::Queue(queue)) => unresolved.queue = Some(queue),
            _ => unresolved
                .outstanding
                .push(Dependency::new(queue_id, EntityType::QUEUE, "queue")),
        }
        Ok(unresolved)
    }

    fn missing_parent(&self, parent: &EntityType) -> RecoveryError {
        RecoveryError::inconsistency(
            self.id,
            format!("binding resolved without its {parent}"),
        )
    }
}

impl UnresolvedObject for UnresolvedBinding {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn entity_type(&self) -> EntityType {
        EntityType::BINDING
    }

    fn outstanding_dependencies(&self) -> &[Dependency] {
        self.outstanding.as_slice()
    }

    fn satisfy(
        &mut self,
        id: ObjectId,
        live: &LiveObject,
    ) -> Result<Vec<Dependency>, RecoveryError> {
        let satisfied = self.outstanding.take(id);
        for dependency in &satisfied {
            let mismatch = || wrong_parent_type(self.id, &EntityType::BINDING, dependency, live);
            if dependency.entity_type == EntityType::EXCHANGE {
                self.exchange = Some(live.as_exchange().ok_or_else(mismatch)?.clone());
            } else {
                self.queue = Some(live.as_queue().ok_or_else(mismatch)?.clone());
            }
        }
        Ok(satisfied)
    }

    fn resolve(self: Box<Self>, ctx: &mut ResolveContext<'_>) -> Result<LiveObject, RecoveryError> {
        self.outstanding.ensure_empty(self.id)?;
        let exchange = self
            .exchange
            .clone()
            .ok_or_else(|| self.missing_parent(&EntityType::EXCHANGE))?;
        let queue = self
            .queue
            .clone()
            .ok_or_else(|| self.missing_parent(&EntityType::QUEUE))?;

        // Default bindings are created by the broker itself, so the record
        // usually describes one that is already live.
        if let Some(existing) = ctx.graph.find_binding(exchange.id, &self.binding_key, queue.id) {
            tracing::debug!(
                record = %self.id,
                binding = %existing.id,
                key = %self.binding_key,
                "binding already live"
            );
            return Ok(LiveObject::Binding(existing.clone()));
        }

        let spec = BindingSpec {
            id: self.id,
            binding_key: self.binding_key,
            arguments: self.arguments,
            exchange,
            queue,
        };
        ctx.factory
            .build_live_object(ObjectSpec::Binding(spec), ctx.graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LiveGraph, ParentRef};
    use crate::impls::BrokerObjectFactory;
    use crate::recoverers::{ExchangeRecoverer, QueueRecoverer};

    fn binding_record(id: u128, key: &str, exchange: u128, queue: u128) -> PersistedRecord {
        PersistedRecord::new(ObjectId::from_u128(id), EntityType::BINDING)
            .with_attribute("name", key)
            .with_parent(ParentRef::new(ObjectId::from_u128(exchange), EntityType::EXCHANGE))
            .with_parent(ParentRef::new(ObjectId::from_u128(queue), EntityType::QUEUE))
    }

    fn restore(record: &PersistedRecord, recoverer: &dyn Recoverer, ctx: &mut ResolveContext<'_>) -> LiveObject {
        recoverer
            .create_unresolved_object(record, &*ctx.graph)
            .unwrap()
            .resolve(ctx)
            .unwrap()
    }

    #[test]
    fn both_parents_are_dependencies_until_live() {
        let graph = LiveGraph::new();
        let unresolved = BindingRecoverer
            .create_unresolved_object(&binding_record(3, "rk", 1, 2), &graph)
            .unwrap();

        assert_eq!(
            unresolved.outstanding_dependencies(),
            &[
                Dependency::new(ObjectId::from_u128(1), EntityType::EXCHANGE, "exchange"),
                Dependency::new(ObjectId::from_u128(2), EntityType::QUEUE, "queue"),
            ]
        );
    }

    #[test]
    fn missing_parent_is_malformed() {
        let graph = LiveGraph::new();
        let record = PersistedRecord::new(ObjectId::from_u128(3), EntityType::BINDING)
            .with_attribute("name", "rk")
            .with_parent(ParentRef::new(ObjectId::from_u128(1), EntityType::EXCHANGE));

        let err = BindingRecoverer
            .create_unresolved_object(&record, &graph)
            .err()
            .unwrap();
        assert!(matches!(err, RecoveryError::MalformedRecord { .. }));
    }

    #[test]
    fn links_to_live_parents() {
        let mut graph = LiveGraph::new();
        let factory = BrokerObjectFactory::default();
        let mut ctx = ResolveContext::new(&mut graph, &factory);

        let exchange = PersistedRecord::new(ObjectId::from_u128(1), EntityType::EXCHANGE)
            .with_attribute("name", "orders")
            .with_attribute("type", "direct");
        let queue = PersistedRecord::new(ObjectId::from_u128(2), EntityType::QUEUE)
            .with_attribute("name", "orders.eu");
        restore(&exchange, &ExchangeRecoverer, &mut ctx);
        restore(&queue, &QueueRecoverer, &mut ctx);

        let live = restore(&binding_record(3, "eu", 1, 2), &BindingRecoverer, &mut ctx);
        let binding = live.as_binding().unwrap();

        assert_eq!(binding.id, ObjectId::from_u128(3));
        assert_eq!(binding.binding_key, "eu");
        assert_eq!(binding.exchange.name, "orders");
        assert_eq!(binding.queue.name, "orders.eu");
    }

    #[test]
    fn default_binding_record_aliases_the_automatic_binding() {
        let mut graph = LiveGraph::new();
        let factory = BrokerObjectFactory::default();
        let mut ctx = ResolveContext::new(&mut graph, &factory);

        let default_exchange = PersistedRecord::new(ObjectId::from_u128(1), EntityType::EXCHANGE)
            .with_attribute("name", "")
            .with_attribute("type", "direct");
        let queue = PersistedRecord::new(ObjectId::from_u128(2), EntityType::QUEUE)
            .with_attribute("name", "work");
        restore(&default_exchange, &ExchangeRecoverer, &mut ctx);
        let live_queue = restore(&queue, &QueueRecoverer, &mut ctx);
        let bindings_before = ctx.graph.bindings().count();

        let live = restore(&binding_record(3, "work", 1, 2), &BindingRecoverer, &mut ctx);

        assert_ne!(live.id(), ObjectId::from_u128(3));
        assert_eq!(live.as_binding().unwrap().queue.id, live_queue.id());
        assert_eq!(ctx.graph.bindings().count(), bindings_before);
    }

    #[test]
    fn queue_where_exchange_expected_fails_the_binding() {
        let mut graph = LiveGraph::new();
        let factory = BrokerObjectFactory::default();
        let mut ctx = ResolveContext::new(&mut graph, &factory);
        let queue = PersistedRecord::new(ObjectId::from_u128(1), EntityType::QUEUE)
            .with_attribute("name", "q");
        let live_queue = restore(&queue, &QueueRecoverer, &mut ctx);

        let mut unresolved = BindingRecoverer
            .create_unresolved_object(&binding_record(3, "k", 1, 2), &*ctx.graph)
            .unwrap();
        let err = unresolved
            .satisfy(ObjectId::from_u128(1), &live_queue)
            .unwrap_err();

        assert!(matches!(err, RecoveryError::MalformedRecord { .. }));
    }
}
