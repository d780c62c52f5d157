use std::sync::Arc;

use serde_json::{Map, Value};

use super::attrs::Attributes;
use super::exchange::ALTERNATE_EXCHANGE;
use crate::domain::{
    Dependency, EntityType, Exchange, LiveObject, ObjectId, PersistedRecord, RecoveryError,
};
use crate::ports::{LiveLookup, ObjectSpec, QueueSpec};
use crate::recovery::recoverer::wrong_parent_type;
use crate::recovery::{Outstanding, Recoverer, ResolveContext, UnresolvedObject};

pub struct QueueRecoverer;

impl Recoverer for QueueRecoverer {
    fn type_name(&self) -> EntityType {
        EntityType::QUEUE
    }

    fn create_unresolved_object(
        &self,
        record: &PersistedRecord,
        lookup: &dyn LiveLookup,
    ) -> Result<Box<dyn UnresolvedObject>, RecoveryError> {
        Ok(Box::new(UnresolvedQueue::new(record, lookup)?))
    }
}

struct UnresolvedQueue {
    id: ObjectId,
    name: String,
    durable: bool,
    arguments: Map<String, Value>,
    alternate_exchange: Option<Arc<Exchange>>,
    outstanding: Outstanding,
}

impl UnresolvedQueue {
    fn new(record: &PersistedRecord, lookup: &dyn LiveLookup) -> Result<Self, RecoveryError> {
        let attrs = Attributes::of(record);
        let mut unresolved = Self {
            id: record.id(),
            name: attrs.required_str("name")?,
            durable: attrs.bool_or("durable", true)?,
            arguments: attrs.map_or_empty("arguments")?,
            alternate_exchange: None,
            outstanding: Outstanding::new(),
        };

        if let Some(alternate) = attrs.optional_id(ALTERNATE_EXCHANGE)? {
            match lookup.lookup_live(&EntityType::EXCHANGE, alternate) {
                Some(LiveObject::Exchange(exchange)) => {
                    unresolved.alternate_exchange = Some(exchange)
                }
                _ => unresolved.outstanding.push(Dependency::new(
                    alternate,
                    EntityType::EXCHANGE,
                    ALTERNATE_EXCHANGE,
                )),
            }
        }
        Ok(unresolved)
    }
}

impl UnresolvedObject for UnresolvedQueue {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn entity_type(&self) -> EntityType {
        EntityType::QUEUE
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
        if let Some(dependency) = satisfied.first() {
            let exchange = live.as_exchange().ok_or_else(|| {
                wrong_parent_type(self.id, &EntityType::QUEUE, dependency, live)
            })?;
            self.alternate_exchange = Some(exchange.clone());
        }
        Ok(satisfied)
    }

    fn resolve(self: Box<Self>, ctx: &mut ResolveContext<'_>) -> Result<LiveObject, RecoveryError> {
        self.outstanding.ensure_empty(self.id)?;

        // Queue names are unique per virtual host.
        if let Some(existing) = ctx.graph.queue_named(&self.name) {
            return Ok(LiveObject::Queue(existing.clone()));
        }

        let spec = QueueSpec {
            id: self.id,
            name: self.name,
            durable: self.durable,
            alternate_exchange: self.alternate_exchange,
            arguments: self.arguments,
        };
        ctx.factory
            .build_live_object(ObjectSpec::Queue(spec), ctx.graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LiveGraph;
    use crate::impls::BrokerObjectFactory;
    use serde_json::json;

    #[test]
    fn name_is_required() {
        let graph = LiveGraph::new();
        let record = PersistedRecord::new(ObjectId::from_u128(1), EntityType::QUEUE)
            .with_attribute("durable", true);

        let err = QueueRecoverer
            .create_unresolved_object(&record, &graph)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            RecoveryError::MalformedRecord { ref reason, .. } if reason.contains("'name'")
        ));
    }

    #[test]
    fn satisfying_with_a_queue_is_a_wrong_type() {
        let mut graph = LiveGraph::new();
        let factory = BrokerObjectFactory::default();
        let other = PersistedRecord::new(ObjectId::from_u128(2), EntityType::QUEUE)
            .with_attribute("name", "other");
        let mut ctx = ResolveContext::new(&mut graph, &factory);
        let live_queue = QueueRecoverer
            .create_unresolved_object(&other, &*ctx.graph)
            .unwrap()
            .resolve(&mut ctx)
            .unwrap();

        let record = PersistedRecord::new(ObjectId::from_u128(1), EntityType::QUEUE)
            .with_attribute("name", "orders")
            .with_attribute(ALTERNATE_EXCHANGE, json!(ObjectId::from_u128(2).to_string()));
        let mut unresolved = QueueRecoverer
            .create_unresolved_object(&record, &*ctx.graph)
            .unwrap();

        // The lookup is typed, so the id is declared as a dependency...
        assert_eq!(unresolved.outstanding_dependencies().len(), 1);
        // ...and handing over the queue with that id fails the record.
        let err = unresolved
            .satisfy(ObjectId::from_u128(2), &live_queue)
            .unwrap_err();
        assert!(matches!(err, RecoveryError::MalformedRecord { id, .. } if id == ObjectId::from_u128(1)));
    }

    #[test]
    fn arguments_are_kept() {
        let mut graph = LiveGraph::new();
        let factory = BrokerObjectFactory::default();
        let mut ctx = ResolveContext::new(&mut graph, &factory);
        let record = PersistedRecord::new(ObjectId::from_u128(1), EntityType::QUEUE)
            .with_attribute("name", "orders")
            .with_attribute("arguments", json!({ "x-max-length": 1000 }));

        let live = QueueRecoverer
            .create_unresolved_object(&record, &*ctx.graph)
            .unwrap()
            .resolve(&mut ctx)
            .unwrap();

        let queue = live.as_queue().unwrap();
        assert_eq!(queue.arguments.get("x-max-length"), Some(&json!(1000)));
        assert!(queue.durable);
    }
}
