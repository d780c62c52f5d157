//! Exchange records.
//!
//! An exchange depends on its alternate exchange when one is configured, so
//! exchanges can form chains (and, in a broken store, cycles).

use std::sync::Arc;

use serde_json::{Map, Value};

use super::attrs::Attributes;
use crate::domain::{
    Dependency, EntityType, Exchange, ExchangeType, LiveObject, ObjectId, PersistedRecord,
    RecoveryError,
};
use crate::ports::{ExchangeSpec, LiveLookup, ObjectSpec};
use crate::recovery::recoverer::wrong_parent_type;
use crate::recovery::{Outstanding, Recoverer, ResolveContext, UnresolvedObject};

pub const ALTERNATE_EXCHANGE: &str = "alternateExchange";

pub struct ExchangeRecoverer;

impl Recoverer for ExchangeRecoverer {
    fn type_name(&self) -> EntityType {
        EntityType::EXCHANGE
    }

    fn create_unresolved_object(
        &self,
        record: &PersistedRecord,
        lookup: &dyn LiveLookup,
    ) -> Result<Box<dyn UnresolvedObject>, RecoveryError> {
        Ok(Box::new(UnresolvedExchange::new(record, lookup)?))
    }
}

struct UnresolvedExchange {
    id: ObjectId,
    name: String,
    exchange_type: ExchangeType,
    durable: bool,
    arguments: Map<String, Value>,
    alternate_exchange: Option<Arc<Exchange>>,
    outstanding: Outstanding,
}

impl UnresolvedExchange {
    fn new(record: &PersistedRecord, lookup: &dyn LiveLookup) -> Result<Self, RecoveryError> {
        let attrs = Attributes::of(record);
        let name = attrs.required_str("name")?;
        let exchange_type = attrs
            .required_str("type")?
            .parse::<ExchangeType>()
            .map_err(|reason| RecoveryError::malformed(record.id(), &EntityType::EXCHANGE, reason))?;

        let mut unresolved = Self {
            id: record.id(),
            name,
            exchange_type,
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

impl UnresolvedObject for UnresolvedExchange {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn entity_type(&self) -> EntityType {
        EntityType::EXCHANGE
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
                wrong_parent_type(self.id, &EntityType::EXCHANGE, dependency, live)
            })?;
            self.alternate_exchange = Some(exchange.clone());
        }
        Ok(satisfied)
    }

    fn resolve(self: Box<Self>, ctx: &mut ResolveContext<'_>) -> Result<LiveObject, RecoveryError> {
        self.outstanding.ensure_empty(self.id)?;

        // Same name and type: the record describes an exchange that is already live.
        if let Some(existing) = ctx.graph.exchange_named(&self.name) {
            if existing.exchange_type != self.exchange_type {
                return Err(RecoveryError::malformed(
                    self.id,
                    &EntityType::EXCHANGE,
                    format!(
                        "exchange '{}' is already live as {} with type {}, record says {}",
                        self.name, existing.id, existing.exchange_type, self.exchange_type
                    ),
                ));
            }
            return Ok(LiveObject::Exchange(existing.clone()));
        }

        let spec = ExchangeSpec {
            id: self.id,
            name: self.name,
            exchange_type: self.exchange_type,
            durable: self.durable,
            alternate_exchange: self.alternate_exchange,
            arguments: self.arguments,
        };
        ctx.factory
            .build_live_object(ObjectSpec::Exchange(spec), ctx.graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LiveGraph;
    use crate::impls::BrokerObjectFactory;

    fn exchange_record(id: u128, name: &str, kind: &str) -> PersistedRecord {
        PersistedRecord::new(ObjectId::from_u128(id), EntityType::EXCHANGE)
            .with_attribute("name", name)
            .with_attribute("type", kind)
    }

    #[test]
    fn rejects_unknown_exchange_type() {
        let graph = LiveGraph::new();
        let err = ExchangeRecoverer
            .create_unresolved_object(&exchange_record(1, "e", "x-custom"), &graph)
            .err()
            .unwrap();
        assert!(matches!(err, RecoveryError::MalformedRecord { .. }));
    }

    #[test]
    fn alternate_exchange_is_a_dependency_until_live() {
        let graph = LiveGraph::new();
        let alt = ObjectId::from_u128(2);
        let record = exchange_record(1, "orders", "topic")
            .with_attribute(ALTERNATE_EXCHANGE, alt.to_string());

        let unresolved = ExchangeRecoverer
            .create_unresolved_object(&record, &graph)
            .unwrap();

        assert_eq!(
            unresolved.outstanding_dependencies(),
            &[Dependency::new(alt, EntityType::EXCHANGE, ALTERNATE_EXCHANGE)]
        );
    }

    #[test]
    fn same_name_and_type_resolves_to_the_live_exchange() {
        let mut graph = LiveGraph::new();
        let factory = BrokerObjectFactory::default();
        let mut ctx = ResolveContext::new(&mut graph, &factory);

        let first = ExchangeRecoverer
            .create_unresolved_object(&exchange_record(1, "amq.topic", "topic"), &*ctx.graph)
            .unwrap()
            .resolve(&mut ctx)
            .unwrap();
        let second = ExchangeRecoverer
            .create_unresolved_object(&exchange_record(2, "amq.topic", "topic"), &*ctx.graph)
            .unwrap()
            .resolve(&mut ctx)
            .unwrap();

        assert!(first.is_same(&second));
        assert_eq!(second.id(), ObjectId::from_u128(1));
    }

    #[test]
    fn same_name_other_type_is_a_conflict() {
        let mut graph = LiveGraph::new();
        let factory = BrokerObjectFactory::default();
        let mut ctx = ResolveContext::new(&mut graph, &factory);

        ExchangeRecoverer
            .create_unresolved_object(&exchange_record(1, "events", "topic"), &*ctx.graph)
            .unwrap()
            .resolve(&mut ctx)
            .unwrap();
        let err = ExchangeRecoverer
            .create_unresolved_object(&exchange_record(2, "events", "fanout"), &*ctx.graph)
            .unwrap()
            .resolve(&mut ctx)
            .unwrap_err();

        assert!(matches!(err, RecoveryError::MalformedRecord { id, .. } if id == ObjectId::from_u128(2)));
    }
}
