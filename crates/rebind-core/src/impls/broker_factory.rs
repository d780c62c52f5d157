//! BrokerObjectFactory - in-process 版の ObjectFactory
//!
//! # 学習ポイント
//! - 構築と activation（`opened_at` の記録）を 1 か所に閉じ込める
//! - 構築の副作用として default binding を作り、graph に登録する
//! - 永続化レコードを持たない object には IdGenerator で新しい ID を振る

use std::sync::Arc;

use serde_json::Map;

use crate::domain::{
    Binding, DEFAULT_EXCHANGE_NAME, EntityType, Exchange, ExchangeType, LiveGraph, LiveObject,
    ObjectId, Queue, RecoveryError,
};
use crate::ports::{
    BindingSpec, Clock, ExchangeSpec, IdGenerator, ObjectFactory, ObjectSpec, QueueSpec,
    SystemClock, UlidGenerator,
};

/// Exchanges every virtual host declares on its own.
pub const STANDARD_EXCHANGES: [(&str, ExchangeType); 5] = [
    (DEFAULT_EXCHANGE_NAME, ExchangeType::Direct),
    ("amq.direct", ExchangeType::Direct),
    ("amq.topic", ExchangeType::Topic),
    ("amq.fanout", ExchangeType::Fanout),
    ("amq.match", ExchangeType::Headers),
];

/// BrokerObjectFactory は spec から Exchange / Queue / Binding を作る
///
/// # 暗黙の binding
/// - queue を作るとき default exchange が live なら、queue 名を key に bind
/// - default exchange を作るとき、live な queue すべてを bind
///
/// # 使用例
/// ```ignore
/// let factory = BrokerObjectFactory::new(Arc::new(SystemClock), ids);
/// let mut graph = LiveGraph::new();
/// factory.declare_standard_exchanges(&mut graph)?;
/// ```
pub struct BrokerObjectFactory {
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl BrokerObjectFactory {
    pub fn new(clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        Self { clock, ids }
    }

    /// Create the standard exchanges that are not live yet.
    ///
    /// Returns the exchanges created by this call.
    pub fn declare_standard_exchanges(
        &self,
        graph: &mut LiveGraph,
    ) -> Result<Vec<LiveObject>, RecoveryError> {
        let mut created = Vec::new();
        for (name, exchange_type) in STANDARD_EXCHANGES {
            if graph.exchange_named(name).is_some() {
                continue;
            }
            let spec = ExchangeSpec {
                id: self.ids.generate_object_id(),
                name: name.to_string(),
                exchange_type,
                durable: true,
                alternate_exchange: None,
                arguments: Map::new(),
            };
            created.push(self.build_live_object(ObjectSpec::Exchange(spec), graph)?);
        }
        Ok(created)
    }

    fn open_exchange(
        &self,
        spec: ExchangeSpec,
        graph: &mut LiveGraph,
    ) -> Result<LiveObject, RecoveryError> {
        if let Some(existing) = graph.exchange_named(&spec.name) {
            return Err(name_taken(spec.id, &EntityType::EXCHANGE, &spec.name, existing.id));
        }

        let exchange = Arc::new(Exchange {
            id: spec.id,
            name: spec.name,
            exchange_type: spec.exchange_type,
            durable: spec.durable,
            alternate_exchange: spec.alternate_exchange,
            arguments: spec.arguments,
            opened_at: self.clock.now(),
        });
        let live = LiveObject::Exchange(exchange.clone());
        graph.register(exchange.id, live.clone())?;
        tracing::info!(
            id = %exchange.id,
            name = %exchange.name,
            exchange_type = %exchange.exchange_type,
            alternate_exchange = exchange.alternate_exchange.as_ref().map(|a| a.name.as_str()),
            "Restoring exchange"
        );

        if exchange.is_default() {
            let queues: Vec<Arc<Queue>> = graph.queues().cloned().collect();
            for queue in queues {
                self.bind_default(&exchange, &queue, graph)?;
            }
        }
        Ok(live)
    }

    fn open_queue(&self, spec: QueueSpec, graph: &mut LiveGraph) -> Result<LiveObject, RecoveryError> {
        if let Some(existing) = graph.queue_named(&spec.name) {
            return Err(name_taken(spec.id, &EntityType::QUEUE, &spec.name, existing.id));
        }

        let queue = Arc::new(Queue {
            id: spec.id,
            name: spec.name,
            durable: spec.durable,
            alternate_exchange: spec.alternate_exchange,
            arguments: spec.arguments,
            opened_at: self.clock.now(),
        });
        let live = LiveObject::Queue(queue.clone());
        graph.register(queue.id, live.clone())?;
        tracing::info!(
            id = %queue.id,
            name = %queue.name,
            durable = queue.durable,
            "Restoring queue"
        );

        if let Some(default_exchange) = graph.exchange_named(DEFAULT_EXCHANGE_NAME).cloned() {
            self.bind_default(&default_exchange, &queue, graph)?;
        }
        Ok(live)
    }

    fn open_binding(
        &self,
        spec: BindingSpec,
        graph: &mut LiveGraph,
    ) -> Result<LiveObject, RecoveryError> {
        let binding = Arc::new(Binding {
            id: spec.id,
            binding_key: spec.binding_key,
            arguments: spec.arguments,
            exchange: spec.exchange,
            queue: spec.queue,
            opened_at: self.clock.now(),
        });
        let live = LiveObject::Binding(binding.clone());
        graph.register(binding.id, live.clone())?;
        tracing::info!(
            id = %binding.id,
            exchange = %binding.exchange.name,
            queue = %binding.queue.name,
            key = %binding.binding_key,
            "Restoring binding"
        );
        Ok(live)
    }

    /// Bind `queue` to the default exchange under its own name, unless
    /// that binding is already live.
    fn bind_default(
        &self,
        exchange: &Arc<Exchange>,
        queue: &Arc<Queue>,
        graph: &mut LiveGraph,
    ) -> Result<(), RecoveryError> {
        if graph.find_binding(exchange.id, &queue.name, queue.id).is_some() {
            return Ok(());
        }
        let binding = Arc::new(Binding {
            id: self.ids.generate_object_id(),
            binding_key: queue.name.clone(),
            arguments: Map::new(),
            exchange: exchange.clone(),
            queue: queue.clone(),
            opened_at: self.clock.now(),
        });
        graph.register(binding.id, LiveObject::Binding(binding.clone()))?;
        tracing::debug!(id = %binding.id, queue = %queue.name, "default binding created");
        Ok(())
    }
}

impl Default for BrokerObjectFactory {
    fn default() -> Self {
        Self::new(
            Arc::new(SystemClock),
            Arc::new(UlidGenerator::new(SystemClock)),
        )
    }
}

impl ObjectFactory for BrokerObjectFactory {
    fn build_live_object(
        &self,
        spec: ObjectSpec,
        graph: &mut LiveGraph,
    ) -> Result<LiveObject, RecoveryError> {
        match spec {
            ObjectSpec::Exchange(spec) => self.open_exchange(spec, graph),
            ObjectSpec::Queue(spec) => self.open_queue(spec, graph),
            ObjectSpec::Binding(spec) => self.open_binding(spec, graph),
        }
    }
}

fn name_taken(id: ObjectId, entity_type: &EntityType, name: &str, holder: ObjectId) -> RecoveryError {
    RecoveryError::malformed(
        id,
        entity_type,
        format!("{entity_type} name '{name}' is already taken by {holder}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::FixedClock;
    use chrono::{TimeZone, Utc};
    use rstest::rstest;

    fn queue_spec(id: u128, name: &str) -> ObjectSpec {
        ObjectSpec::Queue(QueueSpec {
            id: ObjectId::from_u128(id),
            name: name.to_string(),
            durable: true,
            alternate_exchange: None,
            arguments: Map::new(),
        })
    }

    fn exchange_spec(id: u128, name: &str) -> ObjectSpec {
        ObjectSpec::Exchange(ExchangeSpec {
            id: ObjectId::from_u128(id),
            name: name.to_string(),
            exchange_type: ExchangeType::Direct,
            durable: true,
            alternate_exchange: None,
            arguments: Map::new(),
        })
    }

    #[test]
    fn objects_are_registered_and_stamped() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let factory = BrokerObjectFactory::new(
            Arc::new(FixedClock::new(at)),
            Arc::new(UlidGenerator::new(FixedClock::new(at))),
        );
        let mut graph = LiveGraph::new();

        let live = factory
            .build_live_object(queue_spec(1, "orders"), &mut graph)
            .unwrap();

        assert!(graph.get(ObjectId::from_u128(1)).unwrap().is_same(&live));
        assert_eq!(live.as_queue().unwrap().opened_at, at);
    }

    /// The default binding exists whichever of the two is built first.
    #[rstest]
    #[case::exchange_first(true)]
    #[case::queue_first(false)]
    fn default_binding_in_either_order(#[case] exchange_first: bool) {
        let factory = BrokerObjectFactory::default();
        let mut graph = LiveGraph::new();

        if exchange_first {
            factory.build_live_object(exchange_spec(1, ""), &mut graph).unwrap();
            factory.build_live_object(queue_spec(2, "work"), &mut graph).unwrap();
        } else {
            factory.build_live_object(queue_spec(2, "work"), &mut graph).unwrap();
            factory.build_live_object(exchange_spec(1, ""), &mut graph).unwrap();
        }

        let binding = graph
            .find_binding(ObjectId::from_u128(1), "work", ObjectId::from_u128(2))
            .expect("default binding");
        assert_eq!(binding.queue.name, "work");
        assert_eq!(graph.bindings().count(), 1);
    }

    #[test]
    fn named_exchanges_do_not_bind_implicitly() {
        let factory = BrokerObjectFactory::default();
        let mut graph = LiveGraph::new();

        factory.build_live_object(exchange_spec(1, "amq.direct"), &mut graph).unwrap();
        factory.build_live_object(queue_spec(2, "work"), &mut graph).unwrap();

        assert_eq!(graph.bindings().count(), 0);
    }

    #[test]
    fn duplicate_queue_name_is_refused() {
        let factory = BrokerObjectFactory::default();
        let mut graph = LiveGraph::new();
        factory.build_live_object(queue_spec(1, "work"), &mut graph).unwrap();

        let err = factory
            .build_live_object(queue_spec(2, "work"), &mut graph)
            .unwrap_err();

        assert!(matches!(err, RecoveryError::MalformedRecord { id, .. } if id == ObjectId::from_u128(2)));
        assert!(!graph.contains(ObjectId::from_u128(2)));
    }

    #[test]
    fn standard_exchanges_are_declared_once() {
        let factory = BrokerObjectFactory::default();
        let mut graph = LiveGraph::new();
        factory.build_live_object(exchange_spec(1, "amq.direct"), &mut graph).unwrap();

        let created = factory.declare_standard_exchanges(&mut graph).unwrap();
        assert_eq!(created.len(), STANDARD_EXCHANGES.len() - 1);
        assert_eq!(
            graph.exchange_named("amq.match").unwrap().exchange_type,
            ExchangeType::Headers
        );

        let again = factory.declare_standard_exchanges(&mut graph).unwrap();
        assert!(again.is_empty());
        assert_eq!(graph.exchanges().count(), STANDARD_EXCHANGES.len());
    }
}
