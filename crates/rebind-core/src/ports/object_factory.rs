//! ObjectFactory port - live object の構築と activation
//!
//! 復元エンジンにとっては不透明な協調者です。
//! エンティティ固有の構築・activation（open）の副作用はここで起きます。

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::domain::{
    EntityType, Exchange, ExchangeType, LiveGraph, LiveObject, ObjectId, Queue, RecoveryError,
};

/// Attribute snapshot of an Exchange record plus its live alternate exchange.
#[derive(Debug, Clone)]
pub struct ExchangeSpec {
    pub id: ObjectId,
    pub name: String,
    pub exchange_type: ExchangeType,
    pub durable: bool,
    pub alternate_exchange: Option<Arc<Exchange>>,
    pub arguments: Map<String, Value>,
}

#[derive(Debug, Clone)]
pub struct QueueSpec {
    pub id: ObjectId,
    pub name: String,
    pub durable: bool,
    pub alternate_exchange: Option<Arc<Exchange>>,
    pub arguments: Map<String, Value>,
}

#[derive(Debug, Clone)]
pub struct BindingSpec {
    pub id: ObjectId,
    pub binding_key: String,
    pub arguments: Map<String, Value>,
    pub exchange: Arc<Exchange>,
    pub queue: Arc<Queue>,
}

/// Everything needed to construct one live object: the entity type (the
/// variant), the record's attribute snapshot and the now-live parents.
#[derive(Debug, Clone)]
pub enum ObjectSpec {
    Exchange(ExchangeSpec),
    Queue(QueueSpec),
    Binding(BindingSpec),
}

impl ObjectSpec {
    pub fn id(&self) -> ObjectId {
        match self {
            ObjectSpec::Exchange(s) => s.id,
            ObjectSpec::Queue(s) => s.id,
            ObjectSpec::Binding(s) => s.id,
        }
    }

    pub fn entity_type(&self) -> EntityType {
        match self {
            ObjectSpec::Exchange(_) => EntityType::EXCHANGE,
            ObjectSpec::Queue(_) => EntityType::QUEUE,
            ObjectSpec::Binding(_) => EntityType::BINDING,
        }
    }
}

/// ObjectFactory は spec から live object を作り、open して graph に登録する
///
/// # 契約
/// - 返す object は `spec.id()` で graph に登録済みであること
/// - 構築に伴って作られる object（default binding など）も graph に登録する
pub trait ObjectFactory: Send + Sync {
    fn build_live_object(
        &self,
        spec: ObjectSpec,
        graph: &mut LiveGraph,
    ) -> Result<LiveObject, RecoveryError>;
}
