//! Live broker objects produced by recovery.
//!
//! Relationships are held as `Arc`s to objects that were already live when
//! the owner was constructed, never as ids.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{EntityType, ObjectId};

/// Name of the default exchange every queue is implicitly bound to.
pub const DEFAULT_EXCHANGE_NAME: &str = "";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeType {
    Direct,
    Topic,
    Fanout,
    Headers,
}

impl ExchangeType {
    pub fn as_str(self) -> &'static str {
        match self {
            ExchangeType::Direct => "direct",
            ExchangeType::Topic => "topic",
            ExchangeType::Fanout => "fanout",
            ExchangeType::Headers => "headers",
        }
    }
}

impl fmt::Display for ExchangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExchangeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(ExchangeType::Direct),
            "topic" => Ok(ExchangeType::Topic),
            "fanout" => Ok(ExchangeType::Fanout),
            "headers" => Ok(ExchangeType::Headers),
            other => Err(format!("unknown exchange type '{other}'")),
        }
    }
}

#[derive(Debug)]
pub struct Exchange {
    pub id: ObjectId,
    pub name: String,
    pub exchange_type: ExchangeType,
    pub durable: bool,
    pub alternate_exchange: Option<Arc<Exchange>>,
    pub arguments: Map<String, Value>,
    pub opened_at: DateTime<Utc>,
}

impl Exchange {
    pub fn is_default(&self) -> bool {
        self.name == DEFAULT_EXCHANGE_NAME
    }
}

#[derive(Debug)]
pub struct Queue {
    pub id: ObjectId,
    pub name: String,
    pub durable: bool,
    pub alternate_exchange: Option<Arc<Exchange>>,
    pub arguments: Map<String, Value>,
    pub opened_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct Binding {
    pub id: ObjectId,
    pub binding_key: String,
    pub arguments: Map<String, Value>,
    pub exchange: Arc<Exchange>,
    pub queue: Arc<Queue>,
    pub opened_at: DateTime<Utc>,
}

/// A fully constructed, activated configured object.
///
/// Cloning is cheap (an `Arc` bump); two clones are the same object.
#[derive(Debug, Clone)]
pub enum LiveObject {
    Exchange(Arc<Exchange>),
    Queue(Arc<Queue>),
    Binding(Arc<Binding>),
}

impl LiveObject {
    pub fn id(&self) -> ObjectId {
        match self {
            LiveObject::Exchange(e) => e.id,
            LiveObject::Queue(q) => q.id,
            LiveObject::Binding(b) => b.id,
        }
    }

    pub fn entity_type(&self) -> EntityType {
        match self {
            LiveObject::Exchange(_) => EntityType::EXCHANGE,
            LiveObject::Queue(_) => EntityType::QUEUE,
            LiveObject::Binding(_) => EntityType::BINDING,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            LiveObject::Exchange(e) => &e.name,
            LiveObject::Queue(q) => &q.name,
            LiveObject::Binding(b) => &b.binding_key,
        }
    }

    pub fn as_exchange(&self) -> Option<&Arc<Exchange>> {
        match self {
            LiveObject::Exchange(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_queue(&self) -> Option<&Arc<Queue>> {
        match self {
            LiveObject::Queue(q) => Some(q),
            _ => None,
        }
    }

    pub fn as_binding(&self) -> Option<&Arc<Binding>> {
        match self {
            LiveObject::Binding(b) => Some(b),
            _ => None,
        }
    }

    /// Identity comparison (same allocation), not structural equality.
    pub fn is_same(&self, other: &LiveObject) -> bool {
        match (self, other) {
            (LiveObject::Exchange(a), LiveObject::Exchange(b)) => Arc::ptr_eq(a, b),
            (LiveObject::Queue(a), LiveObject::Queue(b)) => Arc::ptr_eq(a, b),
            (LiveObject::Binding(a), LiveObject::Binding(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}
