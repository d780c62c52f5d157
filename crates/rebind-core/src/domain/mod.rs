//! Domain model (ids, records, live objects, errors, events).
//!
//! - record / dependency: 永続化側の表現（ストアから読むもの）
//! - model / graph: 復元後の live object とその名前空間
//! - state / events / errors: 復元パスの状態・観測・失敗

pub mod ids;
pub mod entity_type;
pub mod record;
pub mod dependency;
pub mod model;
pub mod graph;
pub mod state;
pub mod errors;
pub mod events;

pub use self::ids::ObjectId;
pub use self::entity_type::EntityType;
pub use self::record::{ParentRef, PersistedRecord};
pub use self::dependency::Dependency;
pub use self::model::{
    Binding, DEFAULT_EXCHANGE_NAME, Exchange, ExchangeType, LiveObject, Queue,
};
pub use self::graph::LiveGraph;
pub use self::state::RecoveryPhase;
pub use self::errors::{ErrorKind, RecoveryError, StartupError};
pub use self::events::RecoveryEvent;
