//! Broker entity recoverers: Exchange, Queue, Binding.
//!
//! # 依存関係
//! - Exchange -> alternate exchange (任意)
//! - Queue -> alternate exchange (任意)
//! - Binding -> parent Exchange + parent Queue (必須)

mod attrs;
pub mod binding;
pub mod exchange;
pub mod queue;

pub use self::binding::BindingRecoverer;
pub use self::exchange::{ALTERNATE_EXCHANGE, ExchangeRecoverer};
pub use self::queue::QueueRecoverer;
