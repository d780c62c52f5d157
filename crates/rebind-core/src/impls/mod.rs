//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **BrokerObjectFactory**: in-process の Exchange / Queue / Binding 構築
//! - **InMemoryRecordStore** / **JsonFileRecordStore**: レコードの供給元
//! - **TracingEventSink** / **MemoryEventSink** / **NoopEventSink**: イベントの行き先

pub mod broker_factory;
pub mod record_store;
pub mod event_sink;

// 主要な型を再エクスポート
pub use self::broker_factory::{BrokerObjectFactory, STANDARD_EXCHANGES};
pub use self::record_store::{InMemoryRecordStore, JsonFileRecordStore};
pub use self::event_sink::{MemoryEventSink, NoopEventSink, TracingEventSink};
