//! rebind-core
//!
//! Startup recovery of durable broker configuration: an unordered snapshot
//! of persisted records in, a fully linked graph of live objects out.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, records, live objects, graph, state, errors, events）
//! - **ports**: 抽象化レイヤー（RecordStore, ObjectFactory, LiveLookup, EventSink, Clock, IdGenerator）
//! - **recovery**: 復元エンジン（Recoverer 契約, registry, dependency tracker, coordinator）
//! - **recoverers**: Exchange / Queue / Binding の Recoverer
//! - **impls**: 実装（BrokerObjectFactory, record stores, event sinks）
//! - **app**: 構築と設定（RecoveryBuilder, RecoveryConfig）

pub mod domain;
pub mod ports;
pub mod recovery;
pub mod recoverers;
pub mod impls;
pub mod app;
