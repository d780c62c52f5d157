//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 復元エンジンが外部（永続化ストア、ブローカーのモデル、観測基盤）と
//! やり取りする境界はすべてここの trait を通します。

pub mod record_store;
pub mod live_lookup;
pub mod object_factory;
pub mod event_sink;
pub mod clock;
pub mod id_generator;

// 主要な trait を再エクスポート
pub use self::record_store::{RecordStore, StoreError};
pub use self::live_lookup::LiveLookup;
pub use self::object_factory::{BindingSpec, ExchangeSpec, ObjectFactory, ObjectSpec, QueueSpec};
pub use self::event_sink::EventSink;
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
