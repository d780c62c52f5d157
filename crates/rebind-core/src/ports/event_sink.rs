//! EventSink port - イベント記録の抽象化
//!
//! # 実装
//! - NoopEventSink: 何もしない
//! - TracingEventSink: `tracing` へ出力（デフォルト）
//! - MemoryEventSink: テスト用に保持

use crate::domain::RecoveryEvent;

/// EventSink は復元イベントを記録
///
/// 復元パスは単一スレッドで進むため同期呼び出しです。
pub trait EventSink: Send + Sync {
    fn emit(&self, event: RecoveryEvent);
}
