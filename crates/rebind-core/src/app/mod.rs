//! App - アプリケーション層
//!
//! ports と recovery を組み合わせて、起動時に使う形にまとめます。
//!
//! # 主要コンポーネント
//! - **RecoveryBuilder**: 復元エンジンの構築とワイヤリング（起動時検証付き）
//! - **RecoveryConfig**: 失敗時ポリシー（TOML）

pub mod builder;
pub mod config;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, RecoveryBuilder};
pub use self::config::{ConfigError, FailurePolicy, RecoveryConfig};
