//! RecoveryBuilder - 復元エンジンの構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - 開発体験の改善（明確なエラーメッセージ）

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::config::RecoveryConfig;
use crate::domain::EntityType;
use crate::impls::{BrokerObjectFactory, TracingEventSink};
use crate::ports::{EventSink, ObjectFactory};
use crate::recovery::{Recoverer, RecovererRegistry, RecoveryCoordinator, RegistryError};

/// RecoveryBuilder は RecoveryCoordinator を構築
///
/// # 使用例
/// ```ignore
/// let coordinator = RecoveryBuilder::with_broker_defaults()
///     .register(Arc::new(StreamRecoverer))?
///     .expect_types(&[EntityType::EXCHANGE, EntityType::QUEUE, EntityType::new("Stream")])
///     .config(RecoveryConfig::load(path)?)
///     .build()?;
/// ```
///
/// # Fail-fast 設計
/// - expect_types() で期待されるエンティティ型を登録
/// - build() 時に「期待集合 ⊆ 登録済み集合」をチェック
/// - 不足があれば BuildError を返す（ストアを読む前に失敗する）
pub struct RecoveryBuilder {
    registry: RecovererRegistry,
    expected_types: Option<Vec<EntityType>>,
    config: RecoveryConfig,
    factory: Option<Arc<dyn ObjectFactory>>,
    sink: Option<Arc<dyn EventSink>>,
    cancel: Option<CancellationToken>,
}

/// BuildError は復元エンジン構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing entity types: {0:?}. These types were expected but have no recoverer.")]
    MissingEntityTypes(Vec<EntityType>),
}

impl RecoveryBuilder {
    /// 空のレジストリから始める
    pub fn new() -> Self {
        Self::from_registry(RecovererRegistry::new())
    }

    /// Exchange / Queue / Binding を登録済みの状態から始める
    pub fn with_broker_defaults() -> Self {
        Self::from_registry(RecovererRegistry::with_broker_defaults())
    }

    fn from_registry(registry: RecovererRegistry) -> Self {
        Self {
            registry,
            expected_types: None,
            config: RecoveryConfig::default(),
            factory: None,
            sink: None,
            cancel: None,
        }
    }

    /// Recoverer を登録
    pub fn register(mut self, recoverer: Arc<dyn Recoverer>) -> Result<Self, RegistryError> {
        self.registry.register(recoverer)?;
        Ok(self)
    }

    /// 期待されるエンティティ型のリストを設定
    pub fn expect_types(mut self, entity_types: &[EntityType]) -> Self {
        self.expected_types = Some(entity_types.to_vec());
        self
    }

    pub fn config(mut self, config: RecoveryConfig) -> Self {
        self.config = config;
        self
    }

    /// 省略時は `BrokerObjectFactory::default()`
    pub fn factory(mut self, factory: Arc<dyn ObjectFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// 省略時は `TracingEventSink`
    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// RecoveryCoordinator を構築
    ///
    /// # 検証
    /// - expect_types() で設定された型が全て登録されているかチェック
    /// - 不足があれば BuildError::MissingEntityTypes を返す
    pub fn build(self) -> Result<RecoveryCoordinator, BuildError> {
        if let Some(expected_types) = &self.expected_types {
            let registered_types = self.registry.registered_types();
            let missing_types: Vec<EntityType> = expected_types
                .iter()
                .filter(|t| !registered_types.contains(t))
                .cloned()
                .collect();
            if !missing_types.is_empty() {
                return Err(BuildError::MissingEntityTypes(missing_types));
            }
        }

        let factory = self
            .factory
            .unwrap_or_else(|| Arc::new(BrokerObjectFactory::default()));
        let sink = self.sink.unwrap_or_else(|| Arc::new(TracingEventSink));
        let coordinator =
            RecoveryCoordinator::new(Arc::new(self.registry), factory, sink, self.config);
        Ok(match self.cancel {
            Some(token) => coordinator.with_cancellation(token),
            None => coordinator,
        })
    }
}

impl Default for RecoveryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::config::FailurePolicy;
    use crate::recoverers::QueueRecoverer;

    #[test]
    fn build_success() {
        let coordinator = RecoveryBuilder::with_broker_defaults()
            .expect_types(&[EntityType::EXCHANGE, EntityType::QUEUE, EntityType::BINDING])
            .build();
        assert!(coordinator.is_ok());
    }

    #[test]
    fn build_missing_entity_types() {
        let result = RecoveryBuilder::new()
            .register(Arc::new(QueueRecoverer))
            .unwrap()
            .expect_types(&[EntityType::QUEUE, EntityType::BINDING])
            .build();
        assert!(matches!(
            result,
            Err(BuildError::MissingEntityTypes(missing)) if missing == vec![EntityType::BINDING]
        ));
    }

    #[test]
    fn registering_twice_is_rejected() {
        let result = RecoveryBuilder::with_broker_defaults().register(Arc::new(QueueRecoverer));
        assert!(matches!(
            result,
            Err(RegistryError::AlreadyRegistered(t)) if t == EntityType::QUEUE
        ));
    }

    #[test]
    fn build_carries_config_and_token() {
        let token = CancellationToken::new();
        let coordinator = RecoveryBuilder::with_broker_defaults()
            .config(RecoveryConfig::permissive())
            .cancellation(token.clone())
            .build()
            .unwrap();

        assert_eq!(coordinator.config().on_malformed, FailurePolicy::Skip);
        token.cancel();
        assert!(coordinator.cancellation_token().is_cancelled());
    }
}
