//! RecovererRegistry - Recoverer の登録と管理
//!
//! # 設計
//! - エンティティ型名 -> Recoverer の HashMap（型消去された trait object）
//! - 新しいエンティティ種別は variant を登録して追加する（継承しない）
//! - 初期化時に構築（mutable）、復元中は不変（immutable）

use std::collections::HashMap;
use std::sync::Arc;

use super::recoverer::Recoverer;
use crate::domain::EntityType;
use crate::recoverers::{BindingRecoverer, ExchangeRecoverer, QueueRecoverer};

/// RegistryError は RecovererRegistry の操作エラー
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Recoverer for entity type '{0}' is already registered")]
    AlreadyRegistered(EntityType),
}

#[derive(Default)]
pub struct RecovererRegistry {
    recoverers: HashMap<EntityType, Arc<dyn Recoverer>>,
}

impl RecovererRegistry {
    pub fn new() -> Self {
        Self {
            recoverers: HashMap::new(),
        }
    }

    /// Exchange / Queue / Binding の標準 Recoverer を登録済みのレジストリ
    pub fn with_broker_defaults() -> Self {
        let mut registry = Self::new();
        for recoverer in [
            Arc::new(ExchangeRecoverer) as Arc<dyn Recoverer>,
            Arc::new(QueueRecoverer),
            Arc::new(BindingRecoverer),
        ] {
            registry.recoverers.insert(recoverer.type_name(), recoverer);
        }
        registry
    }

    pub fn register(&mut self, recoverer: Arc<dyn Recoverer>) -> Result<(), RegistryError> {
        let entity_type = recoverer.type_name();
        if self.recoverers.contains_key(&entity_type) {
            return Err(RegistryError::AlreadyRegistered(entity_type));
        }
        self.recoverers.insert(entity_type, recoverer);
        Ok(())
    }

    pub fn get(&self, entity_type: &EntityType) -> Option<&Arc<dyn Recoverer>> {
        self.recoverers.get(entity_type)
    }

    /// 登録済みのエンティティ型（ソート済み）
    pub fn registered_types(&self) -> Vec<EntityType> {
        let mut types: Vec<EntityType> = self.recoverers.keys().cloned().collect();
        types.sort();
        types
    }

    pub fn len(&self) -> usize {
        self.recoverers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recoverers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_get() {
        let mut registry = RecovererRegistry::new();
        registry.register(Arc::new(QueueRecoverer)).unwrap();

        let retrieved = registry.get(&EntityType::QUEUE);
        assert!(retrieved.is_some());
        assert!(registry.get(&EntityType::EXCHANGE).is_none());
    }

    #[test]
    fn test_double_registration() {
        let mut registry = RecovererRegistry::new();
        registry.register(Arc::new(QueueRecoverer)).unwrap();
        let result = registry.register(Arc::new(QueueRecoverer));
        assert!(matches!(
            result,
            Err(RegistryError::AlreadyRegistered(t)) if t == EntityType::QUEUE
        ));
    }

    #[test]
    fn test_broker_defaults() {
        let registry = RecovererRegistry::with_broker_defaults();
        assert_eq!(
            registry.registered_types(),
            vec![EntityType::BINDING, EntityType::EXCHANGE, EntityType::QUEUE]
        );
    }
}
