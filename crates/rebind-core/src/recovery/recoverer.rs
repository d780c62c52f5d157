//! Recoverer / UnresolvedObject contract.
//!
//! # 二層構造
//! - **Recoverer**: エンティティ型ごとに 1 つ。レコード 1 件を UnresolvedObject に変換
//! - **UnresolvedObject**: レコード 1 件分の属性スナップショットと未解決の依存
//!
//! UnresolvedObject は依存がすべて満たされたときに一度だけ `resolve` されます。
//! `resolve` は `self: Box<Self>` を消費するので、二度目の呼び出しは型で不可能です。

use crate::domain::{
    Dependency, EntityType, LiveGraph, LiveObject, ObjectId, PersistedRecord, RecoveryError,
};
use crate::ports::{LiveLookup, ObjectFactory};

/// Entity-type specific logic turning a record into an [`UnresolvedObject`].
///
/// # 使用例
/// ```ignore
/// struct QueueRecoverer;
///
/// impl Recoverer for QueueRecoverer {
///     fn type_name(&self) -> EntityType {
///         EntityType::QUEUE
///     }
///
///     fn create_unresolved_object(
///         &self,
///         record: &PersistedRecord,
///         lookup: &dyn LiveLookup,
///     ) -> Result<Box<dyn UnresolvedObject>, RecoveryError> {
///         Ok(Box::new(UnresolvedQueue::new(record, lookup)?))
///     }
/// }
/// ```
pub trait Recoverer: Send + Sync {
    fn type_name(&self) -> EntityType;

    /// Extract and validate the record's attributes, look up each reference
    /// through `lookup` and declare a [`Dependency`] for every one that is not
    /// live yet. Must not mutate the graph.
    fn create_unresolved_object(
        &self,
        record: &PersistedRecord,
        lookup: &dyn LiveLookup,
    ) -> Result<Box<dyn UnresolvedObject>, RecoveryError>;
}

/// Collaborators available while resolving.
pub struct ResolveContext<'a> {
    pub graph: &'a mut LiveGraph,
    pub factory: &'a dyn ObjectFactory,
}

impl<'a> ResolveContext<'a> {
    pub fn new(graph: &'a mut LiveGraph, factory: &'a dyn ObjectFactory) -> Self {
        Self { graph, factory }
    }
}

pub trait UnresolvedObject {
    /// Id of the source record.
    fn id(&self) -> ObjectId;

    fn entity_type(&self) -> EntityType;

    /// Dependencies still missing; empty means ready to resolve.
    fn outstanding_dependencies(&self) -> &[Dependency];

    /// Hand over the now-live object `live` for every dependency on `id`.
    ///
    /// Returns the dependencies this removed (empty when none matched).
    /// Fails with `MalformedRecord` when `live` is not of the expected type.
    fn satisfy(&mut self, id: ObjectId, live: &LiveObject)
    -> Result<Vec<Dependency>, RecoveryError>;

    /// Construct (or find the equivalent of) the live object.
    ///
    /// Fails with `RecoveryInconsistency` if dependencies are outstanding.
    fn resolve(self: Box<Self>, ctx: &mut ResolveContext<'_>) -> Result<LiveObject, RecoveryError>;
}

/// Outstanding dependency set shared by the concrete unresolved objects.
#[derive(Debug, Default)]
pub struct Outstanding(Vec<Dependency>);

impl Outstanding {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, dependency: Dependency) {
        self.0.push(dependency);
    }

    pub fn as_slice(&self) -> &[Dependency] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Remove and return every dependency on `id`.
    pub fn take(&mut self, id: ObjectId) -> Vec<Dependency> {
        let (taken, kept): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.0).into_iter().partition(|d| d.id == id);
        self.0 = kept;
        taken
    }

    /// `RecoveryInconsistency` unless the set is empty.
    pub fn ensure_empty(&self, owner: ObjectId) -> Result<(), RecoveryError> {
        if self.0.is_empty() {
            return Ok(());
        }
        let pending = self
            .0
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        Err(RecoveryError::inconsistency(
            owner,
            format!("resolve called with outstanding dependencies: {pending}"),
        ))
    }
}

/// `MalformedRecord` for a reference whose target turned out to be another type.
pub fn wrong_parent_type(
    owner: ObjectId,
    owner_type: &EntityType,
    dependency: &Dependency,
    live: &LiveObject,
) -> RecoveryError {
    RecoveryError::malformed(
        owner,
        owner_type,
        format!(
            "{} {} refers to {} '{}', expected {}",
            dependency.name,
            dependency.id,
            live.entity_type(),
            live.name(),
            dependency.entity_type
        ),
    )
}
