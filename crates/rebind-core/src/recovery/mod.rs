//! Recovery engine: an unordered bag of persisted records in, a fully linked
//! live graph out.
//!
//! - **recoverer**: Recoverer / UnresolvedObject contract
//! - **registry**: entity type -> Recoverer
//! - **tracker**: dependency index and iterative resolution
//! - **coordinator**: the pass state machine and failure policy

pub mod recoverer;
pub mod registry;
pub mod tracker;
pub mod coordinator;

pub use self::recoverer::{Outstanding, Recoverer, ResolveContext, UnresolvedObject};
pub use self::registry::{RecovererRegistry, RegistryError};
pub use self::tracker::DependencyTracker;
pub use self::coordinator::{RecoveryCoordinator, RecoveryOutcome};
