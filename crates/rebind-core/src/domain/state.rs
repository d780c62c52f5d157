//! State - 復元パスの状態
//!
//! # 状態遷移
//! - Init -> Streaming -> Draining -> Complete
//! - Init -> Streaming -> Draining -> Failed
//! - Init -> Streaming -> Cancelled（シャットダウンで中断）

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecoveryPhase {
    /// Registry built, no records read.
    Init,

    /// Consuming the record stream.
    Streaming,

    /// Stream exhausted; judging what is still unresolved.
    Draining,

    /// Every record resolved or skipped under a permissive policy.
    Complete,

    /// A collected failure escalated under the abort policy.
    Failed,

    /// Record consumption abandoned before the stream ended.
    Cancelled,
}

impl RecoveryPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RecoveryPhase::Complete | RecoveryPhase::Failed | RecoveryPhase::Cancelled
        )
    }

    /// Is `self -> next` a legal transition?
    pub fn can_transition_to(self, next: RecoveryPhase) -> bool {
        use RecoveryPhase::*;
        matches!(
            (self, next),
            (Init, Streaming)
                | (Streaming, Draining)
                | (Streaming, Cancelled)
                | (Draining, Complete)
                | (Draining, Failed)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::RecoveryPhase::*;

    #[test]
    fn terminal_phases() {
        assert!(Complete.is_terminal());
        assert!(Failed.is_terminal());
        assert!(Cancelled.is_terminal());
        assert!(!Streaming.is_terminal());
    }

    #[test]
    fn draining_cannot_be_skipped_to_complete() {
        assert!(!Streaming.can_transition_to(Complete));
        assert!(!Init.can_transition_to(Draining));
        assert!(Draining.can_transition_to(Complete));
    }

    #[test]
    fn failure_is_decided_while_draining() {
        assert!(!Streaming.can_transition_to(Failed));
        assert!(Draining.can_transition_to(Failed));
    }
}
