//! Import-related event types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of an import session
///
/// `Previewing` and `Committing` are the in-flight phases: while a session is
/// in either of them no second request may be issued for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportPhase {
    /// No file selected yet, or the session was reset
    Idle,
    /// Preview request in flight
    Previewing,
    /// Preview records available, commit allowed
    PreviewReady,
    /// Commit request in flight
    Committing,
    /// Import persisted by the server (terminal)
    Committed,
    /// Preview request failed
    Failed,
}

impl ImportPhase {
    /// A request is outstanding for the session
    pub fn is_in_flight(&self) -> bool {
        matches!(self, ImportPhase::Previewing | ImportPhase::Committing)
    }

    /// Phases in which preview records may be present
    pub fn holds_preview(&self) -> bool {
        matches!(
            self,
            ImportPhase::PreviewReady | ImportPhase::Committing | ImportPhase::Committed
        )
    }

    /// The session cannot progress further without a reset
    pub fn is_terminal(&self) -> bool {
        matches!(self, ImportPhase::Committed)
    }
}

impl fmt::Display for ImportPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ImportPhase::Idle => "idle",
            ImportPhase::Previewing => "previewing",
            ImportPhase::PreviewReady => "preview_ready",
            ImportPhase::Committing => "committing",
            ImportPhase::Committed => "committed",
            ImportPhase::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Which request a response belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Preview,
    Commit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_flight_phases() {
        assert!(ImportPhase::Previewing.is_in_flight());
        assert!(ImportPhase::Committing.is_in_flight());
        assert!(!ImportPhase::Idle.is_in_flight());
        assert!(!ImportPhase::PreviewReady.is_in_flight());
        assert!(!ImportPhase::Failed.is_in_flight());
    }

    #[test]
    fn test_preview_holding_phases() {
        assert!(ImportPhase::PreviewReady.holds_preview());
        assert!(ImportPhase::Committing.holds_preview());
        assert!(ImportPhase::Committed.holds_preview());
        assert!(!ImportPhase::Previewing.holds_preview());
        assert!(!ImportPhase::Failed.holds_preview());
    }

    #[test]
    fn test_phase_serializes_snake_case() {
        let json = serde_json::to_string(&ImportPhase::PreviewReady).unwrap();
        assert_eq!(json, "\"preview_ready\"");
        assert_eq!(ImportPhase::PreviewReady.to_string(), "preview_ready");
    }
}
