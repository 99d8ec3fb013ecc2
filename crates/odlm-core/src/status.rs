//! Aggregate phase and per-operand verdict.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Aggregate phase persisted on an `OperandConfig`.
///
/// These values are the contractually stable part of the config status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// No operand is actively requested. This is a resting state.
    #[default]
    Init,
    /// At least one requested operand is not ready yet.
    Installing,
    /// Every requested operand is ready.
    Running,
    /// A requested operand failed or is misconfigured.
    Failed,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Init => "Init",
            Phase::Installing => "Installing",
            Phase::Running => "Running",
            Phase::Failed => "Failed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Readiness classification of a single operand, computed every pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    NotStarted,
    Installing,
    Ready,
    Failed,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::NotStarted => "NotStarted",
            Verdict::Installing => "Installing",
            Verdict::Ready => "Ready",
            Verdict::Failed => "Failed",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_default_is_init() {
        assert_eq!(Phase::default(), Phase::Init);
    }

    #[test]
    fn test_phase_wire_names() {
        assert_eq!(serde_json::to_value(Phase::Running).unwrap(), "Running");
        assert_eq!(
            serde_json::from_value::<Phase>(serde_json::json!("Installing")).unwrap(),
            Phase::Installing
        );
    }

    #[test]
    fn test_verdict_display() {
        assert_eq!(Verdict::NotStarted.to_string(), "NotStarted");
        assert_eq!(Verdict::Ready.to_string(), "Ready");
    }
}
