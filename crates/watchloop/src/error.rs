#![forbid(unsafe_code)]

//! Error types crossing the engine's public boundary.
//!
//! Only two conditions propagate to callers: re-entrant digest/apply
//! ([`ScopeError::PhaseInProgress`]) and a digest that fails to converge
//! ([`ScopeError::IterationLimit`]). Failures inside user-supplied watch and
//! listener functions are [`CallbackError`]s: reported via `tracing::error!`
//! at the point of occurrence, then swallowed, so one misbehaving watcher
//! never affects another.

use crate::scope::Phase;

/// Failure from a user-supplied watch or listener function. Logged and
/// isolated, never propagated out of the digest.
pub type CallbackError = Box<dyn std::error::Error>;

/// Fatal errors from top-level digest/apply operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeError {
    /// `digest()` or `apply()` was called while the named phase was already
    /// active on the same scope. The scope's state is not corrupted; the
    /// offending call simply did nothing.
    PhaseInProgress(Phase),
    /// The digest loop was still dirty (or had pending async work) after its
    /// iteration budget. The scope retains whatever values were last
    /// committed; convergence was abandoned.
    IterationLimit {
        /// The budget that was exhausted.
        limit: u32,
    },
}

impl std::fmt::Display for ScopeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PhaseInProgress(phase) => {
                write!(f, "{phase} already in progress")
            }
            Self::IterationLimit { limit } => {
                write!(f, "{limit} digest iterations reached without convergence")
            }
        }
    }
}

impl std::error::Error for ScopeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_active_phase() {
        let msg = ScopeError::PhaseInProgress(Phase::Apply).to_string();
        assert_eq!(msg, "apply already in progress");
        let msg = ScopeError::PhaseInProgress(Phase::Digest).to_string();
        assert_eq!(msg, "digest already in progress");
    }

    #[test]
    fn display_reports_the_exhausted_budget() {
        let msg = ScopeError::IterationLimit { limit: 10 }.to_string();
        assert_eq!(msg, "10 digest iterations reached without convergence");
    }
}
