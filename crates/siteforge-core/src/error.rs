use thiserror::Error;

use crate::planner::PlanError;
use crate::report::ResourceKind;
use crate::validate::ValidationError;

/// Outcome classes at the provider API boundary. Adapters fold every SDK
/// failure into one of these; the engine never inspects raw SDK errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("resource not found")]
    NotFound,

    /// The version token presented with an update no longer matches the
    /// resource; it changed concurrently.
    #[error("version token {token:?} is no longer current")]
    Conflict { token: String },

    #[error("throttled by provider: {0}")]
    Throttled(String),

    /// 5xx-class or transport-level failure; worth retrying.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("authentication or authorization failed: {0}")]
    Auth(String),

    #[error("{0}")]
    Other(String),
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::Throttled(_) | ProviderError::Unavailable(_)
        )
    }
}

/// Engine-level error taxonomy. Errors on one resource never abort
/// already-completed upstream work; they only prevent downstream work.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error("observing {kind} failed: {source}")]
    Observation {
        kind: ResourceKind,
        source: ProviderError,
    },

    /// More than one distribution targets the same origin. Automatic
    /// resolution would risk acting on the wrong resource; always fatal.
    #[error("multiple distributions target origin {origin}: {}", matches.join(", "))]
    AmbiguousDistribution { origin: String, matches: Vec<String> },

    #[error("{kind} update conflicted with a concurrent change: {source}")]
    Conflict {
        kind: ResourceKind,
        source: ProviderError,
    },

    #[error("{kind} {op} failed: {source}")]
    Driver {
        kind: ResourceKind,
        op: &'static str,
        source: ProviderError,
    },
}

impl ReconcileError {
    /// Transient failures are retried under the orchestrator's backoff
    /// policy. Validation, auth, conflict and ambiguity never are.
    pub fn is_transient(&self) -> bool {
        match self {
            ReconcileError::Observation { source, .. } | ReconcileError::Driver { source, .. } => {
                source.is_transient()
            }
            _ => false,
        }
    }
}

/// Walk the full error chain and join all causes into one string.
///
/// AWS SDK errors often have terse `Display` impls (e.g. "service error")
/// but useful detail in the source chain.
pub fn format_err_chain(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}
