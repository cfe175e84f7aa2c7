use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Bucket,
    Distribution,
    DnsRecord,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceKind::Bucket => "bucket",
            ResourceKind::Distribution => "distribution",
            ResourceKind::DnsRecord => "dns record",
        };
        f.write_str(s)
    }
}

/// Terminal state of one resource after a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceOutcome {
    Created,
    Updated,
    NoOp,
    /// Not attempted: an upstream resource failed or is still settling.
    Blocked,
    Failed,
}

impl ResourceOutcome {
    /// Whether the resource reached its desired state this run.
    pub fn applied(self) -> bool {
        matches!(
            self,
            ResourceOutcome::Created | ResourceOutcome::Updated | ResourceOutcome::NoOp
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceReport {
    pub kind: ResourceKind,
    pub outcome: ResourceOutcome,
    /// Provider-assigned identifier where one exists: the bucket name, the
    /// distribution's assigned domain, or the record's domain name.
    pub identifier: Option<String>,
    /// Underlying provider error message, verbatim, for failed or blocked
    /// resources.
    pub detail: Option<String>,
}

/// Per-resource results for one run; one row per DNS domain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub resources: Vec<ResourceReport>,
}

impl ReconcileReport {
    /// True when every non-skipped resource reached its desired state.
    /// CLI wrappers should exit non-zero otherwise.
    pub fn converged(&self) -> bool {
        self.resources.iter().all(|r| r.outcome.applied())
    }

    pub fn push(&mut self, report: ResourceReport) {
        self.resources.push(report);
    }

    pub fn of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &ResourceReport> {
        self.resources.iter().filter(move |r| r.kind == kind)
    }
}
