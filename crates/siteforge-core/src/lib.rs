//! siteforge-core
//!
//! Pure domain types for the siteforge reconciliation engine: desired-state
//! specs and validation, observed-state snapshots, the diff/plan engine,
//! run reports, and the error taxonomy. No AWS SDK dependency — this is the
//! shared vocabulary of the system.

pub mod error;
pub mod observed;
pub mod planner;
pub mod report;
pub mod spec;
pub mod validate;

pub use crate::error::{ProviderError, ReconcileError, format_err_chain};
pub use crate::observed::{
    DeployStatus, DistributionHandle, ObservedBucket, ObservedDistribution, ObservedDnsRecord,
    ObservedStack,
};
pub use crate::planner::{
    BucketOp, DistributionOp, DnsOp, FieldDrift, PlanError, PlannedBucket, PlannedDistribution,
    PlannedDns, ReconcilePlan, plan,
};
pub use crate::report::{ReconcileReport, ResourceKind, ResourceOutcome, ResourceReport};
pub use crate::spec::{
    BucketSpec, DistributionSpec, DnsRecordSpec, EdgeEventType, EdgeFunctionBinding, PriceClass,
    SiteSpec, TlsPolicy,
};
pub use crate::validate::{NormalizedSpec, ValidationError, Violation, validate};
