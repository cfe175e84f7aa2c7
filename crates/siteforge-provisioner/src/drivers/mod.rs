//! Resource drivers: each applies one planned change operation against its
//! provider boundary and reports the resulting state. Drivers never retry
//! and never wait for eventual-consistency settlement — both are the
//! orchestrator's concern.

pub mod bucket;
pub mod distribution;
pub mod dns;

pub use bucket::BucketDriver;
pub use distribution::DistributionDriver;
pub use dns::DnsDriver;
