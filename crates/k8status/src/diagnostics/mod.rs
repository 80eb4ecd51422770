//! Application subsystem diagnostics.
//!
//! Unlike the resource checks these do not fold a list of objects. They
//! ask a tool running inside the cluster for its own view of health and
//! translate the answer into a [`CheckReport`](crate::report::CheckReport).
//! Both report "not found" without failing when their namespace is absent.

pub mod cassandra;
pub mod ceph;

pub use cassandra::DatabaseHealthCheck;
pub use ceph::StorageHealthCheck;
