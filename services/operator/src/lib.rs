//! flotilla Fleet Operator
//!
//! Reconciles declared fleets of clustered storage daemons and NFS export
//! gateways against the orchestration substrate. For each fleet ordinal the
//! operator derives a stable instance name, plans the storage backend
//! (storage fleets), builds the instance's declarative resource set, and
//! applies it idempotently. Gateway instances are additionally registered
//! in the distributed recovery/grace database so they participate in
//! client-session failover.
//!
//! ## Architecture
//!
//! - **Identity**: ordinal → letter-sequence name, pure function
//!   (`flotilla-identity`)
//! - **Planner**: store-format × media-kind decision table → backend plan
//! - **Builders**: (instance, plan, fleet spec) → resource set
//! - **Grace coordination**: best-effort add/remove of gateway membership
//! - **Reconciler**: sequential desired-vs-actual loop over ordinals

pub mod builder;
pub mod config;
pub mod error;
pub mod fleet;
pub mod grace;
pub mod planner;
pub mod reconciler;
