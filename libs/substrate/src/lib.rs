//! # flotilla-substrate
//!
//! Declarative resource model and orchestration-substrate client for
//! flotilla fleets.
//!
//! A daemon instance is represented on the substrate as a *resource set*:
//! a config artifact, a workload descriptor, and (for gateway instances) a
//! network endpoint. This crate defines those descriptor types and the
//! narrow client trait the reconciler drives them through.
//!
//! ## Invariants
//!
//! - Descriptors serialize deterministically: all key/value payloads are
//!   `BTreeMap`s, so identical inputs produce byte-identical bodies.
//! - Client operations are idempotent by construction: create reports
//!   `AlreadyExists`, delete reports `NotFound`, and both are safe to retry.

mod client;
mod error;
mod http;
mod memory;
mod resources;

pub use client::SubstrateClient;
pub use error::{ResourceKind, SubstrateError};
pub use http::HttpSubstrate;
pub use memory::{InMemorySubstrate, Operation};
pub use resources::{
    ConfigArtifact, ContainerSpec, DnsPolicy, EndpointAddressing, EnvVar, NetworkEndpoint,
    RestartPolicy, VolumeMount, VolumeSource, VolumeSpec, WorkloadDescriptor,
};
