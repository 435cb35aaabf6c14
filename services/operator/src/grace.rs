//! Recovery-database membership coordination.
//!
//! Gateway instances participate in a shared recovery/grace database keyed
//! by `(pool, namespace)`. Membership is maintained by shelling out to an
//! external coordination tool:
//!
//! ```text
//! <tool> --pool <pool> --ns <namespace> add|remove <identity>
//! ```
//!
//! Membership failures never abort reconciliation; the reconciler logs a
//! warning and keeps going.

use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

#[derive(Error, Debug)]
pub enum GraceError {
    #[error("failed to spawn {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} {op} exited with status {code:?}: {stderr}")]
    NonZeroExit {
        tool: String,
        op: &'static str,
        code: Option<i32>,
        stderr: String,
    },
}

/// Membership operations against the shared recovery database.
#[async_trait]
pub trait RecoveryMembership: Send + Sync {
    async fn add(&self, pool: &str, namespace: &str, identity: &str) -> Result<(), GraceError>;

    async fn remove(&self, pool: &str, namespace: &str, identity: &str) -> Result<(), GraceError>;
}

/// Membership coordinator backed by the external grace tool.
pub struct GraceToolClient {
    tool: String,
}

impl GraceToolClient {
    pub fn new(tool: impl Into<String>) -> Self {
        Self { tool: tool.into() }
    }

    async fn run(
        &self,
        pool: &str,
        namespace: &str,
        op: &'static str,
        identity: &str,
    ) -> Result<(), GraceError> {
        debug!(tool = %self.tool, pool, namespace, op, identity, "Invoking grace tool");

        let output = Command::new(&self.tool)
            .arg("--pool")
            .arg(pool)
            .arg("--ns")
            .arg(namespace)
            .arg(op)
            .arg(identity)
            .output()
            .await
            .map_err(|source| GraceError::Spawn {
                tool: self.tool.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(GraceError::NonZeroExit {
                tool: self.tool.clone(),
                op,
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RecoveryMembership for GraceToolClient {
    async fn add(&self, pool: &str, namespace: &str, identity: &str) -> Result<(), GraceError> {
        self.run(pool, namespace, "add", identity).await
    }

    async fn remove(&self, pool: &str, namespace: &str, identity: &str) -> Result<(), GraceError> {
        self.run(pool, namespace, "remove", identity).await
    }
}

/// One recorded membership invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipCall {
    pub op: &'static str,
    pub pool: String,
    pub namespace: String,
    pub identity: String,
}

/// In-memory membership coordinator for tests. Records every call and can
/// be switched to fail, simulating an unreachable grace tool.
#[derive(Default)]
pub struct RecordingMembership {
    calls: Mutex<Vec<MembershipCall>>,
    fail: bool,
}

impl RecordingMembership {
    pub fn new() -> Self {
        Self::default()
    }

    /// A coordinator whose every call fails with a non-zero exit.
    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn calls(&self) -> Vec<MembershipCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn identities_with_op(&self, op: &str) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.op == op)
            .map(|c| c.identity.clone())
            .collect()
    }

    fn record(
        &self,
        op: &'static str,
        pool: &str,
        namespace: &str,
        identity: &str,
    ) -> Result<(), GraceError> {
        self.calls.lock().unwrap().push(MembershipCall {
            op,
            pool: pool.to_string(),
            namespace: namespace.to_string(),
            identity: identity.to_string(),
        });
        if self.fail {
            return Err(GraceError::NonZeroExit {
                tool: "recording".to_string(),
                op,
                code: Some(1),
                stderr: String::new(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RecoveryMembership for RecordingMembership {
    async fn add(&self, pool: &str, namespace: &str, identity: &str) -> Result<(), GraceError> {
        self.record("add", pool, namespace, identity)
    }

    async fn remove(&self, pool: &str, namespace: &str, identity: &str) -> Result<(), GraceError> {
        self.record("remove", pool, namespace, identity)
    }
}
