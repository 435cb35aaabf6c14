//! End-to-end reconciliation tests against the in-memory substrate.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use flotilla_operator::config::Config;
use flotilla_operator::fleet::{
    ExportSpec, GatewayFleetSpec, MediaSelection, SizeHints, StorageFleetSpec, StoreFormat,
};
use flotilla_operator::grace::{GraceError, RecordingMembership, RecoveryMembership};
use flotilla_operator::reconciler::FleetReconciler;
use flotilla_substrate::{
    ConfigArtifact, InMemorySubstrate, NetworkEndpoint, Operation, SubstrateClient,
    SubstrateError, WorkloadDescriptor,
};

const NS: &str = "tenant-a";

fn gateway_spec(active: u32) -> GatewayFleetSpec {
    GatewayFleetSpec {
        name: "shared".to_string(),
        namespace: NS.to_string(),
        active,
        store_name: "mainstore".to_string(),
        store_format: StoreFormat::FileBased,
        recovery_pool: "recovery".to_string(),
        recovery_namespace: "shared-ns".to_string(),
        exports: vec![ExportSpec {
            path: "/data".to_string(),
            pseudo_path: "/export".to_string(),
        }],
        host_network: false,
    }
}

fn storage_spec(desired: u32) -> StorageFleetSpec {
    StorageFleetSpec {
        name: "main".to_string(),
        namespace: NS.to_string(),
        desired,
        store_format: StoreFormat::ObjectBased,
        selection: MediaSelection {
            devices: vec!["sdb".to_string()],
            ..Default::default()
        },
        metadata_device: None,
        size_hints: SizeHints::default(),
        host_network: false,
    }
}

fn reconciler(
    substrate: &Arc<InMemorySubstrate>,
    membership: &Arc<RecordingMembership>,
) -> FleetReconciler {
    FleetReconciler::new(substrate.clone(), membership.clone(), Config::default())
}

type EventLog = Arc<Mutex<Vec<String>>>;

/// Substrate double that appends every mutation to a shared event log and
/// can fail selected workload creates with a transport error.
struct FaultySubstrate {
    inner: InMemorySubstrate,
    events: EventLog,
    failing_workloads: BTreeSet<String>,
}

impl FaultySubstrate {
    fn new(events: EventLog) -> Self {
        Self {
            inner: InMemorySubstrate::new(),
            events,
            failing_workloads: BTreeSet::new(),
        }
    }

    fn failing_workload(mut self, name: &str) -> Self {
        self.failing_workloads.insert(name.to_string());
        self
    }

    fn log(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl SubstrateClient for FaultySubstrate {
    async fn create_config_artifact(
        &self,
        namespace: &str,
        artifact: &ConfigArtifact,
    ) -> Result<(), SubstrateError> {
        self.log(format!("create config {}", artifact.name));
        self.inner.create_config_artifact(namespace, artifact).await
    }

    async fn update_config_artifact(
        &self,
        namespace: &str,
        artifact: &ConfigArtifact,
    ) -> Result<(), SubstrateError> {
        self.inner.update_config_artifact(namespace, artifact).await
    }

    async fn delete_config_artifact(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<(), SubstrateError> {
        self.log(format!("delete config {name}"));
        self.inner.delete_config_artifact(namespace, name).await
    }

    async fn create_workload(
        &self,
        namespace: &str,
        workload: &WorkloadDescriptor,
    ) -> Result<(), SubstrateError> {
        if self.failing_workloads.contains(&workload.name) {
            return Err(SubstrateError::Transport(format!(
                "connection reset creating {}",
                workload.name
            )));
        }
        self.log(format!("create workload {}", workload.name));
        self.inner.create_workload(namespace, workload).await
    }

    async fn delete_workload(&self, namespace: &str, name: &str) -> Result<(), SubstrateError> {
        self.log(format!("delete workload {name}"));
        self.inner.delete_workload(namespace, name).await
    }

    async fn create_endpoint(
        &self,
        namespace: &str,
        endpoint: &NetworkEndpoint,
    ) -> Result<(), SubstrateError> {
        self.log(format!("create endpoint {}", endpoint.name));
        self.inner.create_endpoint(namespace, endpoint).await
    }

    async fn delete_endpoint(&self, namespace: &str, name: &str) -> Result<(), SubstrateError> {
        self.log(format!("delete endpoint {name}"));
        self.inner.delete_endpoint(namespace, name).await
    }
}

/// Membership double writing into the same event log as `FaultySubstrate`,
/// so tests can assert ordering across the two collaborators.
struct LoggingMembership {
    events: EventLog,
}

#[async_trait]
impl RecoveryMembership for LoggingMembership {
    async fn add(&self, _pool: &str, _namespace: &str, identity: &str) -> Result<(), GraceError> {
        self.events.lock().unwrap().push(format!("add {identity}"));
        Ok(())
    }

    async fn remove(
        &self,
        _pool: &str,
        _namespace: &str,
        identity: &str,
    ) -> Result<(), GraceError> {
        self.events.lock().unwrap().push(format!("remove {identity}"));
        Ok(())
    }
}

#[tokio::test]
async fn gateway_scale_up_creates_every_instance_resource() {
    let substrate = Arc::new(InMemorySubstrate::new());
    let membership = Arc::new(RecordingMembership::new());
    let reconciler = reconciler(&substrate, &membership);

    let report = reconciler.reconcile_gateway(&gateway_spec(2)).await.unwrap();

    assert!(report.is_converged());
    assert_eq!(report.instances_applied, 2);
    assert_eq!(report.memberships_added, 2);

    let expected = vec![
        "flotilla-gateway-shared-a".to_string(),
        "flotilla-gateway-shared-b".to_string(),
    ];
    assert_eq!(substrate.config_artifact_names(NS).await, expected);
    assert_eq!(substrate.workload_names(NS).await, expected);
    assert_eq!(substrate.endpoint_names(NS).await, expected);
    assert_eq!(membership.identities_with_op("add"), vec!["a", "b"]);
}

#[tokio::test]
async fn rerunning_a_pass_updates_configs_in_place() {
    let substrate = Arc::new(InMemorySubstrate::new());
    let membership = Arc::new(RecordingMembership::new());
    let reconciler = reconciler(&substrate, &membership);
    let spec = gateway_spec(1);

    reconciler.reconcile_gateway(&spec).await.unwrap();
    let report = reconciler.reconcile_gateway(&spec).await.unwrap();

    assert!(report.is_converged());
    assert!(substrate
        .operations()
        .await
        .contains(&Operation::UpdateConfigArtifact(
            "flotilla-gateway-shared-a".to_string()
        )));
    // Existing workload and endpoint are converged, not duplicated.
    assert_eq!(substrate.workload_names(NS).await.len(), 1);
    assert_eq!(substrate.endpoint_names(NS).await.len(), 1);
}

#[tokio::test]
async fn invalid_spec_makes_no_substrate_calls() {
    let substrate = Arc::new(InMemorySubstrate::new());
    let membership = Arc::new(RecordingMembership::new());
    let reconciler = reconciler(&substrate, &membership);

    let err = reconciler
        .reconcile_gateway(&gateway_spec(0))
        .await
        .unwrap_err();

    assert!(err.is_validation());
    assert_eq!(substrate.operation_count().await, 0);
    assert!(membership.calls().is_empty());
}

#[tokio::test]
async fn storage_fleet_without_media_makes_no_substrate_calls() {
    let substrate = Arc::new(InMemorySubstrate::new());
    let membership = Arc::new(RecordingMembership::new());
    let reconciler = reconciler(&substrate, &membership);

    let mut spec = storage_spec(2);
    spec.selection = MediaSelection::default();
    let err = reconciler.reconcile_storage(&spec).await.unwrap_err();

    assert!(err.is_validation());
    assert!(err.to_string().contains("empty volumes"));
    assert_eq!(substrate.operation_count().await, 0);
}

#[tokio::test]
async fn storage_fleet_has_no_endpoints_and_no_memberships() {
    let substrate = Arc::new(InMemorySubstrate::new());
    let membership = Arc::new(RecordingMembership::new());
    let reconciler = reconciler(&substrate, &membership);

    let report = reconciler.reconcile_storage(&storage_spec(2)).await.unwrap();

    assert!(report.is_converged());
    assert_eq!(report.instances_applied, 2);
    assert_eq!(
        substrate.workload_names(NS).await,
        vec!["flotilla-storage-main-a", "flotilla-storage-main-b"]
    );
    assert!(substrate.endpoint_names(NS).await.is_empty());
    assert!(membership.calls().is_empty());
}

#[tokio::test]
async fn gateway_scale_down_removes_the_tail_and_keeps_configs() {
    let substrate = Arc::new(InMemorySubstrate::new());
    let membership = Arc::new(RecordingMembership::new());
    let reconciler = reconciler(&substrate, &membership);

    reconciler.reconcile_gateway(&gateway_spec(3)).await.unwrap();
    let report = reconciler
        .scale_down_gateway(&gateway_spec(1), 3)
        .await
        .unwrap();

    assert!(report.is_converged());
    assert_eq!(report.instances_removed, 2);
    assert_eq!(report.memberships_removed, 2);
    assert_eq!(membership.identities_with_op("remove"), vec!["b", "c"]);

    // The surviving instance is untouched; removed instances keep their
    // config artifacts for a later scale-up.
    assert_eq!(
        substrate.workload_names(NS).await,
        vec!["flotilla-gateway-shared-a"]
    );
    assert_eq!(
        substrate.endpoint_names(NS).await,
        vec!["flotilla-gateway-shared-a"]
    );
    assert_eq!(substrate.config_artifact_names(NS).await.len(), 3);
}

#[tokio::test]
async fn gateway_teardown_removes_configs_too() {
    let substrate = Arc::new(InMemorySubstrate::new());
    let membership = Arc::new(RecordingMembership::new());
    let reconciler = reconciler(&substrate, &membership);

    let spec = gateway_spec(2);
    reconciler.reconcile_gateway(&spec).await.unwrap();
    let report = reconciler.teardown_gateway(&spec, 2).await.unwrap();

    assert!(report.is_converged());
    assert_eq!(report.instances_removed, 2);
    assert_eq!(report.memberships_removed, 2);
    assert!(substrate.workload_names(NS).await.is_empty());
    assert!(substrate.endpoint_names(NS).await.is_empty());
    assert!(substrate.config_artifact_names(NS).await.is_empty());
}

#[tokio::test]
async fn storage_teardown_removes_workloads_and_configs() {
    let substrate = Arc::new(InMemorySubstrate::new());
    let membership = Arc::new(RecordingMembership::new());
    let reconciler = reconciler(&substrate, &membership);

    let spec = storage_spec(2);
    reconciler.reconcile_storage(&spec).await.unwrap();
    let report = reconciler.teardown_storage(&spec, 2).await.unwrap();

    assert!(report.is_converged());
    assert_eq!(report.instances_removed, 2);
    assert!(substrate.workload_names(NS).await.is_empty());
    assert!(substrate.config_artifact_names(NS).await.is_empty());
}

#[tokio::test]
async fn membership_failure_never_fails_the_pass() {
    let substrate = Arc::new(InMemorySubstrate::new());
    let membership = Arc::new(RecordingMembership::failing());
    let reconciler = reconciler(&substrate, &membership);

    let report = reconciler.reconcile_gateway(&gateway_spec(2)).await.unwrap();

    assert!(report.is_converged());
    assert_eq!(report.instances_applied, 2);
    assert_eq!(report.memberships_added, 0);
    // The tool was still invoked for every instance.
    assert_eq!(membership.identities_with_op("add"), vec!["a", "b"]);
}

#[tokio::test]
async fn deletes_tolerate_resources_that_are_already_gone() {
    let substrate = Arc::new(InMemorySubstrate::new());
    let membership = Arc::new(RecordingMembership::new());
    let reconciler = reconciler(&substrate, &membership);

    // Nothing was ever created; the tail instances are simply gone.
    let report = reconciler
        .scale_down_gateway(&gateway_spec(1), 3)
        .await
        .unwrap();

    assert!(report.is_converged());
    assert_eq!(report.instances_removed, 2);
}

#[tokio::test]
async fn transport_failure_on_one_instance_does_not_block_the_rest() {
    let events: EventLog = Arc::new(Mutex::new(Vec::new()));
    let substrate = Arc::new(
        FaultySubstrate::new(Arc::clone(&events)).failing_workload("flotilla-storage-main-a"),
    );
    let membership = Arc::new(RecordingMembership::new());
    let reconciler =
        FleetReconciler::new(substrate.clone(), membership.clone(), Config::default());

    let report = reconciler.reconcile_storage(&storage_spec(2)).await.unwrap();

    assert!(!report.is_converged());
    assert_eq!(report.instances_applied, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].identity, "a");
    assert!(report.failures[0].detail.contains("transport"));
    // The later ordinal converged despite the earlier one failing.
    assert_eq!(
        substrate.inner.workload_names(NS).await,
        vec!["flotilla-storage-main-b"]
    );
}

#[tokio::test]
async fn scale_down_leaves_the_recovery_database_before_deleting_resources() {
    let events: EventLog = Arc::new(Mutex::new(Vec::new()));
    let substrate = Arc::new(FaultySubstrate::new(Arc::clone(&events)));
    let membership = Arc::new(LoggingMembership {
        events: Arc::clone(&events),
    });
    let reconciler =
        FleetReconciler::new(substrate.clone(), membership.clone(), Config::default());

    reconciler.reconcile_gateway(&gateway_spec(3)).await.unwrap();
    reconciler
        .scale_down_gateway(&gateway_spec(1), 3)
        .await
        .unwrap();

    let events = events.lock().unwrap().clone();
    for identity in ["b", "c"] {
        let removed = events
            .iter()
            .position(|e| e == &format!("remove {identity}"))
            .unwrap();
        let deleted = events
            .iter()
            .position(|e| e == &format!("delete workload flotilla-gateway-shared-{identity}"))
            .unwrap();
        assert!(
            removed < deleted,
            "instance {identity} must leave the recovery database before its workload is deleted"
        );
    }
}

#[tokio::test]
async fn scale_down_storage_keeps_config_artifacts() {
    let substrate = Arc::new(InMemorySubstrate::new());
    let membership = Arc::new(RecordingMembership::new());
    let reconciler = reconciler(&substrate, &membership);

    reconciler.reconcile_storage(&storage_spec(3)).await.unwrap();
    let report = reconciler
        .scale_down_storage(&storage_spec(1), 3)
        .await
        .unwrap();

    assert!(report.is_converged());
    assert_eq!(report.instances_removed, 2);
    assert_eq!(
        substrate.workload_names(NS).await,
        vec!["flotilla-storage-main-a"]
    );
    assert_eq!(substrate.config_artifact_names(NS).await.len(), 3);
}
