//! Fleet reconciliation driver.
//!
//! Drives the declared fleet specs toward reality, one ordinal at a time.
//! Each pass validates the spec first (a bad spec makes zero substrate
//! calls), then walks ordinals in order. Per-instance transport failures
//! are recorded and the loop keeps going, so one bad instance never blocks
//! the rest of the fleet.

use std::sync::Arc;

use flotilla_substrate::{SubstrateClient, SubstrateError};
use tracing::{debug, info, warn};

use crate::builder::{gateway, storage, ResourceSet};
use crate::config::Config;
use crate::error::OperatorError;
use crate::fleet::{DaemonInstance, GatewayFleetSpec, Role, StorageFleetSpec};
use crate::grace::RecoveryMembership;
use crate::planner;

/// One instance the pass could not converge.
#[derive(Debug, Clone)]
pub struct InstanceFailure {
    pub identity: String,
    pub detail: String,
}

/// Outcome of one reconciliation pass over a fleet.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub instances_applied: u32,
    pub instances_removed: u32,
    pub memberships_added: u32,
    pub memberships_removed: u32,
    pub failures: Vec<InstanceFailure>,
}

impl ReconcileReport {
    /// True when every instance the pass touched converged.
    pub fn is_converged(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Reconciles storage-node and export-gateway fleets against the substrate.
pub struct FleetReconciler {
    substrate: Arc<dyn SubstrateClient>,
    membership: Arc<dyn RecoveryMembership>,
    config: Config,
}

impl FleetReconciler {
    pub fn new(
        substrate: Arc<dyn SubstrateClient>,
        membership: Arc<dyn RecoveryMembership>,
        config: Config,
    ) -> Self {
        Self {
            substrate,
            membership,
            config,
        }
    }

    /// Converges a storage fleet to its declared instance count.
    pub async fn reconcile_storage(
        &self,
        spec: &StorageFleetSpec,
    ) -> Result<ReconcileReport, OperatorError> {
        spec.validate()?;
        let plan = planner::plan(
            spec.store_format,
            &spec.selection,
            spec.metadata_device.clone(),
            spec.size_hints.clone(),
        )?;

        let mut report = ReconcileReport::default();
        for ordinal in 0..spec.desired {
            let instance = DaemonInstance::new(ordinal, Role::StorageNode);
            let set = storage::build(&instance, &plan, spec, &self.config);
            match self.apply_resource_set(&spec.namespace, &set).await {
                Ok(()) => {
                    report.instances_applied += 1;
                    debug!(fleet = %spec.name, instance = %instance.identity, "Storage instance applied");
                }
                Err(e) => {
                    warn!(fleet = %spec.name, instance = %instance.identity, error = %e, "Storage instance failed");
                    report.failures.push(InstanceFailure {
                        identity: instance.identity,
                        detail: e.to_string(),
                    });
                }
            }
        }

        info!(
            fleet = %spec.name,
            applied = report.instances_applied,
            failed = report.failures.len(),
            "Storage fleet reconciled"
        );
        Ok(report)
    }

    /// Converges a gateway fleet to its declared active server count,
    /// enrolling each instance in the shared recovery database.
    pub async fn reconcile_gateway(
        &self,
        spec: &GatewayFleetSpec,
    ) -> Result<ReconcileReport, OperatorError> {
        spec.validate()?;

        let mut report = ReconcileReport::default();
        for ordinal in 0..spec.active {
            let instance = DaemonInstance::new(ordinal, Role::ExportGateway);
            let set = gateway::build(&instance, spec, &self.config);
            match self.apply_resource_set(&spec.namespace, &set).await {
                Ok(()) => {
                    report.instances_applied += 1;
                }
                Err(e) => {
                    warn!(fleet = %spec.name, instance = %instance.identity, error = %e, "Gateway instance failed");
                    report.failures.push(InstanceFailure {
                        identity: instance.identity,
                        detail: e.to_string(),
                    });
                    continue;
                }
            }

            // Membership failures degrade failover, not service. Warn and
            // keep going.
            match self
                .membership
                .add(&spec.recovery_pool, &spec.recovery_namespace, &instance.identity)
                .await
            {
                Ok(()) => report.memberships_added += 1,
                Err(e) => {
                    warn!(
                        fleet = %spec.name,
                        instance = %instance.identity,
                        error = %e,
                        "Failed to add instance to recovery database"
                    );
                }
            }
        }

        info!(
            fleet = %spec.name,
            applied = report.instances_applied,
            enrolled = report.memberships_added,
            failed = report.failures.len(),
            "Gateway fleet reconciled"
        );
        Ok(report)
    }

    /// Removes storage instances with ordinals in `[spec.desired, previous)`.
    /// Config artifacts are retained so a later scale-up reuses them.
    pub async fn scale_down_storage(
        &self,
        spec: &StorageFleetSpec,
        previous: u32,
    ) -> Result<ReconcileReport, OperatorError> {
        spec.validate()?;

        let mut report = ReconcileReport::default();
        for ordinal in spec.desired..previous {
            let instance = DaemonInstance::new(ordinal, Role::StorageNode);
            let name = storage_name(spec, &instance);
            match self
                .delete_tolerating_not_found(self.substrate.delete_workload(&spec.namespace, &name))
                .await
            {
                Ok(()) => report.instances_removed += 1,
                Err(e) => report.failures.push(InstanceFailure {
                    identity: instance.identity,
                    detail: e.to_string(),
                }),
            }
        }
        Ok(report)
    }

    /// Removes gateway instances with ordinals in `[spec.active, previous)`.
    ///
    /// Each instance leaves the recovery database before its resources are
    /// deleted, so surviving servers do not wait out a grace period for a
    /// peer that is gone on purpose. Config artifacts are retained.
    pub async fn scale_down_gateway(
        &self,
        spec: &GatewayFleetSpec,
        previous: u32,
    ) -> Result<ReconcileReport, OperatorError> {
        spec.validate()?;

        let mut report = ReconcileReport::default();
        for ordinal in spec.active..previous {
            let instance = DaemonInstance::new(ordinal, Role::ExportGateway);
            self.remove_gateway_instance(spec, &instance, false, &mut report)
                .await;
        }
        Ok(report)
    }

    /// Tears down every storage instance in `[0, current)`, config
    /// artifacts included.
    pub async fn teardown_storage(
        &self,
        spec: &StorageFleetSpec,
        current: u32,
    ) -> Result<ReconcileReport, OperatorError> {
        spec.validate()?;

        let mut report = ReconcileReport::default();
        for ordinal in 0..current {
            let instance = DaemonInstance::new(ordinal, Role::StorageNode);
            let name = storage_name(spec, &instance);
            let mut ok = true;
            if let Err(e) = self
                .delete_tolerating_not_found(self.substrate.delete_workload(&spec.namespace, &name))
                .await
            {
                ok = false;
                report.failures.push(InstanceFailure {
                    identity: instance.identity.clone(),
                    detail: e.to_string(),
                });
            }
            if let Err(e) = self
                .delete_tolerating_not_found(
                    self.substrate.delete_config_artifact(&spec.namespace, &name),
                )
                .await
            {
                ok = false;
                report.failures.push(InstanceFailure {
                    identity: instance.identity.clone(),
                    detail: e.to_string(),
                });
            }
            if ok {
                report.instances_removed += 1;
            }
        }
        Ok(report)
    }

    /// Tears down every gateway instance in `[0, current)`, config
    /// artifacts included.
    pub async fn teardown_gateway(
        &self,
        spec: &GatewayFleetSpec,
        current: u32,
    ) -> Result<ReconcileReport, OperatorError> {
        spec.validate()?;

        let mut report = ReconcileReport::default();
        for ordinal in 0..current {
            let instance = DaemonInstance::new(ordinal, Role::ExportGateway);
            self.remove_gateway_instance(spec, &instance, true, &mut report)
                .await;
        }
        Ok(report)
    }

    async fn remove_gateway_instance(
        &self,
        spec: &GatewayFleetSpec,
        instance: &DaemonInstance,
        delete_config: bool,
        report: &mut ReconcileReport,
    ) {
        // Leave the recovery database first; the workload may still be
        // serving until the delete lands.
        match self
            .membership
            .remove(&spec.recovery_pool, &spec.recovery_namespace, &instance.identity)
            .await
        {
            Ok(()) => report.memberships_removed += 1,
            Err(e) => {
                warn!(
                    fleet = %spec.name,
                    instance = %instance.identity,
                    error = %e,
                    "Failed to remove instance from recovery database"
                );
            }
        }

        let name = gateway_name(spec, instance);
        let mut ok = true;
        if let Err(e) = self
            .delete_tolerating_not_found(self.substrate.delete_workload(&spec.namespace, &name))
            .await
        {
            ok = false;
            report.failures.push(InstanceFailure {
                identity: instance.identity.clone(),
                detail: e.to_string(),
            });
        }
        if let Err(e) = self
            .delete_tolerating_not_found(self.substrate.delete_endpoint(&spec.namespace, &name))
            .await
        {
            ok = false;
            report.failures.push(InstanceFailure {
                identity: instance.identity.clone(),
                detail: e.to_string(),
            });
        }
        if delete_config {
            if let Err(e) = self
                .delete_tolerating_not_found(
                    self.substrate.delete_config_artifact(&spec.namespace, &name),
                )
                .await
            {
                ok = false;
                report.failures.push(InstanceFailure {
                    identity: instance.identity.clone(),
                    detail: e.to_string(),
                });
            }
        }
        if ok {
            report.instances_removed += 1;
        }
    }

    /// Applies one instance's resource set: config artifact first (create,
    /// falling back to update in place), then workload, then endpoint.
    /// Existing workloads and endpoints are treated as converged.
    async fn apply_resource_set(
        &self,
        namespace: &str,
        set: &ResourceSet,
    ) -> Result<(), SubstrateError> {
        match self.substrate.create_config_artifact(namespace, &set.config).await {
            Ok(()) => {}
            Err(e) if e.is_already_exists() => {
                debug!(name = %set.config.name, "Config artifact exists, updating in place");
                self.substrate
                    .update_config_artifact(namespace, &set.config)
                    .await?;
            }
            Err(e) => return Err(e),
        }

        match self.substrate.create_workload(namespace, &set.workload).await {
            Ok(()) => {}
            Err(e) if e.is_already_exists() => {
                debug!(name = %set.workload.name, "Workload already exists");
            }
            Err(e) => return Err(e),
        }

        if let Some(endpoint) = &set.endpoint {
            match self.substrate.create_endpoint(namespace, endpoint).await {
                Ok(()) => {}
                Err(e) if e.is_already_exists() => {
                    debug!(name = %endpoint.name, "Endpoint already exists");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    async fn delete_tolerating_not_found(
        &self,
        fut: impl std::future::Future<Output = Result<(), SubstrateError>>,
    ) -> Result<(), SubstrateError> {
        match fut.await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => {
                debug!(error = %e, "Resource already gone");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

fn storage_name(spec: &StorageFleetSpec, instance: &DaemonInstance) -> String {
    flotilla_identity::resource_name(
        crate::builder::STORAGE_APP_NAME,
        &spec.name,
        &instance.identity,
    )
}

fn gateway_name(spec: &GatewayFleetSpec, instance: &DaemonInstance) -> String {
    flotilla_identity::resource_name(
        crate::builder::GATEWAY_APP_NAME,
        &spec.name,
        &instance.identity,
    )
}
