//! Workload controller status: replica readiness for apps kinds and job outcome

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::batch::v1::Job;
use kube::core::DynamicObject;

use super::{KindStatus, ObjectStatus, StatusError, parse_as};
use crate::cluster::ObjectStore;
use crate::models::ResourceKind;

/// Replica-count based checker for one workload kind
pub struct WorkloadChecker {
    kind: ResourceKind,
}

impl WorkloadChecker {
    /// Kinds this checker knows how to classify
    pub const KINDS: &'static [ResourceKind] = &[
        ResourceKind::Deployment,
        ResourceKind::ReplicaSet,
        ResourceKind::StatefulSet,
        ResourceKind::DaemonSet,
        ResourceKind::Job,
    ];

    pub fn new(kind: ResourceKind) -> Self {
        Self { kind }
    }
}

#[async_trait]
impl KindStatus for WorkloadChecker {
    async fn status(
        &self,
        object: &DynamicObject,
        _store: &dyn ObjectStore,
    ) -> Result<ObjectStatus, StatusError> {
        match self.kind {
            ResourceKind::Deployment => {
                let deployment: Deployment = parse_as(object, self.kind)?;
                let desired = deployment.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1);
                let available = deployment
                    .status
                    .as_ref()
                    .and_then(|s| s.available_replicas)
                    .unwrap_or(0);
                Ok(replicas_status("Deployment", desired, available))
            }
            ResourceKind::ReplicaSet => {
                let rs: ReplicaSet = parse_as(object, self.kind)?;
                let desired = rs.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1);
                let ready = rs.status.as_ref().and_then(|s| s.ready_replicas).unwrap_or(0);
                Ok(replicas_status("Replica Set", desired, ready))
            }
            ResourceKind::StatefulSet => {
                let sts: StatefulSet = parse_as(object, self.kind)?;
                let desired = sts.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1);
                let ready = sts.status.as_ref().and_then(|s| s.ready_replicas).unwrap_or(0);
                Ok(replicas_status("Stateful Set", desired, ready))
            }
            ResourceKind::DaemonSet => {
                let ds: DaemonSet = parse_as(object, self.kind)?;
                let (desired, ready) = ds
                    .status
                    .as_ref()
                    .map(|s| (s.desired_number_scheduled, s.number_ready))
                    .unwrap_or((0, 0));
                Ok(replicas_status("Daemon Set", desired, ready))
            }
            ResourceKind::Job => {
                let job: Job = parse_as(object, self.kind)?;
                let status = job.status.unwrap_or_default();
                let failed = status.failed.unwrap_or(0);
                let succeeded = status.succeeded.unwrap_or(0);
                let active = status.active.unwrap_or(0);

                if failed > 0 {
                    Ok(ObjectStatus::error(format!("Job has {} failed pods", failed)))
                } else if succeeded > 0 && active == 0 {
                    Ok(ObjectStatus::ok("Job has completed"))
                } else {
                    Ok(ObjectStatus::ok("Job is running"))
                }
            }
            other => Err(StatusError::WrongKind {
                expected: other.as_str(),
            }),
        }
    }
}

fn replicas_status(label: &str, desired: i32, ready: i32) -> ObjectStatus {
    tracing::debug!("{} desired: {}, ready: {}", label, desired, ready);

    if ready >= desired {
        ObjectStatus::ok(format!("{} is OK", label))
    } else {
        ObjectStatus::warning(format!(
            "Expected {} replicas, but {} are available",
            desired, ready
        ))
    }
}
