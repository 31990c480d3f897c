//! Pod status: phase based, with container waiting reasons surfaced as errors

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::core::DynamicObject;

use super::{KindStatus, ObjectStatus, StatusError, parse_as};
use crate::cluster::ObjectStore;
use crate::models::ResourceKind;

/// Waiting reasons that mean the pod cannot make progress on its own
const FAILING_WAITING_REASONS: &[&str] = &[
    "CrashLoopBackOff",
    "ImagePullBackOff",
    "ErrImagePull",
    "InvalidImageName",
    "CreateContainerConfigError",
];

pub struct PodChecker;

#[async_trait]
impl KindStatus for PodChecker {
    async fn status(
        &self,
        object: &DynamicObject,
        _store: &dyn ObjectStore,
    ) -> Result<ObjectStatus, StatusError> {
        pod_status(object)
    }
}

/// Classify a pod from its phase and container states
pub fn pod_status(object: &DynamicObject) -> Result<ObjectStatus, StatusError> {
    let pod: Pod = parse_as(object, ResourceKind::Pod)?;
    let status = pod.status.unwrap_or_default();

    for container in status.container_statuses.iter().flatten() {
        let reason = container
            .state
            .as_ref()
            .and_then(|state| state.waiting.as_ref())
            .and_then(|waiting| waiting.reason.as_deref());
        if let Some(reason) = reason {
            if FAILING_WAITING_REASONS.contains(&reason) {
                return Ok(ObjectStatus::error(format!(
                    "Container {} is in {}",
                    container.name, reason
                )));
            }
        }
    }

    let status = match status.phase.as_deref() {
        Some("Running") | Some("Succeeded") => ObjectStatus::ok("Pod is OK"),
        Some("Pending") => ObjectStatus::warning("Pod is pending"),
        Some("Failed") => match status.reason {
            Some(reason) => ObjectStatus::error(format!("Pod has failed: {}", reason)),
            None => ObjectStatus::error("Pod has failed"),
        },
        _ => ObjectStatus::warning("Pod status is unknown"),
    };

    Ok(status)
}
