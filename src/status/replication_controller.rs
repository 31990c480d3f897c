//! Replication controller status: ready replicas against the desired count

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ReplicationController;
use kube::core::DynamicObject;

use super::{KindStatus, ObjectStatus, StatusError, parse_as};
use crate::cluster::ObjectStore;
use crate::models::ResourceKind;

pub struct ReplicationControllerChecker;

#[async_trait]
impl KindStatus for ReplicationControllerChecker {
    async fn status(
        &self,
        object: &DynamicObject,
        _store: &dyn ObjectStore,
    ) -> Result<ObjectStatus, StatusError> {
        let rc: ReplicationController = parse_as(object, ResourceKind::ReplicationController)?;

        let desired = rc.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1);
        let ready = rc.status.as_ref().and_then(|s| s.ready_replicas).unwrap_or(0);

        tracing::debug!("ReplicationController desired: {}, ready: {}", desired, ready);

        if ready == desired {
            Ok(ObjectStatus::ok("Replication Controller is OK"))
        } else {
            Ok(ObjectStatus::warning(format!(
                "Expected {} replicas, but {} are available",
                desired, ready
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::MemoryStore;
    use crate::models::object_from_value;
    use serde_json::json;

    fn rc(replicas: i32, ready: i32) -> DynamicObject {
        object_from_value(json!({
            "apiVersion": "v1",
            "kind": "ReplicationController",
            "metadata": {"name": "legacy", "namespace": "default"},
            "spec": {"replicas": replicas},
            "status": {"replicas": replicas, "readyReplicas": ready}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_all_replicas_ready() {
        let status = ReplicationControllerChecker
            .status(&rc(3, 3), &MemoryStore::new())
            .await
            .unwrap();
        assert_eq!(status, ObjectStatus::ok("Replication Controller is OK"));
    }

    #[tokio::test]
    async fn test_missing_replicas_is_warning() {
        let status = ReplicationControllerChecker
            .status(&rc(3, 1), &MemoryStore::new())
            .await
            .unwrap();
        assert_eq!(
            status,
            ObjectStatus::warning("Expected 3 replicas, but 1 are available")
        );
    }

    #[tokio::test]
    async fn test_wrong_kind_is_rejected() {
        let pod = object_from_value(json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": {"name": "p"}
        }))
        .unwrap();
        let err = ReplicationControllerChecker
            .status(&pod, &MemoryStore::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "not a ReplicationController");
    }
}
