//! Aggregate node for the pods of one controller

use futures::future::join_all;
use kube::ResourceExt;
use kube::core::DynamicObject;
use std::sync::Arc;

use super::{Component, Node, PodStatus};
use crate::status::{ObjectStatus, StatusResolver};

/// Renders a set of sibling pods into one node
#[derive(Clone)]
pub struct PodGroupNode {
    status: Arc<dyn StatusResolver>,
}

impl PodGroupNode {
    pub fn new(status: Arc<dyn StatusResolver>) -> Self {
        Self { status }
    }

    /// Build the group node. Status is the worst member status; a member
    /// whose status cannot be resolved counts as OK.
    pub async fn create(&self, name: &str, members: &[DynamicObject]) -> Node {
        let statuses = join_all(members.iter().map(|pod| async move {
            match self.status.status(pod).await {
                Ok(status) => status,
                Err(e) => {
                    tracing::warn!("Unable to resolve status for Pod {}: {}", pod.name_any(), e);
                    ObjectStatus::default()
                }
            }
        }))
        .await;

        let mut pods = PodStatus::default();
        for (pod, status) in members.iter().zip(statuses) {
            pods.add_summary(&pod.name_any(), status.details, status.node_status);
        }

        let status = pods.status();
        let count = pods.pods.len();
        tracing::debug!("Pod group {} has {} pods, status {}", name, count, status.as_str());

        Node {
            name: name.to_string(),
            api_version: "v1".to_string(),
            kind: "Pod".to_string(),
            status,
            details: vec![
                Component::PodStatus(pods),
                Component::text(format!("{} pods", count)),
            ],
            path: None,
        }
    }
}
