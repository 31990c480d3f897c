//! Well-known Kubernetes resource kinds
//!
//! Centralizes the built-in kinds the viewer understands so that status
//! checkers, link resolution and traversal do not repeat group/kind strings.

use std::fmt;
use std::str::FromStr;

use super::GroupKind;

/// Enumeration of the built-in kinds with dedicated handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    // Workloads
    Pod,
    Deployment,
    ReplicaSet,
    ReplicationController,
    StatefulSet,
    DaemonSet,
    Job,
    CronJob,
    // Discovery and load balancing
    Service,
    Ingress,
    // Config and storage
    ConfigMap,
    Secret,
    PersistentVolumeClaim,
    ServiceAccount,
}

impl ResourceKind {
    /// Get the kind name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Pod => "Pod",
            ResourceKind::Deployment => "Deployment",
            ResourceKind::ReplicaSet => "ReplicaSet",
            ResourceKind::ReplicationController => "ReplicationController",
            ResourceKind::StatefulSet => "StatefulSet",
            ResourceKind::DaemonSet => "DaemonSet",
            ResourceKind::Job => "Job",
            ResourceKind::CronJob => "CronJob",
            ResourceKind::Service => "Service",
            ResourceKind::Ingress => "Ingress",
            ResourceKind::ConfigMap => "ConfigMap",
            ResourceKind::Secret => "Secret",
            ResourceKind::PersistentVolumeClaim => "PersistentVolumeClaim",
            ResourceKind::ServiceAccount => "ServiceAccount",
        }
    }

    /// API groups this kind is served from, preferred group first.
    ///
    /// Legacy groups (`extensions`) are listed so objects stored under them
    /// still resolve to the same kind.
    pub fn groups(&self) -> &'static [&'static str] {
        match self {
            ResourceKind::Pod
            | ResourceKind::ReplicationController
            | ResourceKind::Service
            | ResourceKind::ConfigMap
            | ResourceKind::Secret
            | ResourceKind::PersistentVolumeClaim
            | ResourceKind::ServiceAccount => &[""],
            ResourceKind::Deployment | ResourceKind::ReplicaSet | ResourceKind::DaemonSet => {
                &["apps", "extensions"]
            }
            ResourceKind::StatefulSet => &["apps"],
            ResourceKind::Job | ResourceKind::CronJob => &["batch"],
            ResourceKind::Ingress => &["networking.k8s.io", "extensions"],
        }
    }

    /// Preferred apiVersion used when looking the kind up in a store
    pub fn api_version(&self) -> &'static str {
        match self {
            ResourceKind::Deployment
            | ResourceKind::ReplicaSet
            | ResourceKind::DaemonSet
            | ResourceKind::StatefulSet => "apps/v1",
            ResourceKind::Job | ResourceKind::CronJob => "batch/v1",
            ResourceKind::Ingress => "networking.k8s.io/v1",
            _ => "v1",
        }
    }

    /// Dashboard section path for this kind
    pub fn section(&self) -> &'static str {
        match self {
            ResourceKind::Pod => "workloads/pods",
            ResourceKind::Deployment => "workloads/deployments",
            ResourceKind::ReplicaSet => "workloads/replica-sets",
            ResourceKind::ReplicationController => "workloads/replication-controllers",
            ResourceKind::StatefulSet => "workloads/stateful-sets",
            ResourceKind::DaemonSet => "workloads/daemon-sets",
            ResourceKind::Job => "workloads/jobs",
            ResourceKind::CronJob => "workloads/cron-jobs",
            ResourceKind::Service => "discovery-and-load-balancing/services",
            ResourceKind::Ingress => "discovery-and-load-balancing/ingresses",
            ResourceKind::ConfigMap => "config-and-storage/config-maps",
            ResourceKind::Secret => "config-and-storage/secrets",
            ResourceKind::PersistentVolumeClaim => "config-and-storage/persistent-volume-claims",
            ResourceKind::ServiceAccount => "config-and-storage/service-accounts",
        }
    }

    /// Resolve a group/kind pair to a well-known kind
    pub fn from_group_kind(gk: &GroupKind) -> Option<Self> {
        let kind = Self::parse_optional(&gk.kind)?;
        kind.groups().contains(&gk.group.as_str()).then_some(kind)
    }

    /// Group/kind pairs for every group this kind is served from
    pub fn group_kinds(&self) -> Vec<GroupKind> {
        self.groups()
            .iter()
            .map(|group| GroupKind::new(group, self.as_str()))
            .collect()
    }

    /// Try to parse a string into a ResourceKind, returning None if invalid
    pub fn parse_optional(s: &str) -> Option<Self> {
        s.parse().ok()
    }

    /// Get all well-known kinds
    pub fn all() -> &'static [Self] {
        &[
            ResourceKind::Pod,
            ResourceKind::Deployment,
            ResourceKind::ReplicaSet,
            ResourceKind::ReplicationController,
            ResourceKind::StatefulSet,
            ResourceKind::DaemonSet,
            ResourceKind::Job,
            ResourceKind::CronJob,
            ResourceKind::Service,
            ResourceKind::Ingress,
            ResourceKind::ConfigMap,
            ResourceKind::Secret,
            ResourceKind::PersistentVolumeClaim,
            ResourceKind::ServiceAccount,
        ]
    }

    /// Try to parse a string (case-insensitive, short names allowed)
    pub fn from_str_case_insensitive(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pod" | "pods" | "po" => Some(ResourceKind::Pod),
            "deployment" | "deployments" | "deploy" => Some(ResourceKind::Deployment),
            "replicaset" | "replicasets" | "rs" => Some(ResourceKind::ReplicaSet),
            "replicationcontroller" | "replicationcontrollers" | "rc" => {
                Some(ResourceKind::ReplicationController)
            }
            "statefulset" | "statefulsets" | "sts" => Some(ResourceKind::StatefulSet),
            "daemonset" | "daemonsets" | "ds" => Some(ResourceKind::DaemonSet),
            "job" | "jobs" => Some(ResourceKind::Job),
            "cronjob" | "cronjobs" | "cj" => Some(ResourceKind::CronJob),
            "service" | "services" | "svc" => Some(ResourceKind::Service),
            "ingress" | "ingresses" | "ing" => Some(ResourceKind::Ingress),
            "configmap" | "configmaps" | "cm" => Some(ResourceKind::ConfigMap),
            "secret" | "secrets" => Some(ResourceKind::Secret),
            "persistentvolumeclaim" | "persistentvolumeclaims" | "pvc" => {
                Some(ResourceKind::PersistentVolumeClaim)
            }
            "serviceaccount" | "serviceaccounts" | "sa" => Some(ResourceKind::ServiceAccount),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceKind::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("Unknown resource kind: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str() {
        assert_eq!(ResourceKind::parse_optional("Pod"), Some(ResourceKind::Pod));
        assert_eq!(
            ResourceKind::parse_optional("ReplicaSet"),
            Some(ResourceKind::ReplicaSet)
        );
        assert_eq!(ResourceKind::parse_optional("pod"), None);
        assert_eq!(ResourceKind::parse_optional("Widget"), None);
    }

    #[test]
    fn test_from_group_kind_respects_group() {
        assert_eq!(
            ResourceKind::from_group_kind(&GroupKind::new("extensions", "ReplicaSet")),
            Some(ResourceKind::ReplicaSet)
        );
        assert_eq!(
            ResourceKind::from_group_kind(&GroupKind::new("apps", "ReplicaSet")),
            Some(ResourceKind::ReplicaSet)
        );
        assert_eq!(
            ResourceKind::from_group_kind(&GroupKind::new("example.com", "ReplicaSet")),
            None
        );
        assert_eq!(
            ResourceKind::from_group_kind(&GroupKind::new("", "Service")),
            Some(ResourceKind::Service)
        );
    }

    #[test]
    fn test_from_str_case_insensitive() {
        assert_eq!(
            ResourceKind::from_str_case_insensitive("deploy"),
            Some(ResourceKind::Deployment)
        );
        assert_eq!(
            ResourceKind::from_str_case_insensitive("SVC"),
            Some(ResourceKind::Service)
        );
        assert_eq!(ResourceKind::from_str_case_insensitive("nope"), None);
    }

    #[test]
    fn test_every_kind_round_trips_through_display() {
        for kind in ResourceKind::all() {
            assert_eq!(ResourceKind::parse_optional(&kind.to_string()), Some(*kind));
        }
    }
}
