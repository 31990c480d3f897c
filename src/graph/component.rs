//! Exported graph component
//!
//! These types are the JSON surface consumed by the front end. Components
//! serialize as `{"metadata": {"type": ...}, "config": {...}}` envelopes and
//! field names must stay stable.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

/// Health classification of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    #[default]
    Ok,
    Warning,
    Error,
    Unknown,
}

impl NodeStatus {
    /// Rank used when folding statuses: Error > Warning > Unknown > Ok
    fn severity(self) -> u8 {
        match self {
            NodeStatus::Ok => 0,
            NodeStatus::Unknown => 1,
            NodeStatus::Warning => 2,
            NodeStatus::Error => 3,
        }
    }

    /// The worse of two statuses
    pub fn worst(self, other: NodeStatus) -> NodeStatus {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Ok => "ok",
            NodeStatus::Warning => "warning",
            NodeStatus::Error => "error",
            NodeStatus::Unknown => "unknown",
        }
    }
}

/// Plain text component
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Text {
    pub value: String,
}

/// Navigable link component
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Link {
    /// Display text
    pub value: String,
    /// Dashboard path the link points at
    #[serde(rename = "ref")]
    pub reference: String,
}

/// Summary of one pod inside a pod group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PodSummary {
    pub details: Vec<Component>,
    pub status: NodeStatus,
}

/// Per-pod status listing shown on pod group nodes
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PodStatus {
    /// Keyed by pod name so output order does not depend on ingestion order
    pub pods: BTreeMap<String, PodSummary>,
}

impl PodStatus {
    pub fn add_summary(&mut self, name: &str, details: Vec<Component>, status: NodeStatus) {
        self.pods
            .insert(name.to_string(), PodSummary { details, status });
    }

    /// Worst status among all summarized pods
    pub fn status(&self) -> NodeStatus {
        self.pods
            .values()
            .fold(NodeStatus::Ok, |acc, pod| acc.worst(pod.status))
    }
}

/// Detail components attached to nodes
#[derive(Debug, Clone, PartialEq)]
pub enum Component {
    Text(Text),
    Link(Link),
    PodStatus(PodStatus),
}

impl Component {
    pub fn text(value: impl Into<String>) -> Self {
        Component::Text(Text {
            value: value.into(),
        })
    }

    pub fn link(value: impl Into<String>, reference: impl Into<String>) -> Self {
        Component::Link(Link {
            value: value.into(),
            reference: reference.into(),
        })
    }

    /// Wire name of the component type
    pub fn type_name(&self) -> &'static str {
        match self {
            Component::Text(_) => "text",
            Component::Link(_) => "link",
            Component::PodStatus(_) => "podStatus",
        }
    }
}

#[derive(Serialize)]
struct Metadata<'a> {
    #[serde(rename = "type")]
    component_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a [Component]>,
}

impl Serialize for Component {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut envelope = serializer.serialize_struct("Component", 2)?;
        envelope.serialize_field(
            "metadata",
            &Metadata {
                component_type: self.type_name(),
                title: None,
            },
        )?;
        match self {
            Component::Text(config) => envelope.serialize_field("config", config)?,
            Component::Link(config) => envelope.serialize_field("config", config)?,
            Component::PodStatus(config) => envelope.serialize_field("config", config)?,
        }
        envelope.end()
    }
}

/// A renderable unit of the graph
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub name: String,
    pub api_version: String,
    pub kind: String,
    pub status: NodeStatus,
    pub details: Vec<Component>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Component>,
}

/// Kind of relation an edge expresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeType {
    Explicit,
}

/// A directed display relation to another node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Edge {
    pub node: String,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
}

impl Edge {
    pub fn explicit(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            edge_type: EdgeType::Explicit,
        }
    }
}

/// Rendered nodes keyed by node id
pub type Nodes = BTreeMap<String, Node>;

/// Outbound edges keyed by source node id
pub type AdjacencyList = BTreeMap<String, Vec<Edge>>;

/// The exported resource viewer graph
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceViewerComponent {
    pub title: String,
    pub nodes: Nodes,
    pub edges: AdjacencyList,
    pub selected: String,
}

#[derive(Serialize)]
struct ViewerConfig<'a> {
    edges: &'a AdjacencyList,
    nodes: &'a Nodes,
    selected: &'a str,
}

impl ResourceViewerComponent {
    pub fn new(
        title: impl Into<String>,
        nodes: Nodes,
        edges: AdjacencyList,
        selected: String,
    ) -> Self {
        Self {
            title: title.into(),
            nodes,
            edges,
            selected,
        }
    }

    /// The node the UI highlights, if it exists
    pub fn selected_node(&self) -> Option<&Node> {
        self.nodes.get(&self.selected)
    }

    /// Total number of edges across all sources
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }
}

impl Serialize for ResourceViewerComponent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let title = [Component::text(self.title.clone())];
        let mut envelope = serializer.serialize_struct("ResourceViewer", 2)?;
        envelope.serialize_field(
            "metadata",
            &Metadata {
                component_type: "resourceViewer",
                title: Some(&title),
            },
        )?;
        envelope.serialize_field(
            "config",
            &ViewerConfig {
                edges: &self.edges,
                nodes: &self.nodes,
                selected: &self.selected,
            },
        )?;
        envelope.end()
    }
}
