// NodePool resource

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::meta::{ListMeta, ObjectMeta, TypeMeta};
use crate::Resource;

/// Desired state of a NodePool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolSpec {
    /// Labels that select member nodes
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_selector: BTreeMap<String, String>,
    /// e.g. amd64, arm64
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub architecture: String,
    /// e.g. linux, windows
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub operating_system: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub os_image: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kernel_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kubelet_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cpu_vendor: String,
    /// Explicit member node names
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<String>,
}

/// Aggregate resource capacity of the pool, as quantity strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodePoolCapacity {
    #[serde(default)]
    pub cpu: String,
    #[serde(default, rename = "ephemeral-storage")]
    pub ephemeral_storage: String,
    #[serde(default, rename = "hugepages-1Gi")]
    pub hugepages_1gi: String,
    #[serde(default, rename = "hugepages-2Mi")]
    pub hugepages_2mi: String,
    #[serde(default)]
    pub memory: String,
    #[serde(default)]
    pub pods: String,
}

/// Count of member nodes sharing one set of properties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDetail {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub architecture: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub operating_system: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub os_image: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kernel_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kubelet_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cpu_vendor: String,
    #[serde(default)]
    pub count: i32,
}

/// Known values of [`NodePoolStatus::nodes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeSchedulingState {
    Schedulable,
    Unschedulable,
}

impl NodeSchedulingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeSchedulingState::Schedulable => "Schedulable",
            NodeSchedulingState::Unschedulable => "Unschedulable",
        }
    }

    /// `None` for states this version does not know.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Schedulable" => Some(NodeSchedulingState::Schedulable),
            "Unschedulable" => Some(NodeSchedulingState::Unschedulable),
            _ => None,
        }
    }
}

/// Observed state of a NodePool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub available_nodes: Vec<String>,
    /// Keyed by a property signature such as `amd64/linux`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_details: BTreeMap<String, NodeDetail>,
    #[serde(default)]
    pub capacity: NodePoolCapacity,
    /// Node name to state; any string is kept as written
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub nodes: BTreeMap<String, String>,
}

impl NodePoolStatus {
    /// The recorded state of `node`, if it is one of the known states.
    pub fn node_state(&self, node: &str) -> Option<NodeSchedulingState> {
        self.nodes.get(node).and_then(|s| NodeSchedulingState::parse(s))
    }

    pub fn set_node_state(&mut self, node: impl Into<String>, state: NodeSchedulingState) {
        self.nodes.insert(node.into(), state.as_str().to_string());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodePool {
    #[serde(flatten)]
    pub type_meta: TypeMeta,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: NodePoolSpec,
    #[serde(default)]
    pub status: NodePoolStatus,
}

impl Resource for NodePool {
    const KIND: &'static str = "NodePool";
}

impl NodePool {
    pub fn new(name: impl Into<String>, spec: NodePoolSpec) -> Self {
        Self {
            type_meta: Self::type_meta(),
            metadata: ObjectMeta::named(name),
            spec,
            status: NodePoolStatus::default(),
        }
    }

    /// Whether `labels` satisfy every entry of the node selector.
    pub fn selects(&self, labels: &BTreeMap<String, String>) -> bool {
        self.spec
            .node_selector
            .iter()
            .all(|(key, value)| labels.get(key) == Some(value))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodePoolList {
    #[serde(flatten)]
    pub type_meta: TypeMeta,
    #[serde(default)]
    pub metadata: ListMeta,
    pub items: Vec<NodePool>,
}

impl Resource for NodePoolList {
    const KIND: &'static str = "NodePoolList";
}
