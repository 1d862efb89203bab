// NodePoolBinding resource

use serde::{Deserialize, Serialize};

use crate::meta::{ListMeta, ObjectMeta, TypeMeta};
use crate::Resource;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolBindingSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub foo: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodePoolBindingStatus {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodePoolBinding {
    #[serde(flatten)]
    pub type_meta: TypeMeta,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: NodePoolBindingSpec,
    #[serde(default)]
    pub status: NodePoolBindingStatus,
}

impl Resource for NodePoolBinding {
    const KIND: &'static str = "NodePoolBinding";
}

impl NodePoolBinding {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            type_meta: Self::type_meta(),
            metadata: ObjectMeta::named(name).with_namespace(namespace),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodePoolBindingList {
    #[serde(flatten)]
    pub type_meta: TypeMeta,
    #[serde(default)]
    pub metadata: ListMeta,
    pub items: Vec<NodePoolBinding>,
}

impl Resource for NodePoolBindingList {
    const KIND: &'static str = "NodePoolBindingList";
}
