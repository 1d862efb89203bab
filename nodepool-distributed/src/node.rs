//! Node records and annotation patching

use crate::context::{CallContext, guarded};
use crate::error::{CoordinationError, Operation, Result, Step, StoreError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// Metadata of a cluster node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMetadata {
    pub name: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

/// A cluster node as far as annotation patching is concerned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub metadata: NodeMetadata,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            metadata: NodeMetadata {
                name: name.into(),
                ..Default::default()
            },
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.annotations.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.metadata.annotations.get(key).map(String::as_str)
    }
}

/// Node access offered by a coordination backend.
#[async_trait]
pub trait NodeStore: Send + Sync {
    async fn get(&self, ctx: &CallContext, name: &str) -> std::result::Result<Node, StoreError>;

    /// Apply a JSON merge patch (RFC 7386) to the named node.
    async fn merge_patch(
        &self,
        ctx: &CallContext,
        name: &str,
        patch: &Value,
    ) -> std::result::Result<Node, StoreError>;
}

/// The merge patch that sets `annotations` and leaves every other key alone.
pub fn annotations_patch(annotations: &BTreeMap<String, String>) -> Value {
    json!({
        "metadata": {
            "annotations": annotations,
        }
    })
}

/// Annotation operations over a [`NodeStore`].
#[derive(Clone)]
pub struct NodeAnnotator {
    store: Arc<dyn NodeStore>,
}

impl NodeAnnotator {
    pub fn new(store: Arc<dyn NodeStore>) -> Self {
        Self { store }
    }

    /// Add or overwrite `annotations` on node `name`, preserving the rest.
    pub async fn patch_annotations(
        &self,
        ctx: &CallContext,
        name: &str,
        annotations: &BTreeMap<String, String>,
    ) -> Result<()> {
        if name.is_empty() {
            return Err(CoordinationError::InvalidArgument("node name is empty".to_string()));
        }

        let patch = annotations_patch(annotations);
        guarded(
            ctx,
            Operation::PatchAnnotations,
            name,
            Step::Patch,
            self.store.merge_patch(ctx, name, &patch),
        )
        .await?;

        info!(node = name, keys = annotations.len(), "Patched node annotations");
        Ok(())
    }

    pub async fn get_node(&self, ctx: &CallContext, name: &str) -> Result<Node> {
        if name.is_empty() {
            return Err(CoordinationError::InvalidArgument("node name is empty".to_string()));
        }
        guarded(ctx, Operation::GetNode, name, Step::Get, self.store.get(ctx, name)).await
    }
}
