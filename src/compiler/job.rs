// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::graph::NodeId;

/// Reference to another job node's output: `[origin_id, origin_slot]` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRef(pub String, pub usize);

impl LinkRef {
    pub fn origin_id(&self) -> &str {
        &self.0
    }

    pub fn origin_slot(&self) -> usize {
        self.1
    }
}

/// One input of a job node: either a literal widget value or a link reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputValue {
    Link(LinkRef),
    Literal(Value),
}

/// Debug-only annotation; the engine ignores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobNodeMeta {
    pub title: String,
}

/// A single executable node of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobNode {
    pub inputs: BTreeMap<String, InputValue>,
    pub class_type: String,
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<JobNodeMeta>,
}

/// Flattened job: node id to executable node.
///
/// Keys are ordered, so two compilations of the same graph serialize to
/// byte-identical JSON.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use dagwood_client::compiler::{InputValue, JobDescription, JobNode, LinkRef};
///
/// let mut job = JobDescription::new();
/// job.insert("2", JobNode {
///     inputs: BTreeMap::from([("model".to_string(), InputValue::Link(LinkRef("1".into(), 0)))]),
///     class_type: "KSampler".into(),
///     meta: None,
/// });
///
/// // "1" is not part of the job, so its reference is dropped
/// assert_eq!(job.prune_dangling(), 1);
/// assert!(job.get("2").unwrap().inputs.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobDescription(BTreeMap<String, JobNode>);

impl JobDescription {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, node: JobNode) {
        self.0.insert(id.into(), node);
    }

    pub fn get(&self, id: &str) -> Option<&JobNode> {
        self.0.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &JobNode)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Drop every link input whose origin is not a node of this job.
    /// Returns how many inputs were removed.
    pub fn prune_dangling(&mut self) -> usize {
        let ids: Vec<String> = self.0.keys().cloned().collect();
        let mut pruned = 0;
        for node in self.0.values_mut() {
            let before = node.inputs.len();
            node.inputs.retain(|_, input| match input {
                InputValue::Link(link) => ids.binary_search_by(|id| id.as_str().cmp(link.origin_id())).is_ok(),
                InputValue::Literal(_) => true,
            });
            pruned += before - node.inputs.len();
        }
        pruned
    }
}

/// Output of one compilation.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledJob {
    /// What the engine executes
    pub output: JobDescription,
    /// Serialized graph snapshot, attached to the submission for provenance
    pub workflow: Value,
    /// Top-level graph nodes in the snapshot, targets of post-submission hooks
    pub workflow_node_ids: Vec<NodeId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn inputs_distinguish_links_from_literal_arrays() {
        let link: InputValue = serde_json::from_value(json!(["4", 1])).unwrap();
        assert_eq!(link, InputValue::Link(LinkRef("4".into(), 1)));

        let literal: InputValue = serde_json::from_value(json!([512, 512])).unwrap();
        assert_eq!(literal, InputValue::Literal(json!([512, 512])));
    }

    #[test]
    fn meta_is_only_serialized_when_present() {
        let node = JobNode {
            inputs: BTreeMap::new(),
            class_type: "SaveImage".into(),
            meta: None,
        };
        assert_eq!(serde_json::to_value(&node).unwrap(), json!({"inputs": {}, "class_type": "SaveImage"}));

        let titled = JobNode {
            meta: Some(JobNodeMeta { title: "Save".into() }),
            ..node
        };
        assert_eq!(serde_json::to_value(&titled).unwrap()["_meta"]["title"], json!("Save"));
    }

    #[test]
    fn pruning_keeps_resolvable_links_and_literals() {
        let mut job: JobDescription = serde_json::from_value(json!({
            "1": {"inputs": {"ckpt": "model.safetensors"}, "class_type": "Loader"},
            "3": {"inputs": {"model": ["1", 0], "vae": ["2", 2], "seed": 7}, "class_type": "Sampler"}
        }))
        .unwrap();

        assert_eq!(job.prune_dangling(), 1);
        let sampler = &job.get("3").unwrap().inputs;
        assert!(sampler.contains_key("model"));
        assert!(sampler.contains_key("seed"));
        assert!(!sampler.contains_key("vae"));
    }
}
