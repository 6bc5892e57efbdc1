//! JSON tree (de)serialization (spec.md §6 "External interfaces").
//!
//! `value` is carried as lowercase hex rather than UTF-8, since a `Node`'s
//! bytes are not generally valid text (decoded payloads, binaries, etc).

use serde::{Deserialize, Serialize};

use crate::node::Node;

#[derive(Debug, Serialize, Deserialize)]
struct JsonNode {
    #[serde(rename = "type")]
    node_type: String,
    value: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    obfuscation: String,
    start: usize,
    end: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<JsonNode>,
}

impl From<&Node> for JsonNode {
    fn from(node: &Node) -> Self {
        JsonNode {
            node_type: node.node_type.clone(),
            value: hex::encode(&node.value),
            obfuscation: node.obfuscation.clone(),
            start: node.start,
            end: node.end,
            children: node.children.iter().map(JsonNode::from).collect(),
        }
    }
}

impl TryFrom<JsonNode> for Node {
    type Error = hex::FromHexError;

    fn try_from(json: JsonNode) -> Result<Self, Self::Error> {
        let children = json
            .children
            .into_iter()
            .map(Node::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Node {
            node_type: json.node_type,
            value: hex::decode(json.value)?,
            obfuscation: json.obfuscation,
            start: json.start,
            end: json.end,
            children,
        })
    }
}

/// Render a tree as pretty-printed JSON, matching spec.md §6's field names
/// (`type`, `value` as hex, `obfuscation`, `start`, `end`, `children`).
pub fn to_json(tree: &Node) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&JsonNode::from(tree))
}

/// Parse a previously-serialized tree back into a `Node`.
///
/// The original format notes that a deserializer must re-link parent
/// pointers; this port has no parent field to re-link (see `crate::node`),
/// so deserialization is a direct structural decode.
pub fn from_json(text: &str) -> Result<Node, JsonError> {
    let json: JsonNode = serde_json::from_str(text)?;
    Node::try_from(json).map_err(JsonError::Hex)
}

#[derive(Debug, thiserror::Error)]
pub enum JsonError {
    #[error("JSON error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("invalid hex in `value` field: {0}")]
    Hex(#[from] hex::FromHexError),
}
