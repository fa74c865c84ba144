use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKind {
    File,
    Folder,
}

impl NodeKind {
    pub fn as_db_value(self) -> &'static str {
        match self {
            NodeKind::File => "FILE",
            NodeKind::Folder => "FOLDER",
        }
    }

    pub fn from_db_value(value: &str) -> Option<Self> {
        match value {
            "FILE" => Some(NodeKind::File),
            "FOLDER" => Some(NodeKind::Folder),
            _ => None,
        }
    }
}

/// A persisted file or folder.
///
/// For folders `size` is the aggregate of every file below it and is only
/// ever changed by size propagation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    pub url: Option<String>,
    pub size: i64,
    pub parent_id: Option<String>,
    pub full_route: String,
    pub updated_at: DateTime<Utc>,
}

impl Node {
    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }

    pub fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot {
            id: self.id.clone(),
            url: self.url.clone(),
            parent_id: self.parent_id.clone(),
            kind: self.kind,
            size: self.size,
            date: self.updated_at,
        }
    }
}

/// Route of a node placed under a parent with the given route.
pub fn child_route(parent_route: Option<&str>, id: &str) -> String {
    match parent_route {
        Some(route) => format!("{route}/{id}"),
        None => format!("/{id}"),
    }
}

/// One element of an import batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ItemSpec {
    pub id: String,
    pub url: Option<String>,
    pub parent_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub size: Option<i64>,
}

impl ItemSpec {
    pub fn file(id: &str, parent_id: Option<&str>, url: &str, size: i64) -> Self {
        Self {
            id: id.into(),
            url: Some(url.into()),
            parent_id: parent_id.map(Into::into),
            kind: NodeKind::File,
            size: Some(size),
        }
    }

    pub fn folder(id: &str, parent_id: Option<&str>) -> Self {
        Self {
            id: id.into(),
            url: None,
            parent_id: parent_id.map(Into::into),
            kind: NodeKind::Folder,
            size: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ImportRequest {
    pub items: Vec<ItemSpec>,
    pub update_date: DateTime<Utc>,
}

/// Node state as exposed by history and update queries. Carries no route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSnapshot {
    pub id: String,
    pub url: Option<String>,
    pub parent_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub size: i64,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub items: Vec<NodeSnapshot>,
}

/// Immutable record of a node's state at `recorded_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub node_id: String,
    pub content: Value,
    pub recorded_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn from_node(node: &Node) -> Result<Self, AppError> {
        Ok(Self {
            node_id: node.id.clone(),
            content: serde_json::to_value(node.snapshot())?,
            recorded_at: node.updated_at,
        })
    }

    pub fn snapshot(&self) -> Result<NodeSnapshot, AppError> {
        Ok(serde_json::from_value(self.content.clone())?)
    }
}

/// A node with its descendants materialized. Files have `children: null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub id: String,
    pub url: Option<String>,
    pub parent_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub size: i64,
    pub date: DateTime<Utc>,
    pub children: Option<Vec<TreeNode>>,
}

impl TreeNode {
    pub fn leaf(node: Node) -> Self {
        let children = node.is_folder().then(Vec::new);
        Self {
            id: node.id,
            url: node.url,
            parent_id: node.parent_id,
            kind: node.kind,
            size: node.size,
            date: node.updated_at,
            children,
        }
    }
}
