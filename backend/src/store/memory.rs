use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::NodeStore;
use crate::{
    error::AppError,
    models::nodes::{HistoryEntry, Node},
};

/// Arena of nodes keyed by id plus an append-only history log.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    nodes: BTreeMap<String, Node>,
    history: Vec<HistoryEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }
}

#[async_trait]
impl NodeStore for MemoryStore {
    async fn create_node(&mut self, node: &Node) -> Result<(), AppError> {
        if self.nodes.contains_key(&node.id) {
            return Err(AppError::Integrity(format!("node {} already exists", node.id)));
        }
        self.nodes.insert(node.id.clone(), node.clone());
        Ok(())
    }

    async fn read_node(&mut self, id: &str) -> Result<Option<Node>, AppError> {
        Ok(self.nodes.get(id).cloned())
    }

    async fn read_children(&mut self, parent_id: &str) -> Result<Vec<Node>, AppError> {
        Ok(self
            .nodes
            .values()
            .filter(|node| node.parent_id.as_deref() == Some(parent_id))
            .cloned()
            .collect())
    }

    async fn read_children_by_route(
        &mut self,
        route_prefix: &str,
    ) -> Result<Vec<Node>, AppError> {
        Ok(self
            .nodes
            .values()
            .filter(|node| node.full_route.starts_with(route_prefix))
            .cloned()
            .collect())
    }

    async fn update_node(&mut self, node: &Node) -> Result<(), AppError> {
        match self.nodes.get_mut(&node.id) {
            Some(existing) => {
                *existing = node.clone();
                Ok(())
            }
            None => Err(AppError::NotFound(format!("node {}", node.id))),
        }
    }

    async fn delete_node(&mut self, id: &str) -> Result<(), AppError> {
        self.nodes.remove(id);
        Ok(())
    }

    async fn read_updated_between(
        &mut self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Node>, AppError> {
        Ok(self
            .nodes
            .values()
            .filter(|node| node.updated_at >= start && node.updated_at <= end)
            .cloned()
            .collect())
    }

    async fn append_history(&mut self, entry: &HistoryEntry) -> Result<(), AppError> {
        self.history.push(entry.clone());
        Ok(())
    }

    async fn read_history(
        &mut self,
        node_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<HistoryEntry>, AppError> {
        let mut entries: Vec<HistoryEntry> = self
            .history
            .iter()
            .filter(|entry| {
                entry.node_id == node_id && entry.recorded_at >= start && entry.recorded_at <= end
            })
            .cloned()
            .collect();
        entries.sort_by_key(|entry| entry.recorded_at);
        Ok(entries)
    }
}
