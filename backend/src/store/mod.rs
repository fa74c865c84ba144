//! Persistence boundary for the node tree.
//!
//! Every core operation receives a `&mut` store handle. Callers that need
//! isolation between concurrent requests hand in a store bound to one
//! database transaction (see [`PgNodeStore`]).

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    models::nodes::{HistoryEntry, Node},
};

pub use memory::MemoryStore;
pub use postgres::PgNodeStore;

#[async_trait]
pub trait NodeStore: Send {
    async fn create_node(&mut self, node: &Node) -> Result<(), AppError>;

    async fn read_node(&mut self, id: &str) -> Result<Option<Node>, AppError>;

    async fn read_children(&mut self, parent_id: &str) -> Result<Vec<Node>, AppError>;

    /// Nodes whose `full_route` starts with `route_prefix`.
    async fn read_children_by_route(&mut self, route_prefix: &str)
    -> Result<Vec<Node>, AppError>;

    /// Overwrites every column of the row with `node.id`.
    async fn update_node(&mut self, node: &Node) -> Result<(), AppError>;

    async fn delete_node(&mut self, id: &str) -> Result<(), AppError>;

    /// Nodes with `updated_at` in `[start, end]`.
    async fn read_updated_between(
        &mut self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Node>, AppError>;

    async fn append_history(&mut self, entry: &HistoryEntry) -> Result<(), AppError>;

    /// Entries for `node_id` with `recorded_at` in `[start, end]`, oldest first.
    async fn read_history(
        &mut self,
        node_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<HistoryEntry>, AppError>;
}
