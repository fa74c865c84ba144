use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};
use tracing::debug;

use super::NodeStore;
use crate::{
    error::AppError,
    models::nodes::{HistoryEntry, Node, NodeKind},
};

/// PostgreSQL store borrowing one connection, normally an open transaction.
pub struct PgNodeStore<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> PgNodeStore<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }
}

#[derive(FromRow)]
struct NodeRow {
    id: String,
    url: Option<String>,
    #[sqlx(rename = "type")]
    kind: String,
    size: i64,
    date: DateTime<Utc>,
    full_route: String,
    parent_id: Option<String>,
}

#[derive(FromRow)]
struct HistoryRow {
    node_id: String,
    content: serde_json::Value,
    recorded_at: DateTime<Utc>,
}

impl TryFrom<NodeRow> for Node {
    type Error = AppError;

    fn try_from(row: NodeRow) -> Result<Self, Self::Error> {
        let kind = NodeKind::from_db_value(&row.kind).ok_or_else(|| {
            AppError::Integrity(format!("node {} has unknown type {}", row.id, row.kind))
        })?;
        Ok(Node {
            id: row.id,
            kind,
            url: row.url,
            size: row.size,
            parent_id: row.parent_id,
            full_route: row.full_route,
            updated_at: row.date,
        })
    }
}

fn to_nodes(rows: Vec<NodeRow>) -> Result<Vec<Node>, AppError> {
    rows.into_iter().map(Node::try_from).collect()
}

fn like_prefix(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for ch in prefix.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

const NODE_COLUMNS: &str = "id, url, type, size, date, full_route, parent_id";

#[async_trait]
impl NodeStore for PgNodeStore<'_> {
    async fn create_node(&mut self, node: &Node) -> Result<(), AppError> {
        debug!(id = %node.id, "inserting node");
        sqlx::query(
            r#"
            INSERT INTO disk_tree (id, url, type, size, date, full_route, parent_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&node.id)
        .bind(&node.url)
        .bind(node.kind.as_db_value())
        .bind(node.size)
        .bind(node.updated_at)
        .bind(&node.full_route)
        .bind(&node.parent_id)
        .execute(&mut *self.conn)
        .await
        .map_err(AppError::Database)?;
        Ok(())
    }

    async fn read_node(&mut self, id: &str) -> Result<Option<Node>, AppError> {
        sqlx::query_as::<_, NodeRow>(&format!(
            "SELECT {NODE_COLUMNS} FROM disk_tree WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await
        .map_err(AppError::Database)?
        .map(Node::try_from)
        .transpose()
    }

    async fn read_children(&mut self, parent_id: &str) -> Result<Vec<Node>, AppError> {
        let rows = sqlx::query_as::<_, NodeRow>(&format!(
            "SELECT {NODE_COLUMNS} FROM disk_tree WHERE parent_id = $1 ORDER BY id"
        ))
        .bind(parent_id)
        .fetch_all(&mut *self.conn)
        .await
        .map_err(AppError::Database)?;
        to_nodes(rows)
    }

    async fn read_children_by_route(
        &mut self,
        route_prefix: &str,
    ) -> Result<Vec<Node>, AppError> {
        let rows = sqlx::query_as::<_, NodeRow>(&format!(
            r"SELECT {NODE_COLUMNS} FROM disk_tree WHERE full_route LIKE $1 ESCAPE '\' ORDER BY full_route"
        ))
        .bind(like_prefix(route_prefix))
        .fetch_all(&mut *self.conn)
        .await
        .map_err(AppError::Database)?;
        to_nodes(rows)
    }

    async fn update_node(&mut self, node: &Node) -> Result<(), AppError> {
        debug!(id = %node.id, size = node.size, "updating node");
        let result = sqlx::query(
            r#"
            UPDATE disk_tree
            SET url = $2, size = $3, date = $4, full_route = $5, parent_id = $6
            WHERE id = $1
            "#,
        )
        .bind(&node.id)
        .bind(&node.url)
        .bind(node.size)
        .bind(node.updated_at)
        .bind(&node.full_route)
        .bind(&node.parent_id)
        .execute(&mut *self.conn)
        .await
        .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("node {}", node.id)));
        }
        Ok(())
    }

    async fn delete_node(&mut self, id: &str) -> Result<(), AppError> {
        debug!(id, "deleting node");
        sqlx::query("DELETE FROM disk_tree WHERE id = $1")
            .bind(id)
            .execute(&mut *self.conn)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    async fn read_updated_between(
        &mut self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Node>, AppError> {
        let rows = sqlx::query_as::<_, NodeRow>(&format!(
            "SELECT {NODE_COLUMNS} FROM disk_tree WHERE date >= $1 AND date <= $2 ORDER BY date, id"
        ))
        .bind(start)
        .bind(end)
        .fetch_all(&mut *self.conn)
        .await
        .map_err(AppError::Database)?;
        to_nodes(rows)
    }

    async fn append_history(&mut self, entry: &HistoryEntry) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO disk_tree_history (node_id, content, recorded_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(&entry.node_id)
        .bind(&entry.content)
        .bind(entry.recorded_at)
        .execute(&mut *self.conn)
        .await
        .map_err(AppError::Database)?;
        Ok(())
    }

    async fn read_history(
        &mut self,
        node_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<HistoryEntry>, AppError> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT node_id, content, recorded_at
            FROM disk_tree_history
            WHERE node_id = $1 AND recorded_at >= $2 AND recorded_at <= $3
            ORDER BY recorded_at, id
            "#,
        )
        .bind(node_id)
        .bind(start)
        .bind(end)
        .fetch_all(&mut *self.conn)
        .await
        .map_err(AppError::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| HistoryEntry {
                node_id: row.node_id,
                content: row.content,
                recorded_at: row.recorded_at,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::like_prefix;

    #[test]
    fn route_prefix_escapes_wildcards() {
        assert_eq!(like_prefix("/a/b/"), "/a/b/%");
        assert_eq!(like_prefix("/a_1/%x/"), r"/a\_1/\%x/%");
    }
}
