use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::info;

use super::propagate::{Direction, Propagation, propagate};
use crate::{error::AppError, store::NodeStore};

/// Deletes node `id` and, for a folder, everything below it.
///
/// The node's size is withdrawn once from its ancestors; a folder's size
/// already covers its descendants. History entries are kept.
pub async fn delete<S>(
    store: &mut S,
    id: &str,
    effective_date: DateTime<Utc>,
) -> Result<(), AppError>
where
    S: NodeStore + ?Sized,
{
    let node = store
        .read_node(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("node {id}")))?;

    if let Some(parent_id) = node.parent_id.as_deref() {
        let change = Propagation { node_id: parent_id, effective_date, delta: node.size };
        propagate(store, change, Direction::Subtract).await?;
    }

    let mut removed = 0usize;
    if node.is_folder() {
        let mut visited = HashSet::from([node.id.clone()]);
        let mut pending = vec![node.id.clone()];
        while let Some(parent_id) = pending.pop() {
            for child in store.read_children(&parent_id).await? {
                if !visited.insert(child.id.clone()) {
                    continue;
                }
                if child.is_folder() {
                    pending.push(child.id.clone());
                }
                store.delete_node(&child.id).await?;
                removed += 1;
            }
        }
    }

    store.delete_node(&node.id).await?;
    info!(id, descendants = removed, date = %effective_date, "deleted node");
    Ok(())
}
