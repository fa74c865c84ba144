use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::{
    error::{AppError, ValidationError},
    store::NodeStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Add,
    Subtract,
}

/// A size change to push up the ancestor chain starting at `node_id`.
#[derive(Debug, Clone, Copy)]
pub struct Propagation<'a> {
    pub node_id: &'a str,
    pub effective_date: DateTime<Utc>,
    pub delta: i64,
}

/// Applies `delta` to `change.node_id` and every ancestor above it.
///
/// Each visited node also gets `updated_at = effective_date`. The walk stops
/// at a node without parent, or at a parent that no longer exists.
pub async fn propagate<S>(
    store: &mut S,
    change: Propagation<'_>,
    direction: Direction,
) -> Result<(), AppError>
where
    S: NodeStore + ?Sized,
{
    let signed = match direction {
        Direction::Add => change.delta,
        Direction::Subtract => change
            .delta
            .checked_neg()
            .ok_or_else(|| ValidationError::SizeOverflow(change.node_id.to_string()))?,
    };

    let mut visited = HashSet::new();
    let mut next = Some(change.node_id.to_string());

    while let Some(id) = next.take() {
        if !visited.insert(id.clone()) {
            return Err(AppError::Integrity(format!(
                "parent chain of {} loops at {id}",
                change.node_id
            )));
        }
        let Some(mut node) = store.read_node(&id).await? else {
            break;
        };

        node.size = node
            .size
            .checked_add(signed)
            .ok_or_else(|| ValidationError::SizeOverflow(node.id.clone()))?;
        node.updated_at = change.effective_date;
        debug!(id = %node.id, size = node.size, delta = signed, "propagated size");
        store.update_node(&node).await?;

        next = node.parent_id;
    }

    Ok(())
}
