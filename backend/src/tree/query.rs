use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{DateTime, Duration, Utc};

use crate::{
    error::{AppError, ValidationError},
    models::nodes::{HistoryEntry, Node, TreeNode},
    store::NodeStore,
};

/// Length of the window served by [`get_updates`].
pub const UPDATES_WINDOW_HOURS: i64 = 24;

/// Node `id` with all of its descendants, at most `max_depth` levels below it.
pub async fn get_tree<S>(store: &mut S, id: &str, max_depth: usize) -> Result<TreeNode, AppError>
where
    S: NodeStore + ?Sized,
{
    let root = store
        .read_node(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("node {id}")))?;

    let mut visited = HashSet::from([root.id.clone()]);
    let mut child_ids: HashMap<String, Vec<String>> = HashMap::new();
    let mut order: Vec<Node> = Vec::new();
    let mut queue = VecDeque::from([(root, 0usize)]);

    while let Some((node, depth)) = queue.pop_front() {
        if node.is_folder() {
            let children = store.read_children(&node.id).await?;
            if !children.is_empty() && depth >= max_depth {
                return Err(ValidationError::TreeTooDeep(id.to_string(), max_depth).into());
            }
            let ids = child_ids.entry(node.id.clone()).or_default();
            for child in children {
                if !visited.insert(child.id.clone()) {
                    return Err(AppError::Integrity(format!(
                        "node {} reached twice below {id}",
                        child.id
                    )));
                }
                ids.push(child.id.clone());
                queue.push_back((child, depth + 1));
            }
        }
        order.push(node);
    }

    // Breadth-first order reversed puts every child before its parent.
    let mut built: HashMap<String, TreeNode> = HashMap::new();
    for node in order.into_iter().rev() {
        let ids = child_ids.remove(&node.id).unwrap_or_default();
        let mut tree = TreeNode::leaf(node);
        if let Some(children) = tree.children.as_mut() {
            children.extend(ids.iter().filter_map(|child| built.remove(child)));
        }
        built.insert(tree.id.clone(), tree);
    }

    built
        .remove(id)
        .ok_or_else(|| AppError::Integrity(format!("tree for {id} was not assembled")))
}

/// Nodes updated within the 24 hours ending at `date`, both ends inclusive.
pub async fn get_updates<S>(store: &mut S, date: DateTime<Utc>) -> Result<Vec<Node>, AppError>
where
    S: NodeStore + ?Sized,
{
    let start = date - Duration::hours(UPDATES_WINDOW_HOURS);
    store.read_updated_between(start, date).await
}

/// History of node `id` recorded within `[start, end]`, oldest first.
///
/// Entries of a deleted node stay readable; an id that is neither stored nor
/// has entries in the range is not found.
pub async fn get_history<S>(
    store: &mut S,
    id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<HistoryEntry>, AppError>
where
    S: NodeStore + ?Sized,
{
    if start > end {
        return Err(ValidationError::InvalidRange.into());
    }
    let entries = store.read_history(id, start, end).await?;
    if entries.is_empty() && store.read_node(id).await?.is_none() {
        return Err(AppError::NotFound(format!("node {id}")));
    }
    Ok(entries)
}
