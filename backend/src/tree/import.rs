use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::{
    history,
    propagate::{Direction, Propagation, propagate},
};
use crate::{
    error::{AppError, ValidationError},
    models::nodes::{ItemSpec, Node, NodeKind, child_route},
    store::NodeStore,
};

/// An item that passed validation, with the row it replaces if any.
struct Staged<'a> {
    item: &'a ItemSpec,
    existing: Option<Node>,
}

/// Applies an import batch at `effective_date`.
///
/// The whole batch is validated before the first write, so a rejected batch
/// leaves the store untouched. Items are then applied in order: new ids are
/// created, existing files are overwritten (and moved if their parent
/// changed), existing folders are moved. Every applied item appends exactly
/// one history entry.
pub async fn apply<S>(
    store: &mut S,
    items: &[ItemSpec],
    effective_date: DateTime<Utc>,
) -> Result<(), AppError>
where
    S: NodeStore + ?Sized,
{
    let staged = match validate(store, items).await {
        Ok(staged) => staged,
        Err(err) => {
            warn!(error = %err, "rejected import batch");
            return Err(err);
        }
    };

    info!(items = staged.len(), date = %effective_date, "applying import batch");
    for entry in staged {
        apply_item(store, entry, effective_date).await?;
    }
    Ok(())
}

async fn validate<'a, S>(store: &mut S, items: &'a [ItemSpec]) -> Result<Vec<Staged<'a>>, AppError>
where
    S: NodeStore + ?Sized,
{
    let mut seen = HashSet::new();
    for item in items {
        if !seen.insert(item.id.as_str()) {
            return Err(ValidationError::DuplicateId(item.id.clone()).into());
        }
    }

    let mut batch_kinds: HashMap<&str, NodeKind> = HashMap::new();
    let mut staged = Vec::with_capacity(items.len());

    for item in items {
        check_shape(item)?;

        if let Some(parent_id) = item.parent_id.as_deref() {
            let parent_kind = match batch_kinds.get(parent_id) {
                Some(kind) => Some(*kind),
                None => store.read_node(parent_id).await?.map(|parent| parent.kind),
            };
            if parent_kind != Some(NodeKind::Folder) {
                return Err(ValidationError::ParentNotFolder(item.id.clone()).into());
            }
        }

        let existing = store.read_node(&item.id).await?;
        if let Some(node) = &existing {
            if node.kind != item.kind {
                return Err(ValidationError::KindChange(item.id.clone()).into());
            }
            if node.is_folder() && node.parent_id == item.parent_id {
                return Err(ValidationError::NothingToUpdate(item.id.clone()).into());
            }
        }

        batch_kinds.insert(item.id.as_str(), item.kind);
        staged.push(Staged { item, existing });
    }

    check_structure(store, &staged).await?;
    Ok(staged)
}

fn check_shape(item: &ItemSpec) -> Result<(), ValidationError> {
    if item.parent_id.as_deref() == Some(item.id.as_str()) {
        return Err(ValidationError::SelfParent(item.id.clone()));
    }
    match item.kind {
        NodeKind::Folder if item.url.is_some() || item.size.is_some() => {
            Err(ValidationError::FolderWithUrlOrSize(item.id.clone()))
        }
        NodeKind::File if item.url.is_none() || !item.size.is_some_and(|size| size > 0) => {
            Err(ValidationError::FileWithoutUrlOrSize(item.id.clone()))
        }
        _ => Ok(()),
    }
}

/// Replays the batch's parent links in order and rejects it if an item would
/// become its own ancestor at any step, or if some folder total could leave
/// the `i64` range.
///
/// Projected totals only ever grow: withdrawals from former ancestors are
/// ignored, so they bound every size written while the batch is applied.
async fn check_structure<S>(store: &mut S, staged: &[Staged<'_>]) -> Result<(), AppError>
where
    S: NodeStore + ?Sized,
{
    let mut batch_parents: HashMap<&str, Option<&str>> = HashMap::new();
    let mut persisted: HashMap<String, Option<Node>> = HashMap::new();
    let mut totals: HashMap<String, i64> = HashMap::new();

    for entry in staged {
        let item = entry.item;
        batch_parents.insert(item.id.as_str(), item.parent_id.as_deref());

        let delta = match item.kind {
            NodeKind::File => item.size.unwrap_or(0),
            NodeKind::Folder => match totals.get(&item.id) {
                Some(total) => *total,
                None => entry.existing.as_ref().map_or(0, |node| node.size),
            },
        };

        let mut visited = HashSet::new();
        let mut cursor = item.parent_id.clone();

        while let Some(current) = cursor.take() {
            if current == item.id {
                return Err(ValidationError::ParentCycle(item.id.clone()).into());
            }
            if !visited.insert(current.clone()) {
                break;
            }
            if !persisted.contains_key(&current) {
                let node = store.read_node(&current).await?;
                persisted.insert(current.clone(), node);
            }
            let stored = persisted.get(&current).and_then(Option::as_ref);

            let total = totals
                .entry(current.clone())
                .or_insert_with(|| stored.map_or(0, |node| node.size));
            *total = total
                .checked_add(delta)
                .ok_or_else(|| ValidationError::SizeOverflow(item.id.clone()))?;

            cursor = match batch_parents.get(current.as_str()) {
                Some(parent) => parent.map(str::to_string),
                None => stored.and_then(|node| node.parent_id.clone()),
            };
        }
    }
    Ok(())
}

async fn apply_item<S>(
    store: &mut S,
    entry: Staged<'_>,
    effective_date: DateTime<Utc>,
) -> Result<(), AppError>
where
    S: NodeStore + ?Sized,
{
    let item = entry.item;
    let full_route = resolve_route(store, item).await?;

    let node = match (entry.existing, item.kind) {
        (None, _) => create(store, item, full_route, effective_date).await?,
        (Some(_), NodeKind::File) => update_file(store, item, full_route, effective_date).await?,
        (Some(_), NodeKind::Folder) => {
            move_folder(store, item, full_route, effective_date).await?
        }
    };

    history::record(store, &node).await
}

async fn resolve_route<S>(store: &mut S, item: &ItemSpec) -> Result<String, AppError>
where
    S: NodeStore + ?Sized,
{
    let Some(parent_id) = item.parent_id.as_deref() else {
        return Ok(child_route(None, &item.id));
    };
    let parent = store.read_node(parent_id).await?.ok_or_else(|| {
        AppError::Integrity(format!("parent {parent_id} of {} vanished", item.id))
    })?;
    Ok(child_route(Some(&parent.full_route), &item.id))
}

async fn current<S>(store: &mut S, id: &str) -> Result<Node, AppError>
where
    S: NodeStore + ?Sized,
{
    store
        .read_node(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("node {id}")))
}

async fn shift<S>(
    store: &mut S,
    from: Option<&str>,
    effective_date: DateTime<Utc>,
    delta: i64,
    direction: Direction,
) -> Result<(), AppError>
where
    S: NodeStore + ?Sized,
{
    match from {
        Some(node_id) => {
            let change = Propagation { node_id, effective_date, delta };
            propagate(store, change, direction).await
        }
        None => Ok(()),
    }
}

async fn create<S>(
    store: &mut S,
    item: &ItemSpec,
    full_route: String,
    effective_date: DateTime<Utc>,
) -> Result<Node, AppError>
where
    S: NodeStore + ?Sized,
{
    let node = Node {
        id: item.id.clone(),
        kind: item.kind,
        url: item.url.clone(),
        size: item.size.unwrap_or(0),
        parent_id: item.parent_id.clone(),
        full_route,
        updated_at: effective_date,
    };
    debug!(id = %node.id, kind = ?node.kind, "creating node");
    store.create_node(&node).await?;

    let parent = node.parent_id.as_deref();
    shift(store, parent, effective_date, node.size, Direction::Add).await?;
    Ok(node)
}

async fn update_file<S>(
    store: &mut S,
    item: &ItemSpec,
    full_route: String,
    effective_date: DateTime<Utc>,
) -> Result<Node, AppError>
where
    S: NodeStore + ?Sized,
{
    let previous = current(store, &item.id).await?;
    let node = Node {
        id: item.id.clone(),
        kind: NodeKind::File,
        url: item.url.clone(),
        size: item.size.unwrap_or(0),
        parent_id: item.parent_id.clone(),
        full_route,
        updated_at: effective_date,
    };
    debug!(id = %node.id, old_size = previous.size, size = node.size, "updating file");
    store.update_node(&node).await?;

    let old_parent = previous.parent_id.as_deref();
    let new_parent = node.parent_id.as_deref();
    if old_parent == new_parent {
        let delta = node.size - previous.size;
        shift(store, new_parent, effective_date, delta, Direction::Add).await?;
    } else {
        shift(store, old_parent, effective_date, previous.size, Direction::Subtract).await?;
        shift(store, new_parent, effective_date, node.size, Direction::Add).await?;
    }
    Ok(node)
}

async fn move_folder<S>(
    store: &mut S,
    item: &ItemSpec,
    full_route: String,
    effective_date: DateTime<Utc>,
) -> Result<Node, AppError>
where
    S: NodeStore + ?Sized,
{
    // The aggregate may have changed earlier in this batch.
    let previous = current(store, &item.id).await?;
    debug!(
        id = %item.id,
        from = ?previous.parent_id,
        to = ?item.parent_id,
        size = previous.size,
        "moving folder"
    );

    let old_parent = previous.parent_id.as_deref();
    shift(store, old_parent, effective_date, previous.size, Direction::Subtract).await?;

    let node = Node {
        parent_id: item.parent_id.clone(),
        full_route,
        updated_at: effective_date,
        ..previous.clone()
    };
    store.update_node(&node).await?;

    let new_parent = node.parent_id.as_deref();
    shift(store, new_parent, effective_date, node.size, Direction::Add).await?;

    rebase_routes(store, &node).await?;
    Ok(node)
}

/// Rewrites the route of every descendant of `folder` by following parent
/// links, so ids containing `/` never match an unrelated route.
async fn rebase_routes<S>(store: &mut S, folder: &Node) -> Result<(), AppError>
where
    S: NodeStore + ?Sized,
{
    let mut visited = HashSet::from([folder.id.clone()]);
    let mut pending = vec![(folder.id.clone(), folder.full_route.clone())];

    while let Some((parent_id, parent_route)) = pending.pop() {
        for mut child in store.read_children(&parent_id).await? {
            if !visited.insert(child.id.clone()) {
                continue;
            }
            child.full_route = child_route(Some(&parent_route), &child.id);
            store.update_node(&child).await?;
            if child.is_folder() {
                pending.push((child.id.clone(), child.full_route.clone()));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_rules() {
        let mut folder = ItemSpec::folder("a", None);
        assert!(check_shape(&folder).is_ok());
        folder.size = Some(1);
        assert_eq!(
            check_shape(&folder),
            Err(ValidationError::FolderWithUrlOrSize("a".into()))
        );

        let mut file = ItemSpec::file("f", Some("a"), "/f", 1);
        assert!(check_shape(&file).is_ok());
        file.size = Some(0);
        assert_eq!(
            check_shape(&file),
            Err(ValidationError::FileWithoutUrlOrSize("f".into()))
        );
        file.size = None;
        assert!(check_shape(&file).is_err());

        let own_parent = ItemSpec::folder("a", Some("a"));
        assert_eq!(check_shape(&own_parent), Err(ValidationError::SelfParent("a".into())));
    }
}
