use crate::{
    error::AppError,
    models::nodes::{HistoryEntry, Node},
    store::NodeStore,
};

/// Appends a snapshot of `node` to the history log, stamped with its `updated_at`.
pub async fn record<S>(store: &mut S, node: &Node) -> Result<(), AppError>
where
    S: NodeStore + ?Sized,
{
    let entry = HistoryEntry::from_node(node)?;
    store.append_history(&entry).await
}
