#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use disktree::{models::nodes::NodeKind, store::MemoryStore};

pub fn base_date() -> DateTime<Utc> {
    "2022-05-28T21:12:01Z".parse().unwrap()
}

pub fn at(hours: i64) -> DateTime<Utc> {
    base_date() + Duration::hours(hours)
}

pub fn size_of(store: &MemoryStore, id: &str) -> i64 {
    store.get(id).unwrap_or_else(|| panic!("node {id} missing")).size
}

pub fn route_of(store: &MemoryStore, id: &str) -> String {
    store.get(id).unwrap_or_else(|| panic!("node {id} missing")).full_route.clone()
}

fn is_below(store: &MemoryStore, id: &str, ancestor: &str) -> bool {
    let mut cursor = store.get(id).and_then(|node| node.parent_id.clone());
    let mut hops = 0;
    while let Some(current) = cursor {
        if current == ancestor {
            return true;
        }
        hops += 1;
        assert!(hops <= store.nodes().count(), "parent chain of {id} loops");
        cursor = store.get(&current).and_then(|node| node.parent_id.clone());
    }
    false
}

/// Recomputes every folder's size from the files below it.
pub fn assert_aggregates(store: &MemoryStore) {
    for folder in store.nodes().filter(|node| node.kind == NodeKind::Folder) {
        let expected: i128 = store
            .nodes()
            .filter(|node| node.kind == NodeKind::File && is_below(store, &node.id, &folder.id))
            .map(|node| i128::from(node.size))
            .sum();
        assert_eq!(i128::from(folder.size), expected, "aggregate of folder {}", folder.id);
    }
}

/// Every non-root node's parent exists and its route extends the parent's.
pub fn assert_routes(store: &MemoryStore) {
    for node in store.nodes() {
        match node.parent_id.as_deref() {
            Some(parent_id) => {
                let parent = store
                    .get(parent_id)
                    .unwrap_or_else(|| panic!("parent {parent_id} of {} missing", node.id));
                assert_eq!(parent.kind, NodeKind::Folder);
                assert_eq!(node.full_route, format!("{}/{}", parent.full_route, node.id));
            }
            None => assert_eq!(node.full_route, format!("/{}", node.id)),
        }
    }
}
