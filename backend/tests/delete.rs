mod common;

use common::{assert_aggregates, at, size_of};
use disktree::{error::AppError, models::nodes::ItemSpec, store::MemoryStore, tree};

async fn nested() -> MemoryStore {
    let mut store = MemoryStore::new();
    let items = [
        ItemSpec::folder("root", None),
        ItemSpec::folder("a", Some("root")),
        ItemSpec::folder("deep", Some("a")),
        ItemSpec::file("f", Some("a"), "/f", 10),
        ItemSpec::file("g", Some("deep"), "/g", 4),
        ItemSpec::file("h", Some("root"), "/h", 1),
    ];
    tree::apply(&mut store, &items, at(0)).await.unwrap();
    store
}

#[tokio::test]
async fn deleting_file_withdraws_from_every_ancestor() {
    let mut store = nested().await;
    assert_eq!(size_of(&store, "root"), 15);

    tree::delete(&mut store, "g", at(1)).await.unwrap();

    assert!(store.get("g").is_none());
    assert_eq!(size_of(&store, "deep"), 0);
    assert_eq!(size_of(&store, "a"), 10);
    assert_eq!(size_of(&store, "root"), 11);
    assert_eq!(store.get("root").unwrap().updated_at, at(1));
    assert_aggregates(&store);
}

#[tokio::test]
async fn deleting_folder_removes_subtree() {
    let mut store = nested().await;
    let history_before = store.history().len();

    tree::delete(&mut store, "a", at(1)).await.unwrap();

    for id in ["a", "deep", "f", "g"] {
        assert!(store.get(id).is_none(), "{id} should be gone");
    }
    assert_eq!(size_of(&store, "root"), 1);
    assert!(store.get("h").is_some());
    assert_eq!(store.history().len(), history_before);
    assert_aggregates(&store);
}

#[tokio::test]
async fn deleting_root_node_needs_no_propagation() {
    let mut store = nested().await;
    tree::delete(&mut store, "root", at(1)).await.unwrap();
    assert_eq!(store.nodes().count(), 0);
}

#[tokio::test]
async fn deleting_unknown_node_is_not_found() {
    let mut store = nested().await;
    let err = tree::delete(&mut store, "ghost", at(1)).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(size_of(&store, "root"), 15);
}

#[tokio::test]
async fn deleted_id_can_be_imported_again() {
    let mut store = nested().await;
    tree::delete(&mut store, "a", at(1)).await.unwrap();

    let items = [
        ItemSpec::folder("a", Some("root")),
        ItemSpec::file("f", Some("a"), "/f", 2),
    ];
    tree::apply(&mut store, &items, at(2)).await.unwrap();

    assert_eq!(size_of(&store, "a"), 2);
    assert_eq!(size_of(&store, "root"), 3);
    assert_aggregates(&store);
}

#[tokio::test]
async fn history_outlives_deleted_node() {
    let mut store = nested().await;
    tree::apply(&mut store, &[ItemSpec::file("g", Some("deep"), "/g", 6)], at(1))
        .await
        .unwrap();
    tree::delete(&mut store, "a", at(2)).await.unwrap();

    let entries = tree::get_history(&mut store, "g", at(0), at(2)).await.unwrap();
    let sizes: Vec<i64> = entries
        .iter()
        .map(|entry| entry.snapshot().unwrap().size)
        .collect();
    assert_eq!(sizes, [4, 6]);

    let err = tree::get_history(&mut store, "g", at(3), at(4)).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
