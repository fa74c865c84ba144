mod common;

use chrono::Duration;
use common::{assert_aggregates, assert_routes, base_date};
use disktree::{error::AppError, models::nodes::ItemSpec, store::MemoryStore, tree};
use proptest::prelude::*;

// Ids carry route and LIKE metacharacters on purpose.
static FOLDERS: [&str; 5] = ["d", "d/0", "d%1", "d_2", "d3"];
static FILES: [&str; 5] = ["d/0/f", "f%1", "f_2", "f3", "f4"];

#[derive(Debug, Clone)]
enum Op {
    Import(Vec<ItemSpec>),
    Delete(String),
}

fn parent() -> impl Strategy<Value = Option<&'static str>> {
    prop::option::weighted(0.8, prop::sample::select(&FOLDERS[..]))
}

/// Mostly small sizes, with some close enough to `i64::MAX` to overflow a
/// folder total once two of them meet.
fn size() -> impl Strategy<Value = i64> {
    prop_oneof![
        4 => 1i64..100,
        1 => (i64::MAX / 4)..=i64::MAX,
    ]
}

fn item() -> impl Strategy<Value = ItemSpec> {
    prop_oneof![
        (prop::sample::select(&FOLDERS[..]), parent())
            .prop_map(|(id, parent)| ItemSpec::folder(id, parent)),
        (prop::sample::select(&FILES[..]), parent(), size())
            .prop_map(|(id, parent, size)| ItemSpec::file(id, parent, "/file", size)),
    ]
}

fn op() -> impl Strategy<Value = Op> {
    let any_id: Vec<&'static str> = FOLDERS.iter().chain(FILES.iter()).copied().collect();
    prop_oneof![
        4 => prop::collection::vec(item(), 1..4).prop_map(Op::Import),
        1 => prop::sample::select(any_id).prop_map(|id| Op::Delete(id.to_string())),
    ]
}

proptest! {
    #[test]
    fn aggregates_hold_after_random_operations(ops in prop::collection::vec(op(), 1..40)) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        runtime.block_on(async {
            let mut store = MemoryStore::new();
            for (step, op) in ops.into_iter().enumerate() {
                let date = base_date() + Duration::minutes(step as i64);
                let before = store.clone();
                let result = match &op {
                    Op::Import(items) => tree::apply(&mut store, items, date).await,
                    Op::Delete(id) => tree::delete(&mut store, id, date).await,
                };

                match result {
                    Ok(()) => {}
                    Err(AppError::Validation(_)) | Err(AppError::NotFound(_)) => {
                        assert_eq!(
                            store.nodes().collect::<Vec<_>>(),
                            before.nodes().collect::<Vec<_>>(),
                            "rejected {op:?} changed the store"
                        );
                        assert_eq!(store.history(), before.history());
                    }
                    Err(other) => panic!("unexpected error for {op:?}: {other}"),
                }

                assert_aggregates(&store);
                assert_routes(&store);
            }
        });
    }
}
