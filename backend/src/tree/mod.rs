//! Tree-consistency engine: imports, deletes, size propagation, history and
//! read-side queries over a [`NodeStore`](crate::store::NodeStore).

pub mod delete;
pub mod history;
pub mod import;
pub mod propagate;
pub mod query;

pub use delete::delete;
pub use history::record;
pub use import::apply;
pub use propagate::{Direction, Propagation, propagate};
pub use query::{get_history, get_tree, get_updates};
