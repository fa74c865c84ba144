pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod store;
pub mod tree;

use sqlx::PgPool;

pub struct AppState {
    pub pool: PgPool,
    pub max_tree_depth: usize,
}
