use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::error::AppError;

pub fn init_pool(database_url: &str, max_connections: u32) -> Result<PgPool, AppError> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect_lazy(database_url)
        .map_err(AppError::Database)
}

pub async fn prepare_schema(pool: &PgPool, reset: bool) -> Result<(), AppError> {
    if reset {
        reset_schema(pool).await?;
    }
    create_schema(pool).await
}

async fn reset_schema(pool: &PgPool) -> Result<(), AppError> {
    let drop_statements = [
        "DROP TABLE IF EXISTS disk_tree_history",
        "DROP TABLE IF EXISTS disk_tree",
    ];

    for statement in drop_statements {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;
    }

    Ok(())
}

async fn create_schema(pool: &PgPool) -> Result<(), AppError> {
    let statements = [
        r#"
        CREATE TABLE IF NOT EXISTS disk_tree (
            id TEXT PRIMARY KEY,
            url TEXT,
            type TEXT NOT NULL CHECK (type IN ('FILE', 'FOLDER')),
            size BIGINT NOT NULL DEFAULT 0,
            date TIMESTAMPTZ NOT NULL,
            full_route TEXT NOT NULL,
            parent_id TEXT
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS disk_tree_history (
            id BIGSERIAL PRIMARY KEY,
            node_id TEXT NOT NULL,
            content JSONB NOT NULL,
            recorded_at TIMESTAMPTZ NOT NULL
        )
        "#,
        "CREATE INDEX IF NOT EXISTS idx_disk_tree_parent ON disk_tree (parent_id)",
        "CREATE INDEX IF NOT EXISTS idx_disk_tree_date ON disk_tree (date)",
        "CREATE INDEX IF NOT EXISTS idx_disk_tree_route ON disk_tree (full_route text_pattern_ops)",
        "CREATE INDEX IF NOT EXISTS idx_history_node_time ON disk_tree_history (node_id, recorded_at)",
    ];

    for statement in statements {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;
    }

    Ok(())
}
