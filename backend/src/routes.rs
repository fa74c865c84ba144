use actix_web::{HttpResponse, delete, get, post, web};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::warn;

use crate::{
    AppState,
    error::{AppError, ValidationError},
    models::nodes::{HistoryEntry, HistoryResponse, ImportRequest, NodeSnapshot},
    store::PgNodeStore,
    tree,
};

pub fn register(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        warn!(error = %err, "rejected request body");
        AppError::from(ValidationError::Malformed(err.to_string())).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| {
        warn!(error = %err, "rejected query string");
        AppError::from(ValidationError::Malformed(err.to_string())).into()
    }))
    .service(health)
    .service(post_imports)
    .service(delete_node)
    .service(get_node)
    .service(get_updates)
    .service(get_node_history);
}

#[get("/healthz")]
async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "service": "disktree-backend",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Writes run serializable: size propagation is read-modify-write on shared ancestors.
async fn begin_serializable(pool: &PgPool) -> Result<Transaction<'static, Postgres>, AppError> {
    let mut tx = pool.begin().await.map_err(AppError::Database)?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
        .execute(&mut *tx)
        .await
        .map_err(AppError::Database)?;
    Ok(tx)
}

#[post("/imports")]
async fn post_imports(
    body: web::Json<ImportRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let request = body.into_inner();
    let mut tx = begin_serializable(&state.pool).await?;
    tree::apply(&mut PgNodeStore::new(&mut tx), &request.items, request.update_date).await?;
    tx.commit().await.map_err(AppError::Database)?;
    Ok(HttpResponse::Ok().finish())
}

#[derive(Deserialize)]
struct DateQuery {
    date: DateTime<Utc>,
}

#[delete("/delete/{id}")]
async fn delete_node(
    path: web::Path<String>,
    query: web::Query<DateQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let mut tx = begin_serializable(&state.pool).await?;
    tree::delete(&mut PgNodeStore::new(&mut tx), &id, query.date).await?;
    tx.commit().await.map_err(AppError::Database)?;
    Ok(HttpResponse::Ok().finish())
}

#[get("/nodes/{id}")]
async fn get_node(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let mut tx = state.pool.begin().await.map_err(AppError::Database)?;
    let node = tree::get_tree(&mut PgNodeStore::new(&mut tx), &id, state.max_tree_depth).await?;
    tx.commit().await.map_err(AppError::Database)?;
    Ok(HttpResponse::Ok().json(node))
}

#[get("/updates")]
async fn get_updates(
    query: web::Query<DateQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let mut conn = state.pool.acquire().await.map_err(AppError::Database)?;
    let nodes = tree::get_updates(&mut PgNodeStore::new(&mut conn), query.date).await?;
    let items = nodes.iter().map(|node| node.snapshot()).collect();
    Ok(HttpResponse::Ok().json(HistoryResponse { items }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryQuery {
    date_start: DateTime<Utc>,
    date_end: DateTime<Utc>,
}

#[get("/node/{id}/history")]
async fn get_node_history(
    path: web::Path<String>,
    query: web::Query<HistoryQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let HistoryQuery { date_start, date_end } = query.into_inner();
    let mut tx = state.pool.begin().await.map_err(AppError::Database)?;
    let entries =
        tree::get_history(&mut PgNodeStore::new(&mut tx), &id, date_start, date_end).await?;
    tx.commit().await.map_err(AppError::Database)?;

    let items = entries
        .iter()
        .map(HistoryEntry::snapshot)
        .collect::<Result<Vec<NodeSnapshot>, _>>()?;
    Ok(HttpResponse::Ok().json(HistoryResponse { items }))
}
