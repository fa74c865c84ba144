use std::{fs, path::Path};

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware::Logger, web};
use disktree::{
    AppState,
    config::AppConfig,
    db::{init_pool, prepare_schema},
    error::AppError,
    routes::register,
};
use tracing::info;
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Logs to stdout and to `backend.log` under `log_dir`. Keep the returned
/// guard alive or buffered file output is lost.
fn init_tracing(log_dir: &Path) -> Result<WorkerGuard, AppError> {
    fs::create_dir_all(log_dir)?;
    let (file_writer, guard) = tracing_appender::non_blocking(rolling::never(log_dir, "backend.log"));

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new("info")
            .map_err(|err| AppError::Config(format!("log filter: {err}")))?,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .try_init()
        .map_err(|err| AppError::Config(format!("tracing subscriber: {err}")))?;

    Ok(guard)
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    let pool = init_pool(&config.database_url, config.db_max_connections)?;
    prepare_schema(&pool, config.reset_db).await?;

    let bind_addr = (config.host.clone(), config.port);
    let state = web::Data::new(AppState {
        pool,
        max_tree_depth: config.max_tree_depth,
    });

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(Cors::permissive())
            .app_data(state.clone())
            .configure(register)
    })
    .bind(bind_addr)?;

    info!(
        host = %config.host,
        port = config.port,
        max_tree_depth = config.max_tree_depth,
        "disktree backend listening"
    );
    server.run().await?;
    Ok(())
}

#[actix_web::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    let _guard = init_tracing(&config.log_dir)?;
    run(config).await
}
