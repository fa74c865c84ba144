use std::{env, path::PathBuf};

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub log_dir: PathBuf,
    pub reset_db: bool,
    pub max_tree_depth: usize,
    pub db_max_connections: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8080".into())
            .parse()
            .map_err(|err| AppError::Config(format!("invalid SERVER_PORT: {err}")))?;

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| AppError::Config("missing DATABASE_URL".into()))?;

        let log_dir =
            PathBuf::from(env::var("DISKTREE_LOG_DIR").unwrap_or_else(|_| "./log".into()));

        let reset_db = env::var("RESET_DB")
            .unwrap_or_else(|_| "false".into())
            .parse::<bool>()
            .map_err(|err| AppError::Config(format!("invalid RESET_DB: {err}")))?;

        let max_tree_depth = env::var("DISKTREE_MAX_TREE_DEPTH")
            .unwrap_or_else(|_| "1024".into())
            .parse::<usize>()
            .map_err(|err| AppError::Config(format!("invalid DISKTREE_MAX_TREE_DEPTH: {err}")))?;

        let db_max_connections = env::var("DISKTREE_DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".into())
            .parse::<u32>()
            .map_err(|err| {
                AppError::Config(format!("invalid DISKTREE_DB_MAX_CONNECTIONS: {err}"))
            })?;

        Ok(Self {
            host,
            port,
            database_url,
            log_dir,
            reset_db,
            max_tree_depth,
            db_max_connections,
        })
    }
}
