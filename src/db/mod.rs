use std::time::Duration;

use rand::Rng;
use sea_orm::{Database, DatabaseConnection};

use crate::config::Config;
use crate::error::{AppError, AppResult};

/// Connect to the database with bounded retry and exponential backoff.
///
/// Each failed attempt doubles the delay and adds up to 100ms of jitter so
/// simultaneously restarting instances don't hammer the store in lockstep.
pub async fn connect(config: &Config) -> AppResult<DatabaseConnection> {
    let mut delay = Duration::from_millis(config.db_connect_backoff_ms);
    let mut last_err = None;

    for attempt in 1..=config.db_connect_retries {
        match Database::connect(&config.database_url).await {
            Ok(conn) => return Ok(conn),
            Err(err) => {
                tracing::warn!(
                    attempt,
                    retries = config.db_connect_retries,
                    error = %err,
                    "database connection failed"
                );
                last_err = Some(err);
            }
        }

        if attempt < config.db_connect_retries {
            let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..100));
            tokio::time::sleep(delay + jitter).await;
            delay *= 2;
        }
    }

    Err(match last_err {
        Some(err) => AppError::RemoteStore(err),
        None => AppError::Internal("DB_CONNECT_RETRIES must be at least 1".to_string()),
    })
}
