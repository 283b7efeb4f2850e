use sqlx::postgres::PgConnectOptions;
use sqlx::{Connection, PgConnection};

use crate::config::DbConfig;
use crate::error::{AppError, Result};

/// Read-only datastore handle. Each query opens its own connection, which is
/// closed when it drops, on every exit path.
#[derive(Debug, Clone)]
pub struct Db {
    config: DbConfig,
}

impl Db {
    pub fn new(config: DbConfig) -> Self {
        Self { config }
    }

    pub async fn connect(&self) -> Result<PgConnection> {
        let host = self
            .config
            .host
            .as_deref()
            .ok_or_else(|| AppError::Config("CLOUD_HOST is not configured".to_string()))?;
        let user = self
            .config
            .user
            .as_deref()
            .ok_or_else(|| AppError::Config("CLOUD_READONLY_USER is not configured".to_string()))?;

        let mut options = PgConnectOptions::new()
            .host(host)
            .port(self.config.port)
            .database(&self.config.database)
            .username(user);

        if let Some(password) = self.config.password.as_deref() {
            options = options.password(password);
        }

        let conn = PgConnection::connect_with(&options).await?;
        Ok(conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_host_fails_at_connection_time() {
        let db = Db::new(DbConfig {
            host: None,
            port: 5432,
            database: "autodrop".to_string(),
            user: Some("reader".to_string()),
            password: None,
        });

        let err = db.connect().await.err().expect("connect should fail");
        match err {
            AppError::Config(msg) => assert!(msg.contains("CLOUD_HOST")),
            other => panic!("expected config error, got {other}"),
        }
    }
}
