use crate::config::{get_config, Config};
use crate::error::Result;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

fn pool_options(config: &Config) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.database_max_connections.max(1))
        .acquire_timeout(Duration::from_secs(30))
}

pub async fn create_pool() -> Result<PgPool> {
    let config = get_config();
    let pool = pool_options(config).connect(&config.database_url).await?;
    tracing::info!(
        max_connections = config.database_max_connections,
        "Database pool ready"
    );
    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrations applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogFormat;

    fn config(max_connections: u32) -> Config {
        Config {
            server_address: "127.0.0.1:0".into(),
            database_url: "postgres://localhost/toeic".into(),
            database_max_connections: max_connections,
            gemini_api_key: "key".into(),
            gemini_endpoint: "http://localhost".into(),
            explanation_timeout_secs: 30,
            max_concurrent_explanations: 4,
            score_fallback: 5,
            log_format: LogFormat::Pretty,
        }
    }

    #[test]
    fn pool_size_comes_from_config() {
        assert_eq!(pool_options(&config(7)).get_max_connections(), 7);
    }

    #[test]
    fn zero_pool_size_is_raised_to_one() {
        assert_eq!(pool_options(&config(0)).get_max_connections(), 1);
    }
}
