use crate::config::EnvConfig;
use anyhow::{Context, Result};
use libclock::{Database, attendance::GeofencePolicy};
use std::sync::Arc;
use tracing::{debug, trace, warn};

#[derive(Debug)]
pub struct SharedState {
    pub db: Database,
    pub config: EnvConfig,
}

impl SharedState {
    pub async fn new(env: EnvConfig) -> Result<Self> {
        trace!("Creating shared app state");
        if !env.geofence.enforce {
            warn!("Geofence enforcement is disabled");
        }
        Ok(Self {
            db: Database::open(&env.database)
                .await
                .with_context(|| format!("Unable to open database {}", &env.database))?,
            config: env,
        })
    }

    pub fn policy(&self) -> GeofencePolicy {
        self.config.geofence
    }

    #[cfg(test)]
    pub fn test(pool: sqlx::Pool<sqlx::Sqlite>) -> Self {
        debug!("Creating test shared app state");
        Self {
            db: Database::from(pool),
            config: EnvConfig {
                database: "test-database.sqlite".to_string(),
                ..Default::default()
            },
        }
    }
}

pub type AppState = Arc<SharedState>;
