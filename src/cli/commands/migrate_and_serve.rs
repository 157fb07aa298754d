use anyhow::Result;
use tracing::{debug, info};

use super::initdb::run_migrations;
use super::serve::run_server;
use crate::config::{Settings, build_cache};
use crate::schemas::AppState;

pub async fn migrate_and_serve(settings: &Settings) -> Result<()> {
    info!("Applying database migrations and starting server");
    debug!("Database URL: {}", settings.database_url);

    let db = run_migrations(&settings.database_url).await?;
    let state = AppState {
        db,
        cache: build_cache(&settings.cache),
    };

    run_server(state, settings).await
}
