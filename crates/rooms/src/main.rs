//! CineMatch Rooms Service - main entry point

use std::io;
use std::sync::Arc;

use cinematch_rooms::{
    init_tracing, start_server, InMemoryRoomDirectory, NoopResultSink, PostgresResultSink,
    ResultSink, RoomsConfig,
};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = RoomsConfig::from_env()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

    let results: Arc<dyn ResultSink> = match &config.database_url {
        Some(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(5)
                .connect(url)
                .await
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
            tracing::info!("Voting results will be persisted to Postgres");
            Arc::new(PostgresResultSink::new(pool))
        }
        None => {
            tracing::info!("No database configured, voting results are broadcast only");
            Arc::new(NoopResultSink)
        }
    };

    // Room profiles come from the platform's room service; the in-memory
    // directory backs local development runs.
    let directory = Arc::new(InMemoryRoomDirectory::new());

    tracing::info!(
        "🚀 CineMatch Rooms Service starting on {}:{}",
        config.host,
        config.port
    );

    start_server(config, directory, results).await
}
