use std::time::Duration;

use rusty_library_circulation::{
    adapters::postgres::PgCirculationStore, application::circulation::sweep_expired_reservations,
    config::AppConfig, ports::CirculationStore,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// 予約失効スイーパー
///
/// 設定された間隔で期限切れのPending予約をExpiredにし、Ctrl-Cで終了する。
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rusty_library_circulation=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load()?;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let store = PgCirculationStore::new(pool);
    let mut ticker = tokio::time::interval(Duration::from_secs(config.sweep.interval_secs));

    tracing::info!(
        interval_secs = config.sweep.interval_secs,
        "Reservation sweeper started"
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let outcome = match store.begin().await {
                    Ok(uow) => sweep_expired_reservations(uow, chrono::Utc::now())
                        .await
                        .map_err(|e| e.to_string()),
                    Err(e) => Err(e.to_string()),
                };
                if let Err(error) = outcome {
                    tracing::error!(%error, "Reservation sweep failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down reservation sweeper");
                break;
            }
        }
    }

    Ok(())
}
