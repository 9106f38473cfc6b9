use std::sync::Arc;

use basematch_api::config::AppConfig;
use basematch_api::services::sweeper;
use basematch_api::store::PgStore;
use basematch_api::{build_router, AppState};
use basematch_shared::clients::chain::ContractClient;
use basematch_shared::clients::db::create_pool;
use basematch_shared::clients::email::EmailClient;
use basematch_shared::clients::redis::RedisClient;
use basematch_shared::clients::storage::MinioClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    basematch_shared::middleware::init_tracing("basematch-api");

    let config = AppConfig::load()?;
    let port = config.port;

    let pool = create_pool(&config.database_url, 10)?;
    let redis = RedisClient::connect(&config.redis_url).await?;
    let minio = MinioClient::new(
        &config.minio_endpoint,
        &config.minio_access_key,
        &config.minio_secret_key,
        &config.minio_bucket,
        &config.minio_public_url,
    )
    .await;
    let mailer = EmailClient::new(&config.resend_api_key, &config.from_email, "BaseMatch");
    let chain = ContractClient::new(
        &config.rpc_url,
        &config.profile_nft_address,
        &config.staking_address,
        &config.reputation_address,
    )?;

    let metrics = match basematch_shared::middleware::init_metrics() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "metrics recorder not installed");
            None
        }
    };

    let state = Arc::new(AppState {
        store: Arc::new(PgStore::new(pool)),
        mailer: Arc::new(mailer),
        storage: Arc::new(minio),
        limiter: Arc::new(redis),
        chain: Arc::new(chain),
        config,
        metrics,
    });

    sweeper::spawn(state.clone());

    let app = build_router(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "basematch-api starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
