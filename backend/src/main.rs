use polly_backend::{build_rocket, config::Config, routes::AppState, store::Backend};
use shuttle_runtime::CustomError;
use sqlx::PgPool;
use tracing::info;

#[shuttle_runtime::main]
async fn rocket(
    #[shuttle_shared_db::Postgres] pool: PgPool,
    #[shuttle_runtime::Secrets] secret_store: shuttle_runtime::SecretStore,
) -> shuttle_rocket::ShuttleRocket {
    info!("🚀 Starting Polly server");

    let config = Config::from_lookup(|key| secret_store.get(key));

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(CustomError::new)?;

    info!("📋 Migrations complete");

    let state = AppState::new(Backend::Postgres(pool), &config);
    let rocket = build_rocket(state, &config);

    Ok(rocket.into())
}
