use dotenvy::dotenv;
use envconfig::Envconfig;
use tokio::net::TcpListener;

use pharmamart::services::sweeper;
use pharmamart::{db, router, AppState, Config};

type Error = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    log::info!("Starting the pharmamart API server...");

    // Load environment variables from a .env file if present
    dotenv().ok();

    let config = Config::init_from_env().unwrap();

    let pool = db::init_db(&config.database_url).await?;

    sweeper::start(pool.clone(), config.cart_max_age_days).await?;

    let bind_addr = config.bind_addr.clone();
    let app = router::build_router(AppState::new(pool, config));

    let listener = TcpListener::bind(&bind_addr).await?;
    log::info!("Listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Shutting down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
