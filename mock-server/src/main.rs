use chrono::Local;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mock_server=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let api_key = std::env::var("APOD_API_KEY").unwrap_or_else(|_| "DEMO_KEY".to_string());
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;

    let catalog = mock_server::Catalog::sample(&api_key, Local::now().date_naive());
    tracing::info!(%addr, entries = catalog.entries.len(), "listening");
    mock_server::run(listener, catalog).await
}
