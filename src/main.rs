use campus_gateway::{app, config, AppState};

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up BACKEND_API_URL etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = config::config();
    tracing::info!(
        "Starting Campus Gateway in {:?} mode, backend {}",
        config.environment,
        config.backend.base_url
    );

    let state = AppState::from_env().expect("failed to build gateway state");
    let app = app(state);

    // Allow tests or deployments to override port via env
    let port = std::env::var("GATEWAY_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("Campus Gateway listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}
