mod config;
mod routes;
mod services;
mod state;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = config::ServerConfig::from_env().expect("invalid server configuration");
    tracing::info!(
        history_limit = config.history_limit,
        client_channel_capacity = config.client_channel_capacity,
        ticket_ttl_secs = config.ticket_ttl_secs,
        "config loaded"
    );

    let port = config.port;
    let state = state::AppState::new(config);
    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "tablechat listening");
    axum::serve(listener, app).await.expect("server failed");
}
