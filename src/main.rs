mod board;
mod config;
mod protocol;
mod routes;
mod services;
mod state;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = config::Config::from_env().expect("invalid configuration");
    let bind_addr = config.bind_addr();
    let state = state::AppState::new(config);

    // Spawn background eviction task (no-op unless MATCH_IDLE_TTL_SECS is set).
    let _eviction = services::registry::spawn_eviction_task(state.clone());

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("failed to bind");

    tracing::info!(addr = %bind_addr, "noughts listening");
    axum::serve(listener, app).await.expect("server failed");
}
