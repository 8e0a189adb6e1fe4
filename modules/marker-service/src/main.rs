//! Marker Service: standalone binary for storing map markers and their photos.
//!
//! Default: http://127.0.0.1:9110/

use marker_service::config::Config;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = Config::from_env();

    let state = marker_service::build_state(&config).expect("Failed to open marker store");
    log::info!(
        "Storing photos in {} (served at {})",
        config.uploads_dir.display(),
        config.uploads_url
    );

    let app = marker_service::router(state, &config);

    let addr = format!("{}:{}", config.host, config.port);
    log::info!("Marker Service listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind");

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
