//! Copies markers.json and its local photos into the hosted store.
//!
//! Usage: migrate_markers [MARKERS_JSON] [UPLOADS_DIR]
//! Defaults: ./markers.json and ./public/uploads

use marker_client::config::HostedConfig;
use marker_client::hosted::HostedStore;
use marker_client::migrate;
use std::path::PathBuf;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Some(config) = HostedConfig::from_env() else {
        log::error!("HOSTED_STORE_URL and HOSTED_STORE_ANON_KEY must be set");
        std::process::exit(1);
    };

    let mut args = std::env::args().skip(1);
    let markers_file = PathBuf::from(args.next().unwrap_or_else(|| "./markers.json".to_string()));
    let uploads_dir = PathBuf::from(args.next().unwrap_or_else(|| "./public/uploads".to_string()));

    log::info!("Migrating into {} (table {}, bucket {})", config.url, config.table, config.bucket);
    let store = HostedStore::new(config);
    match migrate::migrate(&store, &markers_file, &uploads_dir).await {
        Ok(report) => {
            log::info!(
                "{} inserted, {} failed, {} photos uploaded, {} photos missing",
                report.inserted,
                report.failed,
                report.images_uploaded,
                report.images_missing
            );
            if report.failed > 0 {
                std::process::exit(2);
            }
        }
        Err(e) => {
            log::error!("Migration failed: {}", e);
            std::process::exit(1);
        }
    }
}
