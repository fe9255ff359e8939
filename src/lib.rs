pub mod api;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod db;
pub mod middleware;
pub mod server;
pub mod util;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Database error: {0}")]
    Database(#[from] db::DbError),
    #[error("Search index error: {0}")]
    Search(#[from] catalog::RefreshError),
    #[error("Server error: {0}")]
    Server(String),
}

pub async fn run(config_path: &str, debug_logs: bool) -> Result<(), ServerError> {
    let mut config = config::Config::from_file(config_path)?;
    config.debug_logs = debug_logs;

    info!("Using config file: {}", config_path);
    info!("Site: {} ({})", config.site.name, config.site.base_url);
    if debug_logs {
        info!("Debug logging enabled");
    }

    let db_path = config
        .get_database_path()
        .ok_or_else(|| ServerError::Server("No database path configured".to_string()))?;

    info!("Opening database at {}", db_path);
    let db = Arc::new(db::SqliteRepository::new(&db_path).await?);

    db.clone().start_background_tasks();

    api::auth::bootstrap_admin(db.as_ref(), config.admin.as_ref(), config.auth.bcrypt_cost)
        .await
        .map_err(|e| ServerError::Server(format!("Failed to create admin user: {}", e)))?;

    let search = Arc::new(
        catalog::SearchIndex::new()
            .map_err(|e| ServerError::Server(format!("Failed to create search index: {}", e)))?,
    );
    let indexed = catalog::refresh_search_index(db.as_ref(), &search).await?;
    info!("Indexed {} published celebrities", indexed);

    catalog::analytics::start_rollup_loop(db.clone(), config.analytics.rollup_interval_secs);

    let image_resizer = Arc::new(
        util::ImageResizer::new(
            config.image_cache_dir(),
            config.original_image_dir(),
            config.imagedir.as_ref().map(PathBuf::from),
        )
        .map_err(|e| ServerError::Server(format!("Failed to create image resizer: {}", e)))?,
    );

    let address = config.listen.address.as_deref().unwrap_or("[::]");
    let port = &config.listen.port;
    let addr: SocketAddr = format!("{}:{}", address, port)
        .parse()
        .map_err(|e| ServerError::Server(format!("Invalid address: {}", e)))?;

    let tls = match (&config.listen.tlscert, &config.listen.tlskey) {
        (Some(cert), Some(key)) => Some((cert.clone(), key.clone())),
        _ => None,
    };

    let state = server::AppState::new(config, db, search, image_resizer);
    let app = server::build_app(state);

    if let Some((cert_path, key_path)) = tls {
        info!("Loading TLS certificate from {}", cert_path);
        info!("Loading TLS key from {}", key_path);

        let tls_config =
            axum_server::tls_rustls::RustlsConfig::from_pem_file(&cert_path, &key_path)
                .await
                .map_err(|e| ServerError::Server(format!("Failed to load TLS config: {}", e)))?;

        info!("Serving HTTPS on {}", addr);

        axum_server::bind_rustls(addr, tls_config)
            .serve(app.into_make_service())
            .await
            .map_err(|e| ServerError::Server(format!("Server error: {}", e)))?;
    } else {
        info!("Serving HTTP on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Server(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, app.into_make_service())
            .await
            .map_err(|e| ServerError::Server(format!("Server error: {}", e)))?;
    }

    Ok(())
}
