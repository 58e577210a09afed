mod cache;
mod clock;
mod config;
mod decision;
mod geo;
mod link;
mod routes;
mod secrets;
mod state;
mod token;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use clock::SystemClock;
use config::{generate_config_template, Config};
use decision::DecisionEngine;
use geo::{CountryLookup, GeoValidator, MaxmindLookup};
use secrets::{GeoBlacklistTable, SecretTable};
use token::TokenCalculator;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load config with layered precedence: defaults < TOML < env < CLI
    let config = Config::load()?;

    // Handle --generate-config: print template and exit
    if config.generate_config {
        print!("{}", generate_config_template());
        return Ok(());
    }

    // Initialize tracing/logging
    let env_filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "seclink_server=info".parse().unwrap())
    };
    if config.json_logs {
        tracing_subscriber::fmt().json().with_env_filter(env_filter()).init();
    } else {
        tracing_subscriber::fmt().pretty().with_env_filter(env_filter()).init();
    }

    tracing::info!("seclink-server v{} starting", env!("CARGO_PKG_VERSION"));

    let clock = Arc::new(SystemClock);

    // Immutable lookup tables, built once from config
    let secrets = Arc::new(SecretTable::new(
        config.secret_default.clone(),
        config.secrets.clone().unwrap_or_default(),
    ));
    let blacklists = Arc::new(GeoBlacklistTable::new(
        config.geo_blacklist_default.clone().unwrap_or_default(),
        config.geo_blacklists.clone().unwrap_or_default(),
    ));

    // GeoIP database is optional: a missing or unreadable file means geo
    // checks fail open rather than refusing to start.
    let geo_lookup: Option<Arc<dyn CountryLookup>> = match MaxmindLookup::open(&config.geoip_db) {
        Ok(lookup) => {
            tracing::info!("Geo database loaded from {}", config.geoip_db);
            Some(Arc::new(lookup))
        }
        Err(e) => {
            tracing::warn!(
                "Geo database {} unavailable ({}), geo checks will fail open",
                config.geoip_db,
                e
            );
            None
        }
    };

    let engine = DecisionEngine::new(
        TokenCalculator::new(secrets, config.cache_ttl_secs, clock.clone()),
        GeoValidator::new(blacklists, geo_lookup, config.cache_ttl_secs, clock.clone()),
        clock,
    );

    let app = routes::build_router(state::AppState {
        engine: Arc::new(engine),
    });

    // Bind and serve
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
