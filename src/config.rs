use std::collections::HashMap;

use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Secure-link token validation server
#[derive(Parser, Serialize, Deserialize, Clone, Debug)]
#[command(name = "seclink-server", version, about = "Secure-link token validation server")]
pub struct Config {
    /// Port to listen on
    #[arg(long, env = "SECLINK_PORT", default_value = "8080")]
    pub port: u16,

    /// Bind address
    #[arg(long, env = "SECLINK_BIND_ADDRESS", default_value = "127.0.0.1")]
    pub bind_address: String,

    /// Path to TOML config file
    #[arg(long, default_value = "./seclink.toml")]
    pub config: String,

    /// Enable structured JSON logging (for Docker/production)
    #[arg(long, env = "SECLINK_JSON_LOGS")]
    pub json_logs: bool,

    /// Output a commented TOML config template and exit
    #[arg(long)]
    pub generate_config: bool,

    /// Signing secret used for locations without a [secrets] entry
    #[arg(long, env = "SECLINK_SECRET_DEFAULT", default_value = "my-secret")]
    pub secret_default: String,

    /// TTL in seconds for the token and geo lookup caches
    #[arg(long, env = "SECLINK_CACHE_TTL_SECS", default_value = "60")]
    pub cache_ttl_secs: i64,

    /// Path to the MaxMind country database. If the file cannot be opened
    /// the server starts anyway and geo checks fail open.
    #[arg(long, env = "SECLINK_GEOIP_DB", default_value = "./GeoLite2-Country.mmdb")]
    pub geoip_db: String,

    /// Per-location signing secrets (loaded from the [secrets] TOML table)
    #[arg(skip)]
    #[serde(default)]
    pub secrets: Option<HashMap<String, String>>,

    /// Banned ISO country codes for locations without a [geo_blacklists]
    /// entry (TOML only)
    #[arg(skip)]
    #[serde(default)]
    pub geo_blacklist_default: Option<Vec<String>>,

    /// Per-location banned ISO country codes (loaded from the
    /// [geo_blacklists] TOML table)
    #[arg(skip)]
    #[serde(default)]
    pub geo_blacklists: Option<HashMap<String, Vec<String>>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_address: "127.0.0.1".to_string(),
            config: "./seclink.toml".to_string(),
            json_logs: false,
            generate_config: false,
            secret_default: "my-secret".to_string(),
            cache_ttl_secs: 60,
            geoip_db: "./GeoLite2-Country.mmdb".to_string(),
            secrets: None,
            geo_blacklist_default: None,
            geo_blacklists: None,
        }
    }
}

impl Config {
    /// Load config with layered precedence:
    /// built-in defaults < TOML file < env vars (SECLINK_*) < CLI args
    pub fn load() -> Result<Self, figment::Error> {
        let cli = Config::parse();
        let config_path = cli.config.clone();

        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_path))
            .merge(Env::prefixed("SECLINK_"))
            .merge(Serialized::defaults(cli))
            .extract()
    }
}

/// Generate a commented TOML config template
pub fn generate_config_template() -> String {
    r#"# Secure-link server configuration
# Place this file at ./seclink.toml or specify with --config <path>
# Scalar settings can be overridden via environment variables (SECLINK_PORT,
# etc.) or CLI flags (--port, etc.)

# Server port (default: 8080)
# port = 8080

# Bind address (default: 127.0.0.1 — auth subrequests come from the local proxy)
# bind_address = "127.0.0.1"

# Enable structured JSON logging for Docker/production
# json_logs = false

# Signing secret for locations not listed under [secrets]
# secret_default = "my-secret"

# TTL in seconds for the token and geo lookup caches
# cache_ttl_secs = 60

# Path to the MaxMind country database; geo checks fail open if missing
# geoip_db = "./GeoLite2-Country.mmdb"

# Banned countries for locations not listed under [geo_blacklists]
# geo_blacklist_default = []

# Per-location signing secrets
# [secrets]
# lbcgrouplive = "H3ll0!S3c&8"

# Per-location banned ISO-3166 country codes
# [geo_blacklists]
# lbcgrouplive = ["US", "CN"]
"#
    .to_string()
}
