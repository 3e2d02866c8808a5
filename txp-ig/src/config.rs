//! Gateway configuration resolution
//!
//! Environment variables take priority over the shared TOML config file,
//! which takes priority over compiled defaults. The media signing secret is
//! the one value generated when absent; references signed with a generated
//! secret do not survive a restart, which the startup log calls out.

use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::{info, warn};
use txp_common::config::TomlConfig;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 5761;
/// Signed media references default to a one-year lifetime
const DEFAULT_MEDIA_URL_TTL_SECONDS: u64 = 60 * 60 * 24 * 365;

/// Resolved gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Base URL of the network-address lookup provider (None = default)
    pub ip_lookup_url: Option<String>,
    /// Base URL of the reverse-geocoding provider (None = default)
    pub reverse_geocode_url: Option<String>,
    pub media_secret: String,
    pub media_url_ttl_seconds: u64,
}

impl GatewayConfig {
    /// Resolve configuration: ENV → TOML → default
    pub fn resolve(toml_config: &TomlConfig) -> Self {
        let host = env_string("TXP_IG_HOST")
            .or_else(|| toml_config.host.clone())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = env_string("TXP_IG_PORT")
            .and_then(|v| v.parse().ok())
            .or(toml_config.port)
            .unwrap_or(DEFAULT_PORT);

        let ip_lookup_url =
            env_string("TXP_IP_LOOKUP_URL").or_else(|| toml_config.ip_lookup_url.clone());
        let reverse_geocode_url = env_string("TXP_REVERSE_GEOCODE_URL")
            .or_else(|| toml_config.reverse_geocode_url.clone());

        let media_secret = match env_string("TXP_MEDIA_SECRET")
            .or_else(|| toml_config.media_secret.clone())
        {
            Some(secret) => {
                info!("Media signing secret loaded from configuration");
                secret
            }
            None => {
                warn!(
                    "No media signing secret configured; generated one for this run. \
                     Signed media references will not survive a restart \
                     (set TXP_MEDIA_SECRET or media_secret in config.toml)."
                );
                generate_secret()
            }
        };

        let media_url_ttl_seconds = env_string("TXP_MEDIA_URL_TTL")
            .and_then(|v| v.parse().ok())
            .or(toml_config.media_url_ttl_seconds)
            .unwrap_or(DEFAULT_MEDIA_URL_TTL_SECONDS);

        Self {
            host,
            port,
            ip_lookup_url,
            reverse_geocode_url,
            media_secret,
            media_url_ttl_seconds,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn generate_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_values_override_defaults() {
        let toml_config = TomlConfig {
            host: Some("0.0.0.0".to_string()),
            port: Some(8080),
            media_secret: Some("s3cret".to_string()),
            media_url_ttl_seconds: Some(600),
            ..Default::default()
        };
        let config = GatewayConfig::resolve(&toml_config);
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.media_secret, "s3cret");
        assert_eq!(config.media_url_ttl_seconds, 600);
    }

    #[test]
    fn defaults_apply_when_unconfigured() {
        let config = GatewayConfig::resolve(&TomlConfig::default());
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(config.ip_lookup_url.is_none());
        assert_eq!(config.media_secret.len(), 32);
    }
}
