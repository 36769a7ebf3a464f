use crate::error::ConfigError;

/// Configuration for the Print Wear Guard service loaded from environment variables.
///
/// The risk engine itself needs no configuration; these settings only shape
/// the HTTP service wrapped around it and the optional integrations.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Address the HTTP service binds to.
    /// Environment variable: `HTTP_ADDR`
    pub http_addr: String,

    /// Discord webhook URL for forwarding critical maintenance alerts.
    ///
    /// When unset, alerts are only returned to the caller.
    /// Environment variable: `DISCORD_WEBHOOK`
    pub discord_webhook: Option<String>,

    /// Whether the secondary maintenance estimator runs on each request.
    /// Environment variable: `ENABLE_MAINTENANCE_MODEL`
    pub maintenance_model_enabled: bool,

    /// Value sent in `Access-Control-Allow-Origin`.
    /// Environment variable: `CORS_ALLOWED_ORIGIN`
    pub cors_allowed_origin: String,

    /// Largest accepted request body in bytes.
    /// Environment variable: `MAX_BODY_BYTES`
    pub max_body_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_addr: constants::DEFAULT_HTTP_ADDR.to_string(),
            discord_webhook: None,
            maintenance_model_enabled: true,
            cors_allowed_origin: "*".to_string(),
            max_body_bytes: constants::DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed:
    /// - `HTTP_ADDR`: Listen address (default: "127.0.0.1:5001")
    /// - `DISCORD_WEBHOOK`: Webhook URL (optional, empty means unset)
    /// - `ENABLE_MAINTENANCE_MODEL`: "true" or "false" (default: "true")
    /// - `CORS_ALLOWED_ORIGIN`: Allowed origin (default: "*")
    /// - `MAX_BODY_BYTES`: Positive integer (default: "65536")
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let http_addr = lookup("HTTP_ADDR").unwrap_or(defaults.http_addr);
        if http_addr.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                var_name: "HTTP_ADDR",
                value: http_addr,
                reason: "address must not be empty".to_string(),
            });
        }

        let discord_webhook = lookup("DISCORD_WEBHOOK").filter(|url| !url.trim().is_empty());

        let maintenance_model_enabled = match lookup("ENABLE_MAINTENANCE_MODEL") {
            Some(value) => value
                .parse::<bool>()
                .map_err(|e| ConfigError::InvalidValue {
                    var_name: "ENABLE_MAINTENANCE_MODEL",
                    value: value.clone(),
                    reason: format!("must be 'true' or 'false': {}", e),
                })?,
            None => defaults.maintenance_model_enabled,
        };

        let cors_allowed_origin =
            lookup("CORS_ALLOWED_ORIGIN").unwrap_or(defaults.cors_allowed_origin);

        let max_body_bytes = match lookup("MAX_BODY_BYTES") {
            Some(value) => match value.parse::<usize>() {
                Ok(bytes) if bytes > 0 => bytes,
                Ok(_) => {
                    return Err(ConfigError::InvalidValue {
                        var_name: "MAX_BODY_BYTES",
                        value,
                        reason: "must be greater than zero".to_string(),
                    });
                }
                Err(e) => {
                    return Err(ConfigError::InvalidValue {
                        var_name: "MAX_BODY_BYTES",
                        reason: e.to_string(),
                        value,
                    });
                }
            },
            None => defaults.max_body_bytes,
        };

        Ok(Config {
            http_addr,
            discord_webhook,
            maintenance_model_enabled,
            cors_allowed_origin,
            max_body_bytes,
        })
    }
}

/// Application constants used throughout the system.
pub mod constants {
    /// Name used in webhook footers and log lines.
    pub const SERVICE_NAME: &str = "Print Wear Guard";

    /// Default listen address for the HTTP service.
    pub const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:5001";

    /// Default request body limit in bytes.
    pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;

    /// Wear factor above which the nozzle maintenance alert fires.
    pub const WEAR_ALERT_THRESHOLD: f64 = 0.7;

    /// Thermal stress above which the temperature-control alert fires.
    pub const THERMAL_ALERT_THRESHOLD: f64 = 0.8;

    /// Pending webhook deliveries held before new ones are dropped.
    pub const ALERT_QUEUE_CAPACITY: usize = 64;

    /// Largest accepted request line plus headers, in bytes.
    pub const MAX_HEADER_BYTES: usize = 8 * 1024;

    /// Seconds a connection may stay idle while its request is read.
    pub const REQUEST_READ_TIMEOUT_SECS: u64 = 10;

    /// Layer heights above this fraction of the nozzle diameter are flagged.
    pub const LAYER_NOZZLE_RATIO: f64 = 0.8;
}
