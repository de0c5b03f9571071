use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use tracing::warn;

use crate::model::PackSizes;

/// Complete application configuration, loaded from environment variables or default values.
///
/// Logging is configured separately through [`LoggingConfig`] so that the
/// subscriber exists before the remaining variables are validated.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub calculator: CalculatorConfig,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            calculator: CalculatorConfig::from_env(),
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
}

impl ApiConfig {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;
    const HOST_VAR: &'static str = "PACK_CALCULATOR_API_HOST";
    const PORT_VAR: &'static str = "PACK_CALCULATOR_API_PORT";
    const LEGACY_PORT_VAR: &'static str = "PORT";

    fn from_env() -> Self {
        let host_value =
            env_string(Self::HOST_VAR).unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, display_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                warn!(
                    "Could not parse {} ('{}'): {}. Using {}.",
                    Self::HOST_VAR,
                    host_value,
                    err,
                    Self::DEFAULT_HOST
                );
                (
                    IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                    Self::DEFAULT_HOST.to_string(),
                )
            }
        };

        let port = env_string(Self::PORT_VAR)
            .map(|raw| (Self::PORT_VAR, raw))
            .or_else(|| env_string(Self::LEGACY_PORT_VAR).map(|raw| (Self::LEGACY_PORT_VAR, raw)))
            .map(|(var_name, raw)| parse_port(var_name, &raw).unwrap_or(Self::DEFAULT_PORT))
            .unwrap_or(Self::DEFAULT_PORT);

        Self {
            bind_ip,
            display_host,
            port,
        }
    }

    /// Socket address to bind the server to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Visible hostname for logging and hints.
    pub fn display_host(&self) -> &str {
        &self.display_host
    }

    /// Configured port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }

    /// Checks whether the hostname matches the default value.
    pub fn uses_default_host(&self) -> bool {
        self.display_host == Self::DEFAULT_HOST
    }
}

/// Configuration for the pack calculator and its HTTP limits.
#[derive(Clone, Debug)]
pub struct CalculatorConfig {
    pack_sizes: PackSizes,
    cache_capacity: usize,
    max_order_size: i64,
    startup_check: bool,
}

impl CalculatorConfig {
    pub const DEFAULT_PACK_SIZES: [i64; 5] = [250, 500, 1000, 2000, 5000];
    pub const DEFAULT_CACHE_CAPACITY: usize = 1024;
    pub const DEFAULT_MAX_ORDER_SIZE: i64 = 10_000_000;
    const PACK_SIZES_VAR: &'static str = "PACK_SIZES";
    const CACHE_CAPACITY_VAR: &'static str = "PACK_CALCULATOR_CACHE_CAPACITY";
    const MAX_ORDER_SIZE_VAR: &'static str = "PACK_CALCULATOR_MAX_ORDER_SIZE";
    const STARTUP_CHECK_VAR: &'static str = "PACK_CALCULATOR_STARTUP_CHECK";

    fn from_env() -> Self {
        let pack_sizes = match env_string(Self::PACK_SIZES_VAR) {
            Some(raw) => parse_pack_sizes(&raw, Self::PACK_SIZES_VAR)
                .unwrap_or_else(Self::default_pack_sizes),
            None => Self::default_pack_sizes(),
        };

        let cache_capacity = env_string(Self::CACHE_CAPACITY_VAR)
            .and_then(|raw| parse_number::<usize>(&raw, Self::CACHE_CAPACITY_VAR))
            .unwrap_or(Self::DEFAULT_CACHE_CAPACITY);

        let max_order_size = match env_string(Self::MAX_ORDER_SIZE_VAR)
            .and_then(|raw| parse_number::<i64>(&raw, Self::MAX_ORDER_SIZE_VAR))
        {
            Some(value) if value > 0 => value,
            Some(value) => {
                warn!(
                    "{} must be greater than 0, got {}. Using {}.",
                    Self::MAX_ORDER_SIZE_VAR,
                    value,
                    Self::DEFAULT_MAX_ORDER_SIZE
                );
                Self::DEFAULT_MAX_ORDER_SIZE
            }
            None => Self::DEFAULT_MAX_ORDER_SIZE,
        };

        let startup_check = env_string(Self::STARTUP_CHECK_VAR)
            .and_then(|raw| parse_bool(&raw, Self::STARTUP_CHECK_VAR))
            .unwrap_or(true);

        Self {
            pack_sizes,
            cache_capacity,
            max_order_size,
            startup_check,
        }
    }

    fn default_pack_sizes() -> PackSizes {
        PackSizes::new(Self::DEFAULT_PACK_SIZES.to_vec())
            .expect("Default pack sizes must be valid")
    }

    /// Pack sizes active after startup.
    pub fn pack_sizes(&self) -> PackSizes {
        self.pack_sizes.clone()
    }

    /// Maximum number of memoised results.
    pub fn cache_capacity(&self) -> usize {
        self.cache_capacity
    }

    /// Largest order size accepted over HTTP.
    pub fn max_order_size(&self) -> i64 {
        self.max_order_size
    }

    /// Whether to run the reference calculation once at startup.
    pub fn startup_check(&self) -> bool {
        self.startup_check
    }
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        Self {
            pack_sizes: Self::default_pack_sizes(),
            cache_capacity: Self::DEFAULT_CACHE_CAPACITY,
            max_order_size: Self::DEFAULT_MAX_ORDER_SIZE,
            startup_check: true,
        }
    }
}

/// Output format of the log subscriber.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Configuration for logging.
#[derive(Clone, Debug)]
pub struct LoggingConfig {
    format: LogFormat,
}

impl LoggingConfig {
    const FORMAT_VAR: &'static str = "PACK_CALCULATOR_LOG_FORMAT";

    /// Reads the log format. Runs before any subscriber is installed.
    pub fn from_env() -> Self {
        let format = match env_string(Self::FORMAT_VAR)
            .map(|raw| raw.to_ascii_lowercase())
            .as_deref()
        {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                eprintln!(
                    "⚠️ Unknown {} ('{}'). Using pretty output.",
                    Self::FORMAT_VAR,
                    other
                );
                LogFormat::Pretty
            }
        };

        Self { format }
    }

    pub fn format(&self) -> LogFormat {
        self.format
    }
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            warn!("Access to {} failed: {}. Using default value.", name, err);
            None
        }
    }
}

fn parse_bool(raw: &str, var_name: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        other => {
            warn!(
                "Could not interpret {} ('{}') as boolean value. Using default value.",
                var_name, other
            );
            None
        }
    }
}

fn parse_number<T>(raw: &str, var_name: &str) -> Option<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(
                "Could not parse {} ('{}') as number: {}. Using default value.",
                var_name, raw, err
            );
            None
        }
    }
}

fn parse_port(var_name: &str, raw: &str) -> Option<u16> {
    match parse_number::<u16>(raw, var_name)? {
        0 => {
            warn!("{} must not be 0. Using default port.", var_name);
            None
        }
        port => Some(port),
    }
}

/// Parses a comma-separated pack size list.
///
/// Unparsable tokens are skipped; a list that ends up empty or contains a
/// non-positive size is rejected as a whole.
fn parse_pack_sizes(raw: &str, var_name: &str) -> Option<PackSizes> {
    let sizes: Vec<i64> = raw
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter_map(|token| match token.parse::<i64>() {
            Ok(size) => Some(size),
            Err(err) => {
                warn!("Skipping pack size '{}' in {}: {}", token, var_name, err);
                None
            }
        })
        .collect();

    match PackSizes::new(sizes) {
        Ok(pack_sizes) => Some(pack_sizes),
        Err(err) => {
            warn!("{} is invalid ({}). Using default pack sizes.", var_name, err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_true_values() {
        assert_eq!(parse_bool("1", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("true", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("yes", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("y", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("on", "TEST_VAR"), Some(true));

        // Test case insensitivity
        assert_eq!(parse_bool("TRUE", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("ON", "TEST_VAR"), Some(true));

        // Test with whitespace
        assert_eq!(parse_bool(" true ", "TEST_VAR"), Some(true));
    }

    #[test]
    fn test_parse_bool_false_values() {
        assert_eq!(parse_bool("0", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool("false", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool("no", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool("n", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool("OFF", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool("  0  ", "TEST_VAR"), Some(false));
    }

    #[test]
    fn test_parse_bool_invalid_values() {
        assert_eq!(parse_bool("invalid", "TEST_VAR"), None);
        assert_eq!(parse_bool("2", "TEST_VAR"), None);
        assert_eq!(parse_bool("", "TEST_VAR"), None);
    }

    #[test]
    fn test_parse_pack_sizes_sorts_and_trims() {
        let sizes = parse_pack_sizes(" 23, 53 ,31", "TEST_VAR").unwrap();
        assert_eq!(sizes.to_vec(), vec![53, 31, 23]);
    }

    #[test]
    fn test_parse_pack_sizes_skips_garbage_tokens() {
        let sizes = parse_pack_sizes("100,abc,,200", "TEST_VAR").unwrap();
        assert_eq!(sizes.to_vec(), vec![200, 100]);
    }

    #[test]
    fn test_parse_pack_sizes_rejects_invalid_lists() {
        assert!(parse_pack_sizes("100,-5", "TEST_VAR").is_none());
        assert!(parse_pack_sizes("abc,def", "TEST_VAR").is_none());
    }

    #[test]
    fn test_parse_port() {
        assert_eq!(parse_port("TEST_VAR", "9000"), Some(9000));
        assert_eq!(parse_port("TEST_VAR", "0"), None);
        assert_eq!(parse_port("TEST_VAR", "99999"), None);
        assert_eq!(parse_port("TEST_VAR", "http"), None);
    }

    #[test]
    fn test_calculator_defaults() {
        let config = CalculatorConfig::default();
        assert_eq!(config.pack_sizes().to_vec(), vec![5000, 2000, 1000, 500, 250]);
        assert_eq!(config.cache_capacity(), 1024);
        assert_eq!(config.max_order_size(), 10_000_000);
        assert!(config.startup_check());
    }
}
