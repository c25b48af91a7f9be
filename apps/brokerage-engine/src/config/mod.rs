//! Configuration loading.
//!
//! Defaults cover a local run out of the box; every value can be overridden
//! by environment variables with the `BROKERAGE_` prefix, e.g.
//! `BROKERAGE_SERVER__PORT=9090` or `BROKERAGE_PRICING__TICK_INTERVAL_MS=250`.

use std::time::Duration;

use config::{Config, Environment};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Loading or deserializing the configuration failed.
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// A loaded value failed validation.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl ServerConfig {
    /// `host:port` string for the listener.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Market pricing settings.
#[derive(Debug, Clone, Deserialize)]
pub struct PricingConfig {
    /// Multiplier applied to market-order estimates (e.g. 1.05).
    pub market_buffer: Decimal,
    /// Milliseconds between simulated price ticks.
    pub tick_interval_ms: u64,
    /// Milliseconds a cached quote stays fresh.
    pub cache_ttl_ms: u64,
}

impl PricingConfig {
    /// Tick interval as a duration.
    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Cache TTL as a duration.
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }
}

/// Event bus consumer settings.
#[derive(Debug, Clone, Deserialize)]
pub struct BusConfig {
    /// Delivery attempts before a consumer gives up.
    pub max_attempts: u32,
    /// Milliseconds of base backoff between redeliveries.
    pub retry_backoff_ms: u64,
    /// Milliseconds before a parked order is re-checked.
    pub defer_delay_ms: u64,
}

impl BusConfig {
    /// Base retry backoff as a duration.
    #[must_use]
    pub const fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Defer delay as a duration.
    #[must_use]
    pub const fn defer_delay(&self) -> Duration {
        Duration::from_millis(self.defer_delay_ms)
    }
}

/// Root configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// HTTP server.
    pub server: ServerConfig,
    /// Market pricing.
    pub pricing: PricingConfig,
    /// Event bus consumers.
    pub bus: BusConfig,
}

impl AppConfig {
    /// Load configuration from defaults and the environment.
    ///
    /// # Errors
    ///
    /// Returns error if an override fails to parse or validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("pricing.market_buffer", "1.05")?
            .set_default("pricing.tick_interval_ms", 1000)?
            .set_default("pricing.cache_ttl_ms", 500)?
            .set_default("bus.max_attempts", 5)?
            .set_default("bus.retry_backoff_ms", 100)?
            .set_default("bus.defer_delay_ms", 500)?
            .add_source(Environment::with_prefix("BROKERAGE").separator("__"))
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.pricing.market_buffer < Decimal::ONE {
            return Err(ConfigError::Invalid(
                "pricing.market_buffer must be at least 1".to_string(),
            ));
        }
        if self.bus.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "bus.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.pricing.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "pricing.tick_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn defaults_load_and_validate() {
        let config = AppConfig::load().unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.pricing.market_buffer, dec!(1.05));
        assert_eq!(config.bus.max_attempts, 5);
        assert_eq!(config.pricing.tick_interval(), Duration::from_millis(1000));
    }

    #[test]
    fn bind_addr_joins_host_and_port() {
        let server = ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 9090,
        };
        assert_eq!(server.bind_addr(), "0.0.0.0:9090");
    }

    #[test]
    fn buffer_below_one_is_rejected() {
        let config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            pricing: PricingConfig {
                market_buffer: dec!(0.9),
                tick_interval_ms: 1000,
                cache_ttl_ms: 500,
            },
            bus: BusConfig {
                max_attempts: 5,
                retry_backoff_ms: 100,
                defer_delay_ms: 500,
            },
        };
        assert!(config.validate().is_err());
    }
}
