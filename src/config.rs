//! Host configuration: loaded via the `config` crate, layered over
//! built-in defaults and `SYNCWEAVE_*` environment overrides, in the
//! donor's `Config::from_env` + `validate()` style — scoped down to
//! what this host actually needs.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HostConfig {
    /// Address the host binds its control surface to. Unused by the
    /// stdin/stdout bridge itself; reserved for an eventual network
    /// transport.
    pub bind_address: String,
    /// Bound passed to `SyncManager::with_history_capacity`.
    pub history_capacity: usize,
    /// `tracing_subscriber::EnvFilter` directive string.
    pub log_filter: String,
    /// Apply latency, in milliseconds, above which a warning is logged.
    pub latency_budget_ms: u64,
    /// Whether to install a Prometheus metrics recorder at startup.
    pub metrics_enabled: bool,
}

const DEFAULTS_TOML: &str = r#"
bind_address = "127.0.0.1:7420"
history_capacity = 1000
log_filter = "info"
latency_budget_ms = 150
metrics_enabled = true
"#;

impl HostConfig {
    /// Layers the built-in `toml` defaults above, then `SYNCWEAVE_*`
    /// environment overrides on top.
    pub fn from_env() -> anyhow::Result<Self> {
        let raw = config::Config::builder()
            .add_source(config::File::from_str(DEFAULTS_TOML, config::FileFormat::Toml))
            .add_source(config::Environment::with_prefix("SYNCWEAVE"))
            .build()?;

        let config: HostConfig = raw.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.history_capacity == 0 {
            anyhow::bail!("history_capacity must be greater than zero");
        }
        if self.bind_address.parse::<std::net::SocketAddr>().is_err() {
            anyhow::bail!("bind_address is not a valid socket address: {}", self.bind_address);
        }
        if self.log_filter.trim().is_empty() {
            anyhow::bail!("log_filter must not be empty");
        }
        Ok(())
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:7420".to_string(),
            history_capacity: 1000,
            log_filter: "info".to_string(),
            latency_budget_ms: 150,
            metrics_enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(HostConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_history_capacity_is_rejected() {
        let mut cfg = HostConfig::default();
        cfg.history_capacity = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn malformed_bind_address_is_rejected() {
        let mut cfg = HostConfig::default();
        cfg.bind_address = "not-an-address".to_string();
        assert!(cfg.validate().is_err());
    }
}
