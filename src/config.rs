use config::{Config, ConfigBuilder, ConfigError, Environment, File, builder::DefaultState};
use serde::{Deserialize, Serialize};
use sms_core::AlertSettings;
use std::collections::HashMap;
use std::env;

/// Environment variables read straight into [`AlertSettings`], paired with the field they fill.
pub const ALERT_ENV_VARS: [(&str, &str); 6] = [
    ("ADMIN_API_KEY", "admin_api_key"),
    ("TWILIO_ACCOUNT_SID", "twilio_account_sid"),
    ("TWILIO_AUTH_TOKEN", "twilio_auth_token"),
    ("TWILIO_MESSAGING_SERVICE_SID", "twilio_messaging_service_sid"),
    ("TWILIO_FROM", "twilio_from"),
    ("TO_NUMBER", "to_number"),
];

/// Application configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Twilio API endpoint
    pub provider: ProviderConfig,
    /// Admin key, provider credentials and routing
    pub alert: AlertSettings,
}

/// Server configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Server host (default: 0.0.0.0)
    pub host: String,
    /// Server port (default: 3000)
    pub port: u16,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Log level or filter directive (default: info)
    pub level: String,
    /// Log format: json or pretty (default: json)
    pub format: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProviderConfig {
    /// Twilio REST base URL (default: https://api.twilio.com)
    pub base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: sms_twilio::DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from files and the process environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(&env::vars().collect())
    }

    /// Load configuration from files and the given environment map.
    ///
    /// Later sources win: defaults, `config/default`, `config/{RUN_MODE}`,
    /// `config/local`, `SMSALERT__*` variables, then the plain provider
    /// variables in [`ALERT_ENV_VARS`].
    pub fn load_with(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let run_mode = vars
            .get("RUN_MODE")
            .cloned()
            .unwrap_or_else(|| "development".into());

        let builder = Config::builder()
            // Start with default configuration
            .add_source(Config::try_from(&AppConfig::default())?)
            // Add configuration file based on environment
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add local configuration file (gitignored)
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables (e.g. SMSALERT__SERVER__PORT)
            .add_source(
                Environment::with_prefix("SMSALERT")
                    .separator("__")
                    .source(Some(vars.clone())),
            );

        with_alert_overrides(builder, vars)?.build()?.try_deserialize()
    }
}

fn with_alert_overrides(
    mut builder: ConfigBuilder<DefaultState>,
    vars: &HashMap<String, String>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    for (var, field) in ALERT_ENV_VARS {
        builder = builder.set_override_option(format!("alert.{}", field), vars.get(var).cloned())?;
    }
    Ok(builder)
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            provider: ProviderConfig::default(),
            alert: AlertSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_without_environment() {
        let config = AppConfig::load_with(&vars(&[("RUN_MODE", "unit-test")])).unwrap();
        assert_eq!(config.server.bind_address(), "0.0.0.0:3000");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.provider.base_url, "https://api.twilio.com");
        assert_eq!(config.alert, AlertSettings::default());
    }

    #[test]
    fn provider_variables_fill_alert_settings() {
        let config = AppConfig::load_with(&vars(&[
            ("RUN_MODE", "unit-test"),
            ("ADMIN_API_KEY", "correct-key"),
            ("TWILIO_ACCOUNT_SID", "AC123"),
            ("TWILIO_AUTH_TOKEN", "token"),
            ("TWILIO_FROM", "+15550001111"),
            ("TO_NUMBER", "+15550002222"),
        ]))
        .unwrap();

        assert_eq!(config.alert.admin_key(), Some("correct-key"));
        assert_eq!(config.alert.credentials(), Ok(("AC123", "token")));
        assert_eq!(config.alert.destination(), Ok("+15550002222"));
        assert_eq!(config.alert.twilio_messaging_service_sid, None);
    }

    #[test]
    fn prefixed_variables_override_server_settings() {
        let config = AppConfig::load_with(&vars(&[
            ("RUN_MODE", "unit-test"),
            ("SMSALERT__SERVER__PORT", "8080"),
            ("SMSALERT__LOGGING__FORMAT", "pretty"),
        ]))
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn plain_variable_beats_prefixed_one() {
        let config = AppConfig::load_with(&vars(&[
            ("RUN_MODE", "unit-test"),
            ("SMSALERT__ALERT__TO_NUMBER", "+10000000000"),
            ("TO_NUMBER", "+15550002222"),
        ]))
        .unwrap();
        assert_eq!(config.alert.destination(), Ok("+15550002222"));
    }
}
