//! Configuration types.
//!
//! Everything here is read once at startup and then shared read-only.

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::transport::is_valid_email;

const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_SERVER_PORT: u16 = 8080;

/// Mail transport and default sender settings.
#[derive(Debug, Clone)]
pub struct MailConfig {
    /// SMTP host. `None` switches the service into dry-run mode.
    pub host: Option<String>,
    pub port: u16,
    /// Implicit TLS (port 465 style) when true, STARTTLS otherwise.
    pub secure: bool,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    /// Sender used when a request does not supply one.
    pub default_from_email: Option<String>,
    pub default_from_name: Option<String>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: DEFAULT_SMTP_PORT,
            secure: false,
            username: None,
            password: None,
            default_from_email: None,
            default_from_name: None,
        }
    }
}

impl MailConfig {
    /// Build config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let port = match get("SMTP_PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::InvalidValue {
                key: "SMTP_PORT".into(),
                message: format!("{raw:?} is not a port number: {e}"),
            })?,
            None => DEFAULT_SMTP_PORT,
        };

        let secure = get("SMTP_SECURE").is_some_and(|v| parse_flag(&v));

        let default_from_email = get("MAIL_FROM_EMAIL");
        if let Some(email) = default_from_email.as_deref()
            && !is_valid_email(email)
        {
            return Err(ConfigError::InvalidValue {
                key: "MAIL_FROM_EMAIL".into(),
                message: format!("{email:?} is not a valid email address"),
            });
        }

        Ok(Self {
            host: get("SMTP_HOST"),
            port,
            secure,
            username: get("SMTP_USER"),
            password: get("SMTP_PASS").map(SecretString::from),
            default_from_email,
            default_from_name: get("MAIL_FROM_NAME"),
        })
    }

    /// True when no SMTP host is configured.
    pub fn is_dry_run(&self) -> bool {
        self.host.is_none()
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// HTTP server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: DEFAULT_SERVER_PORT,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let bind = std::env::var("MAILCAST_BIND").unwrap_or(defaults.bind);
        let port = match std::env::var("MAILCAST_PORT") {
            Ok(raw) => raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
                key: "MAILCAST_PORT".into(),
                message: format!("{raw:?} is not a port number: {e}"),
            })?,
            Err(_) => defaults.port,
        };
        Ok(Self { bind, port })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}
