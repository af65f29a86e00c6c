//! Configuration for the Falcon MCP server.
//!
//! Settings are loaded once at process start (from the environment or
//! explicit values) and passed by reference into the provider and server
//! constructors. There is no ambient global.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{FalconError, Result};

/// Default Falcon cloud (US-1).
pub const DEFAULT_BASE_URL: &str = "https://api.crowdstrike.com";

/// Credential values that indicate an unconfigured deployment.
const PLACEHOLDER_CREDENTIALS: &[&str] = &[
    "your-client-id-here",
    "your-client-secret-here",
    "your-id",
    "your-secret",
    "",
];

/// A credential that must never appear in logs or error output.
///
/// `Debug` and `Display` both redact, and there are deliberately no
/// serde impls; the raw value is only reachable through
/// [`Secret::expose`].
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(\"[REDACTED]\")")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Deployment environment. `Demo` swaps the real provider for the
/// in-memory mock so the server can run without credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    Production,
    Demo,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
            Environment::Demo => "demo",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = FalconError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            "demo" => Ok(Environment::Demo),
            other => Err(FalconError::configuration(
                "environment",
                format!(
                    "'{other}' is not a valid environment (expected development, staging, production, or demo)"
                ),
            )),
        }
    }
}

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Falcon API client ID.
    pub client_id: Secret,
    /// Falcon API client secret.
    pub client_secret: Secret,
    /// Falcon API base URL, without a trailing slash.
    pub base_url: String,
    /// HTTP server bind host.
    pub server_host: String,
    /// HTTP server bind port.
    pub server_port: u16,
    /// Default tracing filter directive (e.g. "info", "debug").
    pub log_level: String,
    pub environment: Environment,
}

impl Settings {
    /// Build settings from explicit credentials, validating as we go.
    /// Remaining fields take their defaults.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        let settings = Self {
            client_id: Secret::new(client_id),
            client_secret: Secret::new(client_secret),
            base_url: normalize_base_url(base_url.into())?,
            server_host: "0.0.0.0".to_string(),
            server_port: 8001,
            log_level: "info".to_string(),
            environment: Environment::Development,
        };
        settings.validate_credentials()?;
        Ok(settings)
    }

    /// Load settings from environment variables.
    ///
    /// `FALCON_CLIENT_ID` and `FALCON_CLIENT_SECRET` are required except
    /// in demo mode, where the mock provider never authenticates.
    pub fn from_env() -> Result<Self> {
        let environment = match std::env::var("ENVIRONMENT") {
            Ok(value) => value.parse()?,
            Err(_) => Environment::Development,
        };

        let client_id = env_or_default("FALCON_CLIENT_ID", environment)?;
        let client_secret = env_or_default("FALCON_CLIENT_SECRET", environment)?;

        let base_url = std::env::var("FALCON_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let server_port = match std::env::var("SERVER_PORT") {
            Ok(raw) => raw.parse::<u16>().ok().filter(|p| *p != 0).ok_or_else(|| {
                FalconError::configuration(
                    "SERVER_PORT",
                    format!("'{raw}' is not a valid port (expected 1-65535)"),
                )
            })?,
            Err(_) => 8001,
        };

        let settings = Self {
            client_id: Secret::new(client_id),
            client_secret: Secret::new(client_secret),
            base_url: normalize_base_url(base_url)?,
            server_host: std::env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port,
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            environment,
        };

        if environment != Environment::Demo {
            settings.validate_credentials()?;
        }

        Ok(settings)
    }

    fn validate_credentials(&self) -> Result<()> {
        for (field, secret) in [
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
        ] {
            let value = secret.expose().to_ascii_lowercase();
            if PLACEHOLDER_CREDENTIALS.contains(&value.as_str()) {
                return Err(FalconError::configuration(
                    field,
                    "credential appears to be a placeholder; provide actual Falcon API credentials",
                ));
            }
        }
        Ok(())
    }
}

fn env_or_default(key: &str, environment: Environment) -> Result<String> {
    match std::env::var(key) {
        Ok(value) => Ok(value),
        Err(_) if environment == Environment::Demo => Ok("demo".to_string()),
        Err(_) => Err(FalconError::configuration(
            key,
            "required environment variable is not set",
        )),
    }
}

fn normalize_base_url(url: String) -> Result<String> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(FalconError::configuration(
            "base_url",
            format!("'{url}' must start with http:// or https://"),
        ));
    }
    if !url.starts_with("https://") {
        tracing::warn!(base_url = %url, "base URL does not use HTTPS - this is insecure");
    }
    Ok(url.trim_end_matches('/').to_string())
}
