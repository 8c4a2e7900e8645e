use crate::KilogError;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variables understood without the `KILOG_` prefix, mapped to
/// their nested config key.
const FLAT_ENV_KEYS: &[(&str, &str)] = &[
    ("DATABASE_URL", "data.db_url"),
    ("JWT_KEY", "auth.jwt_key"),
    ("CLERK_WEBHOOK_SECRET", "auth.clerk_webhook_secret"),
    ("PROJECT_NAME", "app.project_name"),
    ("ENVIRONMENT", "app.environment"),
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub data: DataConfig,
    pub auth: AuthConfig,
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub max_request_body_size_mb: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DataConfig {
    pub db_url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// HS256 key used to verify bearer tokens.
    pub jwt_key: String,
    /// `whsec_`-prefixed signing secret for identity-provider webhooks.
    pub clerk_webhook_secret: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub project_name: String,
    pub environment: String,
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind: "0.0.0.0".to_string(),
                port: 8000,
                cors_origins: vec!["http://localhost:5173".to_string()],
                max_request_body_size_mb: 2,
            },
            data: DataConfig {
                db_url: "sqlite://data/kilog.db".to_string(),
                max_connections: 5,
            },
            auth: AuthConfig {
                jwt_key: String::new(),
                clerk_webhook_secret: None,
            },
            app: AppConfig {
                project_name: "Kilog".to_string(),
                environment: "development".to_string(),
                debug: true,
            },
        }
    }
}

impl Config {
    /// Layers defaults, an optional TOML file, then the environment.
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }

        let flat = Env::raw()
            .only(&FLAT_ENV_KEYS.iter().map(|(k, _)| *k).collect::<Vec<_>>())
            .map(|key| {
                FLAT_ENV_KEYS
                    .iter()
                    .find(|(k, _)| key.as_str().eq_ignore_ascii_case(k))
                    .map(|(_, nested)| (*nested).into())
                    .unwrap_or_else(|| key.as_str().into())
            });

        figment
            .merge(flat)
            .merge(Env::prefixed("KILOG_").split("__"))
    }

    pub fn load(path: Option<&Path>) -> Result<Self, KilogError> {
        let config: Config = Self::figment(path)
            .extract()
            .map_err(|e| KilogError::Config { reason: e.to_string() })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), KilogError> {
        if self.auth.jwt_key.trim().is_empty() {
            return Err(KilogError::Config {
                reason: "auth.jwt_key (JWT_KEY) must be set".to_string(),
            });
        }
        if let Some(secret) = &self.auth.clerk_webhook_secret {
            if !secret.starts_with("whsec_") {
                return Err(KilogError::Config {
                    reason: "auth.clerk_webhook_secret must start with 'whsec_'".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.app.environment.eq_ignore_ascii_case("production")
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.bind, self.server.port)
    }
}
