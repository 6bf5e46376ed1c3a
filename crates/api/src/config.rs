//! Layered runtime settings: built-in defaults, then `config/stockroom.*`
//! when present, then `STOCKROOM__*` environment variables.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub auth: AuthSettings,
    pub admin: AdminSettings,
    pub otp: OtpSettings,
    pub seed_demo_data: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Sent back as `Access-Control-Allow-Origin`.
    pub allowed_origin: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSettings {
    /// HS256 signing secret. Empty means "use the development secret".
    pub jwt_secret: String,
    pub token_ttl_minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminSettings {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpSettings {
    pub expiry_minutes: i64,
    pub max_attempts: u32,
    pub max_daily_requests: usize,
}

pub const DEV_JWT_SECRET: &str = "stockroom-dev-secret";

impl Settings {
    pub fn load() -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Settings::default())?)
            .add_source(config::File::with_name("config/stockroom").required(false))
            .add_source(
                config::Environment::with_prefix("STOCKROOM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn jwt_secret(&self) -> &str {
        if self.auth.jwt_secret.is_empty() {
            tracing::warn!("auth.jwt_secret not set; using insecure dev default");
            DEV_JWT_SECRET
        } else {
            &self.auth.jwt_secret
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "0.0.0.0".to_string(),
                port: 8888,
                allowed_origin: "*".to_string(),
            },
            auth: AuthSettings {
                jwt_secret: String::new(),
                token_ttl_minutes: 24 * 60,
            },
            admin: AdminSettings {
                username: "admin".to_string(),
                email: "admin@stockroom.local".to_string(),
                password: "admin123".to_string(),
            },
            otp: OtpSettings {
                expiry_minutes: 10,
                max_attempts: 3,
                max_daily_requests: 5,
            },
            seed_demo_data: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_survive_the_config_round_trip() {
        let built: Settings = config::Config::builder()
            .add_source(config::Config::try_from(&Settings::default()).unwrap())
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(built, Settings::default());
        assert_eq!(built.bind_address(), "0.0.0.0:8888");
    }

    #[test]
    fn empty_secret_falls_back_to_dev_secret() {
        let mut settings = Settings::default();
        assert_eq!(settings.jwt_secret(), DEV_JWT_SECRET);
        settings.auth.jwt_secret = "s3cret".to_string();
        assert_eq!(settings.jwt_secret(), "s3cret");
    }
}
