//! Configuration for bearer-token authentication.

use core_config::{ConfigError, FromEnv, env_required};

/// Shared API key clients must present as `Authorization: Bearer <key>`.
///
/// Loaded from `SERVER_API_KEY` (required, non-blank).
#[derive(Clone)]
pub struct AuthConfig {
    pub api_key: String,
}

impl AuthConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl FromEnv for AuthConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let api_key = env_required("SERVER_API_KEY")?;

        if api_key.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "SERVER_API_KEY".to_string(),
                details: "must not be blank".to_string(),
            });
        }

        Ok(Self { api_key })
    }
}
