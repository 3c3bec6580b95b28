use std::fmt;

use crate::ConfigError;

/// Environment variable consulted when no key is typed in.
pub const API_KEY_ENV: &str = "GROQ_API_KEY";

/// Secret for the hosted model API. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

impl Credential {
    /// Value of [`API_KEY_ENV`], after loading a `.env` file if one exists.
    pub fn from_env() -> Option<String> {
        dotenvy::dotenv().ok();
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    /// Resolves typed input, falling back to the environment.
    pub fn resolve(input: Option<&str>) -> Result<Self, ConfigError> {
        Self::resolve_with(input, Self::from_env())
    }

    pub fn resolve_with(input: Option<&str>, fallback: Option<String>) -> Result<Self, ConfigError> {
        input
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .or_else(|| fallback.map(|key| key.trim().to_string()))
            .filter(|key| !key.is_empty())
            .map(Credential)
            .ok_or(ConfigError::MissingCredential)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}
