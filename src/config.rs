use crate::error::{Error, Result};
use std::env;

/// Environment variable holding the catalog API key.
pub const GOOGLE_APPKEY: &str = "GOOGLE_APPKEY";
/// Environment variable holding the backend store connection string.
pub const DATABASE_URL: &str = "DATABASE_URL";

/// Injected service configuration, resolved once at process start and
/// passed explicitly to the adapters that need it.
#[derive(Debug, Clone)]
pub struct Config {
    pub google_appkey: String,
    pub database_url: String,
}

impl Config {
    /// Reads both credentials from the environment. A missing or empty
    /// value fails here, at startup, rather than on the first call.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            google_appkey: require(GOOGLE_APPKEY)?,
            database_url: require(DATABASE_URL)?,
        })
    }
}

fn require(name: &str) -> Result<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(Error::Config(name.to_string())),
    }
}
