//! Process configuration, read once at startup.

use std::num::ParseIntError;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} is not a valid number: '{value}' ({source})")]
    InvalidNumber {
        name: &'static str,
        value: String,
        source: ParseIntError,
    },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub max_connections: u32,
    /// `None` allows any origin.
    pub cors_origins: Option<Vec<String>>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let port = match get("PORT") {
            Some(raw) => parse_number::<u16>("PORT", raw)?,
            None => DEFAULT_PORT,
        };

        let max_connections = match get("ANVAYA_DB_MAX_CONNECTIONS") {
            Some(raw) => parse_number::<u32>("ANVAYA_DB_MAX_CONNECTIONS", raw)?,
            None => DEFAULT_MAX_CONNECTIONS,
        };
        if max_connections == 0 {
            return Err(ConfigError::Zero("ANVAYA_DB_MAX_CONNECTIONS"));
        }

        let cors_origins = get("ANVAYA_CORS_ORIGINS").map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        });

        Ok(Self {
            database_url,
            port,
            max_connections,
            cors_origins: cors_origins.filter(|o| !o.is_empty()),
        })
    }
}

fn parse_number<T>(name: &'static str, raw: String) -> Result<T, ConfigError>
where
    T: std::str::FromStr<Err = ParseIntError>,
{
    raw.parse::<T>()
        .map_err(|source| ConfigError::InvalidNumber {
            name,
            value: raw,
            source,
        })
}
