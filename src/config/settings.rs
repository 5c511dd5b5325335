//! Process settings from environment variables (a `.env` file is loaded by the binary first).

use crate::error::ConfigError;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    pub database_max_connections: u32,
    pub bind_addr: String,
    /// Deployment environment reported by `/app/info` (dev, test, prod).
    pub environment: String,
    pub app_name: String,
    pub app_description: String,
    /// Catalog definition file; the embedded catalog is used when unset.
    pub catalog_path: Option<PathBuf>,
    pub media_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let string = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());
        Ok(Settings {
            database_url: string("DATABASE_URL", "postgres://localhost/catalog"),
            database_max_connections: parse_number(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?,
            bind_addr: string("BIND_ADDR", "0.0.0.0:3000"),
            environment: string("APP_ENV", "dev"),
            app_name: string("APP_NAME", "Beaupeyratheque API"),
            app_description: string(
                "APP_DESCRIPTION",
                "Library catalog API: books, authors and reviews",
            ),
            catalog_path: lookup("CATALOG_CONFIG")
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            media_dir: PathBuf::from(string("MEDIA_DIR", "media")),
            max_upload_bytes: parse_number(&lookup, "MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
        })
    }
}

fn parse_number<F, N>(lookup: &F, name: &'static str, default: N) -> Result<N, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    N: std::str::FromStr,
    N::Err: std::fmt::Display,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: N::Err| ConfigError::Setting {
            name,
            message: format!("'{}': {}", raw, e),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.database_url, "postgres://localhost/catalog");
        assert_eq!(s.bind_addr, "0.0.0.0:3000");
        assert_eq!(s.environment, "dev");
        assert_eq!(s.database_max_connections, 5);
        assert_eq!(s.max_upload_bytes, 10 * 1024 * 1024);
        assert!(s.catalog_path.is_none());
    }

    #[test]
    fn reads_overrides() {
        let s = settings(&[
            ("APP_ENV", "prod"),
            ("DATABASE_MAX_CONNECTIONS", "12"),
            ("CATALOG_CONFIG", "/etc/catalog.json"),
        ])
        .unwrap();
        assert_eq!(s.environment, "prod");
        assert_eq!(s.database_max_connections, 12);
        assert_eq!(s.catalog_path, Some(PathBuf::from("/etc/catalog.json")));
    }

    #[test]
    fn malformed_number_is_an_error() {
        assert_matches!(
            settings(&[("MAX_UPLOAD_BYTES", "lots")]),
            Err(ConfigError::Setting { name: "MAX_UPLOAD_BYTES", .. })
        );
    }
}
