use std::{env, net::{IpAddr, SocketAddr}, path::PathBuf, str::FromStr, time::Duration};

use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Sqlite,
    File,
}

impl FromStr for StorageBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StorageBackend::Sqlite),
            "file" => Ok(StorageBackend::File),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub storage: StorageBackend,
    pub database_url: String,
    pub data_dir: PathBuf,
    pub host: IpAddr,
    pub port: u16,
    /// Background reconcile period. `None` disables the scheduler.
    pub reconcile_interval: Option<Duration>,
}

impl AppConfig {
    pub fn new_from_env() -> Result<Self, ConfigError> {
        let interval_secs: u64 = parse_var("RECONCILE_INTERVAL_SECS", "0")?;

        Ok(Self {
            storage: parse_var("STORAGE_BACKEND", "sqlite")?,
            database_url: var_or("DATABASE_URL", "sqlite://registration.db?mode=rwc"),
            data_dir: PathBuf::from(var_or("DATA_DIR", "data")),
            host: parse_var("HOST", "127.0.0.1")?,
            port: parse_var("PORT", "3000")?,
            reconcile_interval: (interval_secs > 0).then(|| Duration::from_secs(interval_secs)),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    })
}

fn parse_var<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError> {
    let value = var_or(key, default);
    value
        .parse()
        .map_err(|_| ConfigError::Invalid { key, value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_backend_parsing() {
        assert_eq!("sqlite".parse::<StorageBackend>(), Ok(StorageBackend::Sqlite));
        assert_eq!(" FILE ".parse::<StorageBackend>(), Ok(StorageBackend::File));
        assert!("mongo".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn test_parse_var_falls_back_to_default() {
        let port: u16 = parse_var("COURSE_REGISTRATION_TEST_UNSET_PORT", "3000").unwrap();
        assert_eq!(port, 3000);
    }

    #[test]
    fn test_parse_var_rejects_garbage_default() {
        let err = parse_var::<u16>("COURSE_REGISTRATION_TEST_UNSET_PORT", "not-a-port").unwrap_err();
        assert!(err.to_string().contains("COURSE_REGISTRATION_TEST_UNSET_PORT"));
    }
}
