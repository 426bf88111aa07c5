//! Storage configuration.
//!
//! The backend is chosen once, at startup, from environment-style settings.
//! `HBNB_TYPE_STORAGE=db` selects the relational backend; anything else
//! (including absence) selects the JSON snapshot. Relational connection
//! parameters are never defaulted except the port.

use crate::error::ConfigError;
use std::path::PathBuf;

/// Selects the relational backend when set to [`DB_STORAGE`].
pub const ENV_TYPE_STORAGE: &str = "HBNB_TYPE_STORAGE";
/// Snapshot file path.
pub const ENV_FILE_PATH: &str = "HBNB_FILE_PATH";
/// Database host.
pub const ENV_HOST: &str = "HBNB_MYSQL_HOST";
/// Database port.
pub const ENV_PORT: &str = "HBNB_MYSQL_PORT";
/// Database user.
pub const ENV_USER: &str = "HBNB_MYSQL_USER";
/// Database password.
pub const ENV_PASSWORD: &str = "HBNB_MYSQL_PWD";
/// Database name.
pub const ENV_DATABASE: &str = "HBNB_MYSQL_DB";
/// Environment name; `test` drops all tables on startup.
pub const ENV_MODE: &str = "HBNB_ENV";

/// Value of [`ENV_TYPE_STORAGE`] selecting the relational backend.
pub const DB_STORAGE: &str = "db";

/// Default snapshot file.
pub const DEFAULT_FILE_PATH: &str = "file.json";

/// Default database port.
pub const DEFAULT_PORT: u16 = 3306;

/// Database name that keeps everything in memory.
pub const MEMORY_DATABASE: &str = ":memory:";

/// Which backend to build, with its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    /// JSON snapshot at a file path.
    Snapshot {
        /// Backing file.
        path: PathBuf,
    },
    /// Relational database.
    Relational(RelationalConfig),
}

/// Connection parameters for the relational backend.
#[derive(Clone, PartialEq, Eq)]
pub struct RelationalConfig {
    /// Database host.
    pub host: String,
    /// Database port.
    pub port: u16,
    /// Database user.
    pub user: String,
    /// Database password.
    pub password: String,
    /// Database name.
    pub database: String,
    /// Drop every table before the first session.
    pub test_mode: bool,
}

impl std::fmt::Debug for RelationalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationalConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .field("test_mode", &self.test_mode)
            .finish()
    }
}

impl RelationalConfig {
    /// Returns the file the embedded engine opens for this database, or
    /// `None` for an in-memory database.
    ///
    /// A name without an extension gets `.db` appended.
    #[must_use]
    pub fn database_path(&self) -> Option<PathBuf> {
        if self.database == MEMORY_DATABASE {
            return None;
        }
        let path = PathBuf::from(&self.database);
        if path.extension().is_some() {
            Some(path)
        } else {
            Some(path.with_extension("db"))
        }
    }
}

impl StorageConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the relational backend is selected and a
    /// connection parameter is missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through an arbitrary lookup.
    ///
    /// Empty values count as absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the relational backend is selected and a
    /// connection parameter is missing or invalid.
    ///
    /// # Examples
    ///
    /// ```
    /// use hbnb_store::config::StorageConfig;
    ///
    /// let config = StorageConfig::from_lookup(|_| None).unwrap();
    /// assert!(matches!(config, StorageConfig::Snapshot { .. }));
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if get(ENV_TYPE_STORAGE).as_deref() != Some(DB_STORAGE) {
            let path = get(ENV_FILE_PATH).unwrap_or_else(|| DEFAULT_FILE_PATH.to_string());
            return Ok(Self::Snapshot {
                path: PathBuf::from(path),
            });
        }

        let require = |name: &'static str| get(name).ok_or(ConfigError::Missing { name });

        let port = match get(ENV_PORT) {
            None => DEFAULT_PORT,
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name: ENV_PORT,
                value: raw,
            })?,
        };

        Ok(Self::Relational(RelationalConfig {
            host: require(ENV_HOST)?,
            port,
            user: require(ENV_USER)?,
            password: require(ENV_PASSWORD)?,
            database: require(ENV_DATABASE)?,
            test_mode: get(ENV_MODE).as_deref() == Some("test"),
        }))
    }
}
