// src/config/mod.rs
mod schema;

use std::path::{Path, PathBuf};
use config::{Config as ConfigLoader, FileFormat};
use tracing::{info, warn};

pub use schema::{Config, ExecutorConfig, LoggingConfig, ShellConfig};

use crate::error::{AppResult, AppError};

/// Centralized configuration handling
impl Config {
    /// Load configuration from built-in defaults, a config file and the environment
    pub fn load(config_path: Option<&Path>) -> AppResult<Self> {
        info!("Loading configuration");

        let mut config_builder = ConfigLoader::builder();

        // Default configuration
        config_builder = config_builder.add_source(
            config::File::from_str(
                include_str!("../../config/default.toml"),
                FileFormat::Toml
            )
        );

        // User-provided configuration
        if let Some(path) = config_path {
            if path.exists() {
                config_builder = config_builder.add_source(config::File::from(path));
                info!("Loading user configuration from: {}", path.display());
            } else {
                warn!("Specified configuration file not found: {}", path.display());
            }
        } else {
            let default_path = Self::default_config_path();
            if default_path.exists() {
                config_builder = config_builder.add_source(config::File::from(default_path.as_path()));
                info!("Loading default configuration from: {}", default_path.display());
            } else {
                info!("No existing configuration found, using built-in defaults");
            }
        }

        // Environment variables, e.g. THROTTLE__EXECUTOR__MAX_CONCURRENT_TASKS=8
        config_builder = config_builder.add_source(
            config::Environment::with_prefix("THROTTLE")
                .prefix_separator("__")
                .separator("__")
        );

        let config: Config = config_builder
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to build configuration: {}", e)))?
            .try_deserialize()
            .map_err(|e| AppError::ConfigError(format!("Failed to parse configuration: {}", e)))?;

        Ok(config)
    }

    /// Get the default configuration path
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".throttle/config.toml")
    }

    /// Write the default configuration to `path`, or the default location
    pub fn init(path: Option<&Path>, force: bool) -> AppResult<PathBuf> {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::default_config_path);

        if config_path.exists() && !force {
            return Err(AppError::ConfigError(
                format!("Configuration already exists at {}. Use --force to overwrite.", config_path.display())
            ));
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::FileError {
                    path: parent.to_path_buf(),
                    message: format!("Failed to create directory: {}", e),
                })?;
        }

        Config::default().save(&config_path)?;

        Ok(config_path)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> AppResult<()> {
        let config_str = toml::to_string_pretty(self)
            .map_err(|e| AppError::SerializationError(format!("Failed to serialize configuration: {}", e)))?;

        std::fs::write(path, config_str)
            .map_err(|e| AppError::FileError {
                path: path.to_path_buf(),
                message: format!("Failed to write configuration: {}", e),
            })?;

        info!("Configuration saved to {}", path.display());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::Arc;
    use parking_lot::Mutex;

    /// Collects formatted log output in memory
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_user_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[executor]\nmax_concurrent_tasks = 9\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();

        assert_eq!(config.executor.max_concurrent_tasks, 9);
        assert!(config.executor.fail_fast);
        assert_eq!(config.shell.program, "sh");
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(&dir.path().join("absent.toml"))).unwrap();

        assert_eq!(config.shell.timeout_seconds, Some(300));
        assert_eq!(config.executor.max_concurrent_tasks, 4);
    }

    #[test]
    fn test_missing_file_is_reported_as_warning() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();

        let loaded = tracing::subscriber::with_default(subscriber, || Config::load(Some(&missing)));

        assert!(loaded.is_ok());
        let output = logs.contents();
        assert!(output.contains("WARN"), "no warning in {output:?}");
        assert!(output.contains("Specified configuration file not found"));
        assert!(output.contains("absent.toml"));
    }

    #[test]
    fn test_environment_overrides_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[logging]\nlevel = \"warn\"\n").unwrap();

        std::env::set_var("THROTTLE__LOGGING__LEVEL", "trace");
        let loaded = Config::load(Some(&path));
        std::env::remove_var("THROTTLE__LOGGING__LEVEL");

        let config = loaded.unwrap();
        assert_eq!(config.logging.level, "trace");
        assert_eq!(config.logging.tracing_level(), tracing::Level::TRACE);
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");

        let written = Config::init(Some(&path), false).unwrap();
        assert_eq!(written, path);

        let reloaded = Config::load(Some(&path)).unwrap();
        assert_eq!(reloaded.executor.max_concurrent_tasks, 4);

        assert!(matches!(Config::init(Some(&path), false), Err(AppError::ConfigError(_))));
        assert!(Config::init(Some(&path), true).is_ok());
    }

    #[test]
    fn test_zero_limit_means_one_slot_per_cpu() {
        let executor = ExecutorConfig {
            max_concurrent_tasks: 0,
            fail_fast: false,
        };
        assert_eq!(executor.resolved_limit(), num_cpus::get());
    }
}
