//! Configuration Loader
//!
//! Environment-aware loading built on the `config` crate. Sources are
//! merged lowest to highest:
//!
//! 1. [`HealthCheckConfig::default`]
//! 2. `<dir>/healthcheck.toml` (optional)
//! 3. `<dir>/healthcheck.<environment>.toml` (optional)
//! 4. `HEALTHCHECK__SECTION__KEY` environment variables

use super::error::{ConfigResult, ConfigurationError};
use super::HealthCheckConfig;
use config::{Config, Environment, File};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const BASE_FILE_STEM: &str = "healthcheck";
const ENV_PREFIX: &str = "HEALTHCHECK";

pub struct ConfigManager {
    config: HealthCheckConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load from `./config` with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(PathBuf::from("config"), &Self::detect_environment())
    }

    /// Load `healthcheck.toml` and `healthcheck.<environment>.toml` from
    /// `config_directory`; either may be absent
    pub fn load_from_directory(
        config_directory: impl Into<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_directory.into();
        let base = config_directory.join(format!("{BASE_FILE_STEM}.toml"));
        let overlay = config_directory.join(format!("{BASE_FILE_STEM}.{environment}.toml"));

        let config = Self::build(&[(base, false), (overlay, false)], environment)?;
        Ok(Arc::new(Self::finish(config, environment, config_directory)?))
    }

    /// Load an explicit file, which must exist, plus its optional
    /// `<stem>.<environment>.<ext>` sibling
    pub fn load_from_file(path: impl AsRef<Path>, environment: &str) -> ConfigResult<Arc<ConfigManager>> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConfigurationError::config_file_not_found(path));
        }

        let config_directory = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(BASE_FILE_STEM);
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
        let overlay = config_directory.join(format!("{stem}.{environment}.{extension}"));

        let config = Self::build(&[(path.to_path_buf(), true), (overlay, false)], environment)?;
        Ok(Arc::new(Self::finish(config, environment, config_directory)?))
    }

    fn build(files: &[(PathBuf, bool)], environment: &str) -> ConfigResult<HealthCheckConfig> {
        let defaults = Config::try_from(&HealthCheckConfig::default())
            .map_err(|e| ConfigurationError::load_error("defaults", e))?;

        let mut builder = Config::builder().add_source(defaults);
        for (file, required) in files {
            debug!(path = %file.display(), required, exists = file.is_file(), "Adding configuration source");
            builder = builder.add_source(File::from(file.as_path()).required(*required));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let mut config: HealthCheckConfig = builder
            .build()
            .and_then(|built| built.try_deserialize())
            .map_err(|e| ConfigurationError::load_error(format!("environment '{environment}'"), e))?;

        config.environment = environment.to_string();
        Ok(config)
    }

    fn finish(
        config: HealthCheckConfig,
        environment: &str,
        config_directory: PathBuf,
    ) -> ConfigResult<ConfigManager> {
        config.validate()?;

        info!(
            environment = %environment,
            config_directory = %config_directory.display(),
            version = %config.registry.version,
            cache_ttl_ms = config.registry.cache_ttl_ms,
            metrics_backend = ?config.metrics.backend,
            checks = config.checks.len(),
            "Configuration loaded successfully"
        );

        Ok(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        })
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &HealthCheckConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// HEALTHCHECK_ENV || APP_ENV || 'development', lowercased
    pub fn detect_environment() -> String {
        Self::resolve_environment(env::var("HEALTHCHECK_ENV").ok(), env::var("APP_ENV").ok())
    }

    pub fn resolve_environment(healthcheck_env: Option<String>, app_env: Option<String>) -> String {
        healthcheck_env
            .or(app_env)
            .unwrap_or_else(|| "development".to_string())
            .to_lowercase()
    }
}
