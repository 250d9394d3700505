//! Configuration loader with multi-source merging

use crate::{AttrgateConfig, ConfigFile};
use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Configuration loader with builder pattern
pub struct ConfigLoader {
    project_dir: PathBuf,
    env_prefix: String,
    include_user_config: bool,
}

impl ConfigLoader {
    /// Create a new config loader with default project directory (current dir)
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "ATTRGATE".to_string(),
            include_user_config: true,
        }
    }

    /// Set the project directory
    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the environment variable prefix (default: "ATTRGATE")
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Skip ~/.config/attrgate/config.toml (hermetic runs and tests)
    pub fn without_user_config(mut self) -> Self {
        self.include_user_config = false;
        self
    }

    /// Load configuration from all sources with proper precedence
    pub fn load(self) -> Result<AttrgateConfig> {
        let mut builder = config::Config::builder();

        // 1. Start with built-in defaults
        let defaults = AttrgateConfig::default();
        builder = builder.add_source(config::Config::try_from(&defaults)?);

        // 2-4. User, project and local files, later layers overriding earlier
        for layer in ConfigFile::LAYERS {
            if layer == ConfigFile::User && !self.include_user_config {
                continue;
            }
            // No home directory means no user layer.
            let Ok(path) = layer.locate(&self.project_dir) else {
                continue;
            };
            if path.exists() {
                builder = builder.add_source(
                    config::File::from(path)
                        .required(false)
                        .format(config::FileFormat::Toml),
                );
            }
        }

        // 5. Environment variables (ATTRGATE_PIPELINE__MAX_RECORD_BYTES=...)
        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // Build and deserialize
        let config = builder.build().context("Failed to build configuration")?;

        let mut attrgate_config: AttrgateConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        // Resolve relative paths
        attrgate_config.resolve_paths(&self.project_dir);
        attrgate_config
            .validate()
            .context("Configuration failed validation")?;

        Ok(attrgate_config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
