//! Config file layers and where to find them

use crate::ConfigError;
use directories::ProjectDirs;
use std::fmt;
use std::path::{Path, PathBuf};

/// One file layer of the configuration, ordered lowest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigFile {
    /// `~/.config/attrgate/config.toml` (per-user defaults)
    User,
    /// `attrgate.toml` in the project directory
    Project,
    /// `attrgate.local.toml`, the uncommitted per-checkout override
    Local,
}

impl ConfigFile {
    /// All layers in merge order.
    pub const LAYERS: [ConfigFile; 3] = [Self::User, Self::Project, Self::Local];

    pub const fn file_name(self) -> &'static str {
        match self {
            Self::User => "config.toml",
            Self::Project => "attrgate.toml",
            Self::Local => "attrgate.local.toml",
        }
    }

    /// Resolves the layer's path. Only the user layer can fail, when the
    /// platform has no home directory.
    pub fn locate(self, project_dir: &Path) -> Result<PathBuf, ConfigError> {
        match self {
            Self::User => ProjectDirs::from("com", "Attrgate", "attrgate")
                .map(|dirs| dirs.config_dir().join(self.file_name()))
                .ok_or_else(|| {
                    ConfigError::XdgError("no home directory for user config".to_string())
                }),
            Self::Project | Self::Local => Ok(project_dir.join(self.file_name())),
        }
    }
}

impl fmt::Display for ConfigFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::User => "user",
            Self::Project => "project",
            Self::Local => "local",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_layers_ordered_by_precedence() {
        let mut sorted = ConfigFile::LAYERS;
        sorted.sort();
        assert_eq!(sorted, ConfigFile::LAYERS);
        assert_eq!(ConfigFile::LAYERS.last(), Some(&ConfigFile::Local));
    }

    #[test]
    fn test_project_layers_live_in_project_dir() {
        let dir = tempdir().unwrap();

        let project = ConfigFile::Project.locate(dir.path()).unwrap();
        let local = ConfigFile::Local.locate(dir.path()).unwrap();

        assert_eq!(project, dir.path().join("attrgate.toml"));
        assert_eq!(local, dir.path().join("attrgate.local.toml"));
    }

    #[test]
    fn test_user_layer_ignores_project_dir() {
        let dir = tempdir().unwrap();

        // Discovery depends on the platform; check the shape when it works.
        if let Ok(user) = ConfigFile::User.locate(dir.path()) {
            assert!(!user.starts_with(dir.path()));
            assert!(user.ends_with("config.toml"));
            assert!(user.to_string_lossy().contains("attrgate"));
        }
    }
}
