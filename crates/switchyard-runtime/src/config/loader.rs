//! Layered configuration loading.
//!
//! Later sources override earlier ones:
//!
//! 1. [`SwitchyardConfig::default`]
//! 2. `switchyard.<profile>.<ext>`, when it sits next to a main file
//! 3. `switchyard.<ext>`
//! 4. `SWITCHYARD_*` environment variables, `__` separating nested keys
//!    (`SWITCHYARD_DISPATCH__HANDLER_TIMEOUT_MS=500`)
//! 5. Values passed to [`ConfigLoader::merge`]
//!
//! Which extensions are searched depends on the `toml-config` (default) and
//! `yaml-config` features. Directories are searched in order and the first
//! one holding a main file supplies every file that gets merged.
//!
//! ```rust,ignore
//! let config = ConfigLoader::new()
//!     .profile("production")
//!     .search_path("/etc/menu-bot")
//!     .load()?;
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "toml-config", feature = "yaml-config"))]
use figment::providers::Format;
use figment::providers::{Env, Serialized};
use tracing::{debug, info};

use super::error::{ConfigError, ConfigResult};
use super::schema::SwitchyardConfig;

const FILE_STEM: &str = "switchyard";
const ENV_PREFIX: &str = "SWITCHYARD_";
const PROFILE_VAR: &str = "SWITCHYARD_PROFILE";

/// Extensions searched during discovery, in merge order.
const EXTENSIONS: &[&str] = &[
    #[cfg(feature = "toml-config")]
    "toml",
    #[cfg(feature = "yaml-config")]
    "yaml",
    #[cfg(feature = "yaml-config")]
    "yml",
];

/// A file format compiled into this build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    #[cfg(feature = "toml-config")]
    Toml,
    #[cfg(feature = "yaml-config")]
    Yaml,
}

impl FileFormat {
    fn of(path: &Path) -> ConfigResult<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        match ext {
            #[cfg(feature = "toml-config")]
            "toml" => Ok(Self::Toml),
            #[cfg(feature = "yaml-config")]
            "yaml" | "yml" => Ok(Self::Yaml),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }

    fn merge_into(self, figment: Figment, path: &Path) -> Figment {
        match self {
            #[cfg(feature = "toml-config")]
            Self::Toml => figment.merge(figment::providers::Toml::file(path)),
            #[cfg(feature = "yaml-config")]
            Self::Yaml => figment.merge(figment::providers::Yaml::file(path)),
        }
    }
}

/// Selects the `switchyard.<profile>.<ext>` overlay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    /// `development`, selected when no profile is given.
    #[default]
    Development,
    /// `production`.
    Production,
    /// Any other name, stored lowercase.
    Custom(String),
}

impl Profile {
    /// Returns the name used in overlay file names.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Case-insensitive; `dev` and `prod` are accepted as shorthands.
    pub fn parse(name: &str) -> Self {
        let name = name.trim().to_lowercase();
        match name.as_str() {
            "dev" | "development" => Self::Development,
            "prod" | "production" => Self::Production,
            _ => Self::Custom(name),
        }
    }

    /// Reads `SWITCHYARD_PROFILE`. Unset means development.
    pub fn from_env() -> Self {
        match std::env::var(PROFILE_VAR) {
            Ok(name) => Self::parse(&name),
            Err(_) => Self::default(),
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds a [`SwitchyardConfig`] from defaults, files, environment and overrides.
pub struct ConfigLoader {
    profile: Profile,
    search_paths: Vec<PathBuf>,
    config_file: Option<PathBuf>,
    load_env: bool,
    overrides: Figment,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a loader using the profile from `SWITCHYARD_PROFILE`.
    ///
    /// Without explicit search paths, discovery looks in the current
    /// directory and then in the user config directory.
    pub fn new() -> Self {
        Self {
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            config_file: None,
            load_env: true,
            overrides: Figment::new(),
        }
    }

    /// Selects the profile overlay, parsed like [`Profile::parse`].
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::parse(profile.as_ref());
        self
    }

    /// Appends a directory to search.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Appends the current working directory, if it can be read.
    pub fn with_current_dir(self) -> Self {
        match std::env::current_dir() {
            Ok(cwd) => self.search_path(cwd),
            Err(_) => self,
        }
    }

    /// Appends `<user config dir>/switchyard`.
    pub fn with_user_config_dir(self) -> Self {
        match dirs::config_dir() {
            Some(dir) => self.search_path(dir.join(FILE_STEM)),
            None => self,
        }
    }

    /// Loads exactly this file instead of searching. It must exist.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Reads `SWITCHYARD_*` variables. This is the default.
    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Ignores the environment, for reproducible loads.
    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Layers `config` above every other source.
    pub fn merge(mut self, config: SwitchyardConfig) -> Self {
        self.overrides = self.overrides.merge(Serialized::defaults(config));
        self
    }

    /// Merges every source and extracts the result.
    ///
    /// Fails when an explicit file is missing or has an unsupported
    /// extension, or when the merged values do not fit the schema.
    pub fn load(self) -> ConfigResult<SwitchyardConfig> {
        let files = match &self.config_file {
            Some(path) if !path.exists() => return Err(ConfigError::FileNotFound(path.clone())),
            Some(path) => vec![path.clone()],
            None => self.discover(),
        };

        let mut figment = Figment::from(Serialized::defaults(SwitchyardConfig::default()));
        for path in &files {
            let format = FileFormat::of(path)?;
            info!(path = %path.display(), "Loading configuration file");
            figment = format.merge_into(figment, path);
        }
        if files.is_empty() {
            debug!("No configuration file found, using defaults");
        }

        if self.load_env {
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }

        let config: SwitchyardConfig = figment.merge(self.overrides).extract()?;
        debug!(profile = %self.profile, files = files.len(), "Configuration loaded");
        Ok(config)
    }

    fn search_dirs(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        std::env::current_dir()
            .ok()
            .into_iter()
            .chain(dirs::config_dir().map(|dir| dir.join(FILE_STEM)))
            .collect()
    }

    /// Returns the files to merge, lowest precedence first.
    fn discover(&self) -> Vec<PathBuf> {
        for dir in self.search_dirs() {
            let mut files = Vec::new();
            for ext in EXTENSIONS {
                let main = dir.join(format!("{FILE_STEM}.{ext}"));
                if !main.is_file() {
                    continue;
                }
                let overlay = dir.join(format!("{FILE_STEM}.{}.{ext}", self.profile));
                if overlay.is_file() {
                    files.push(overlay);
                }
                files.push(main);
            }
            if !files.is_empty() {
                return files;
            }
        }
        Vec::new()
    }
}

/// Loads configuration from the default locations.
pub fn load_config() -> ConfigResult<SwitchyardConfig> {
    ConfigLoader::new().load()
}

/// Loads one file plus the environment.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<SwitchyardConfig> {
    ConfigLoader::new().file(path).load()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LogLevel;
    use figment::Jail;
    use switchyard_framework::ConflictPolicy;

    #[test]
    fn test_defaults_when_nothing_is_found() {
        Jail::expect_with(|jail| {
            let config = ConfigLoader::new()
                .without_env()
                .search_path(jail.directory())
                .load()
                .map_err(|e| e.to_string())?;
            assert_eq!(config, SwitchyardConfig::default());
            Ok(())
        });
    }

    #[test]
    fn test_profile_parse() {
        assert_eq!(Profile::parse("prod"), Profile::Production);
        assert_eq!(Profile::parse(" DEV "), Profile::Development);
        assert_eq!(Profile::parse("Staging").as_str(), "staging");
    }

    #[test]
    fn test_profile_from_env() {
        Jail::expect_with(|jail| {
            jail.set_env(PROFILE_VAR, "production");
            assert_eq!(Profile::from_env(), Profile::Production);
            Ok(())
        });
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigLoader::new()
            .without_env()
            .file("/definitely/not/here/switchyard.toml")
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_unsupported_extension() {
        Jail::expect_with(|jail| {
            jail.create_file("switchyard.ini", "level = debug")?;
            let err = ConfigLoader::new()
                .without_env()
                .file("switchyard.ini")
                .load()
                .unwrap_err();
            assert!(matches!(err, ConfigError::UnsupportedFormat(ref ext) if ext == "ini"));
            Ok(())
        });
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_layering() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "switchyard.toml",
                r#"
                [logging]
                level = "warn"

                [dispatch]
                handler_timeout_ms = 500
                "#,
            )?;
            jail.create_file(
                "switchyard.production.toml",
                r#"
                [dispatch]
                conflict_policy = "reject"
                "#,
            )?;
            jail.set_env("SWITCHYARD_LOGGING__LEVEL", "debug");

            let config = ConfigLoader::new()
                .profile("production")
                .search_path(jail.directory())
                .load()
                .map_err(|e| e.to_string())?;

            assert_eq!(config.logging.level, LogLevel::Debug);
            assert_eq!(config.dispatch.conflict_policy, ConflictPolicy::Reject);
            assert_eq!(config.dispatch.handler_timeout_ms, Some(500));
            Ok(())
        });
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_overrides_beat_environment() {
        Jail::expect_with(|jail| {
            jail.set_env("SWITCHYARD_LOGGING__LEVEL", "debug");

            let mut overrides = SwitchyardConfig::default();
            overrides.logging.level = LogLevel::Error;

            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .merge(overrides)
                .load()
                .map_err(|e| e.to_string())?;

            assert_eq!(config.logging.level, LogLevel::Error);
            Ok(())
        });
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_overlay_without_main_file_is_ignored() {
        Jail::expect_with(|jail| {
            jail.create_file("switchyard.production.toml", "[logging]\nlevel = \"trace\"")?;

            let config = ConfigLoader::new()
                .without_env()
                .profile("production")
                .search_path(jail.directory())
                .load()
                .map_err(|e| e.to_string())?;

            assert_eq!(config.logging.level, LogLevel::Info);
            Ok(())
        });
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_bad_value_is_parse_error() {
        Jail::expect_with(|jail| {
            jail.create_file("switchyard.toml", "[dispatch]\nconflict_policy = \"maybe\"")?;
            let err = ConfigLoader::new()
                .without_env()
                .search_path(jail.directory())
                .load()
                .unwrap_err();
            assert!(matches!(err, ConfigError::ParseError(_)));
            Ok(())
        });
    }
}
