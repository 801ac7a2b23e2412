//! Configuration file loader with multi-source merging

use super::file_config::{ConfigValidationError, FileConfig};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Project-level config file names, checked in order
pub const PROJECT_CONFIG_FILES: [&str; 2] = ["foreman.toml", ".foreman.toml"];

/// Prefix for environment overrides (`FOREMAN_ENGINE__MAX_ROUNDS=5`)
pub const ENV_PREFIX: &str = "FOREMAN_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read configuration: {0}")]
    Figment(#[from] Box<figment::Error>),

    #[error("invalid configuration:\n  {}", format_issues(.0))]
    Invalid(Vec<ConfigValidationError>),
}

fn format_issues(issues: &[ConfigValidationError]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n  ")
}

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. `FOREMAN_*` environment variables (`__` separates sections)
    /// 2. Explicit config path (if provided; must exist)
    /// 3. Project root: `./foreman.toml` or `./.foreman.toml`
    /// 4. Global: `$XDG_CONFIG_HOME/foreman/config.toml`
    /// 5. Default values
    pub fn load(explicit: Option<&Path>) -> Result<FileConfig, ConfigError> {
        let global = Self::global_config_path();
        let figment = Self::layered(explicit, global.as_deref(), Path::new("."))?;
        Self::extract(figment)
    }

    /// Build the merged figment without extracting it.
    pub fn layered(
        explicit: Option<&Path>,
        global: Option<&Path>,
        project_dir: &Path,
    ) -> Result<Figment, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));

        if let Some(global) = global.filter(|p| p.is_file()) {
            figment = figment.merge(Toml::file(global));
        }

        if let Some(project) = Self::project_config_path(project_dir) {
            figment = figment.merge(Toml::file(project));
        }

        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            figment = figment.merge(Toml::file(path));
        }

        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Extract and validate.
    pub fn extract(figment: Figment) -> Result<FileConfig, ConfigError> {
        let config: FileConfig = figment.extract().map_err(Box::new)?;
        let issues = config.validate();
        if issues.is_empty() {
            Ok(config)
        } else {
            Err(ConfigError::Invalid(issues))
        }
    }

    /// `$XDG_CONFIG_HOME/foreman/config.toml` (or the platform equivalent)
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("foreman").join("config.toml"))
    }

    /// The first project config file present in `dir`
    pub fn project_config_path(dir: &Path) -> Option<PathBuf> {
        PROJECT_CONFIG_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn load_in(jail: &Jail, explicit: Option<&Path>, global: Option<&Path>) -> Result<FileConfig, ConfigError> {
        ConfigLoader::layered(explicit, global, jail.directory()).and_then(ConfigLoader::extract)
    }

    #[test]
    fn test_defaults_without_files() {
        Jail::expect_with(|jail| {
            let config = load_in(jail, None, None).unwrap();
            assert_eq!(config, FileConfig::default());
            Ok(())
        });
    }

    #[test]
    fn test_layer_priority() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "global.toml",
                r#"
[engine]
max_rounds = 4
max_retries_per_step = 7

[backend]
url = "http://global:11434"
"#,
            )?;
            jail.create_file(
                "foreman.toml",
                r#"
[engine]
max_rounds = 5
"#,
            )?;
            jail.create_file(
                "override.toml",
                r#"
[backend]
url = "http://explicit:11434"
"#,
            )?;

            let global = jail.directory().join("global.toml");
            let explicit = jail.directory().join("override.toml");
            let config = load_in(jail, Some(&explicit), Some(&global)).unwrap();

            assert_eq!(config.engine.max_rounds, 5);
            assert_eq!(config.engine.max_retries_per_step, 7);
            assert_eq!(config.backend.url, "http://explicit:11434");

            jail.set_env("FOREMAN_ENGINE__MAX_ROUNDS", "9");
            let config = load_in(jail, Some(&explicit), Some(&global)).unwrap();
            assert_eq!(config.engine.max_rounds, 9);
            Ok(())
        });
    }

    #[test]
    fn test_hidden_project_file() {
        Jail::expect_with(|jail| {
            jail.create_file(".foreman.toml", "[models]\nplanning = \"mistral:7b\"\n")?;
            let config = load_in(jail, None, None).unwrap();
            assert_eq!(config.models.planning.as_deref(), Some("mistral:7b"));
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_file() {
        Jail::expect_with(|jail| {
            let missing = jail.directory().join("nope.toml");
            let err = load_in(jail, Some(&missing), None).unwrap_err();
            assert!(matches!(err, ConfigError::NotFound(path) if path == missing));
            Ok(())
        });
    }

    #[test]
    fn test_invalid_values_are_reported() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "foreman.toml",
                r#"
[regulator]
max_models_loaded = 0

[[tools.servers]]
name = "web"
transport = "http"
"#,
            )?;
            match load_in(jail, None, None) {
                Err(ConfigError::Invalid(issues)) => {
                    assert_eq!(issues.len(), 2);
                    let message = ConfigError::Invalid(issues).to_string();
                    assert!(message.contains("regulator.max_models_loaded"));
                    assert!(message.contains("tool server 'web'"));
                }
                other => panic!("expected validation failure, got {:?}", other),
            }
            Ok(())
        });
    }

    #[test]
    fn test_type_errors_surface_from_figment() {
        Jail::expect_with(|jail| {
            jail.create_file("foreman.toml", "[engine]\nmax_rounds = \"many\"\n")?;
            let err = load_in(jail, None, None).unwrap_err();
            assert!(matches!(err, ConfigError::Figment(_)));
            Ok(())
        });
    }

    #[test]
    fn test_global_config_path_names_foreman() {
        if let Some(path) = ConfigLoader::global_config_path() {
            assert!(path.ends_with("foreman/config.toml"));
        }
    }
}
