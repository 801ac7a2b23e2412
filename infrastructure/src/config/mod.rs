//! Configuration file loading for foreman
//!
//! Sources merge in this order, later ones winning:
//!
//! 1. Default values
//! 2. Global: `$XDG_CONFIG_HOME/foreman/config.toml`
//! 3. Project root: `./foreman.toml` or `./.foreman.toml`
//! 4. `--config <path>` specified file
//! 5. `FOREMAN_*` environment variables

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileBackendConfig, FileConfig, FileEngineConfig, FileLoggingConfig,
    FileModelsConfig, FileRegulatorConfig, FileToolServerConfig, FileToolsConfig,
    FileTransportKind,
};
pub use loader::{ConfigError, ConfigLoader, ENV_PREFIX, PROJECT_CONFIG_FILES};
