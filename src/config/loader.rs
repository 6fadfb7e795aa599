//! Layered configuration loading.
//!
//! Precedence, lowest to highest: defaults, user config file,
//! `graphgate.toml` in the config directory, `{GRAPHGATE_ENV}.toml`,
//! `GRAPHGATE_*` environment variables.

use config::ConfigError;
use config::File;
use std::path::Path;

use super::defaults::builder_with_defaults;
use super::sources;
use super::GraphGateConfig;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from every layer.
    pub fn load(config_dir: Option<&Path>) -> Result<GraphGateConfig, ConfigError> {
        let mut builder = sources::add_user_file(builder_with_defaults()?);
        if let Some(dir) = config_dir {
            builder = sources::add_directory_files(builder, dir);
        }
        builder = sources::add_environment(builder);
        builder.build()?.try_deserialize()
    }

    /// Load defaults plus one explicit file; the environment is not consulted.
    pub fn from_file(path: &Path) -> Result<GraphGateConfig, ConfigError> {
        builder_with_defaults()?
            .add_source(File::from(path))
            .build()?
            .try_deserialize()
    }
}
