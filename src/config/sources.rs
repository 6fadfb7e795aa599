//! Config sources: user-level file, config directory files, environment.

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::Environment;
use config::File;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONFIG_FILE_NAME: &str = "graphgate.toml";
pub const ENV_PREFIX: &str = "GRAPHGATE";

/// Path to the user-level config file (`$XDG_CONFIG_HOME/graphgate/graphgate.toml`
/// on Linux).
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("org", "graphgate", "graphgate")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

/// Add the user-level config file if it exists.
pub fn add_user_file(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    match user_config_path() {
        Some(path) if path.exists() => {
            debug!(config_path = %path.display(), "Loading user configuration");
            builder.add_source(File::from(path).required(false))
        }
        _ => builder,
    }
}

/// Add `graphgate.toml` then `{GRAPHGATE_ENV}.toml` from `config_dir`.
pub fn add_directory_files(
    mut builder: ConfigBuilder<DefaultState>,
    config_dir: &Path,
) -> ConfigBuilder<DefaultState> {
    let base = config_dir.join(CONFIG_FILE_NAME);
    if base.exists() {
        debug!(config_path = %base.display(), "Loading configuration file");
        builder = builder.add_source(File::from(base).required(false));
    }

    if let Ok(env_name) = std::env::var("GRAPHGATE_ENV") {
        let env_file = config_dir.join(format!("{}.toml", env_name));
        if env_file.exists() {
            debug!(config_path = %env_file.display(), "Loading environment configuration file");
            builder = builder.add_source(File::from(env_file).required(false));
        }
    }

    builder
}

/// Add `GRAPHGATE_<SECTION>__<KEY>` environment overrides,
/// e.g. `GRAPHGATE_QUEUE__CONCURRENCY=8`.
pub fn add_environment(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    )
}
