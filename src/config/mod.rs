//! Configuration: units to relocate, destination defaults, logging settings.
//! Loaded from config.xml; CLI flags override XML values.

pub mod paths;
pub mod types;
mod validate;
pub mod xml;

pub use paths::{default_config_path, default_log_path, path_has_symlink_ancestor};
pub use types::{default_units, Config, LogLevel};
pub use xml::{create_template_config, load_config, load_config_from_xml_path, LoadedConfig};

/// Environment variable naming an explicit config file (or directory holding config.xml).
pub const CONFIG_ENV_VAR: &str = "ZALO_MOVE_CONFIG";

/// Folder created inside the user-chosen destination.
pub const DESTINATION_SUBDIR_DEFAULT: &str = "zalo_move";

/// Pause after killing blocking processes, before the first move.
pub const SETTLE_MS_DEFAULT: u64 = 2000;
