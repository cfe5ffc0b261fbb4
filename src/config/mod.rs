pub mod loader;
pub mod schema;

pub use loader::{
    default_config_path, load_from_path, load_from_str, resolve, ConfigError, CONFIG_ENV,
};
pub use schema::{
    default_backup_dir, SurgeryConfig, ValidationError, ValidationIssue, BACKUP_DIR_ENV,
};
