pub mod config;
pub mod credentials;
pub mod paths;

pub use config::{parse_cutoff, Config, ConfigError, OutputConfig, SchedulerConfig, SortOrder, SyncConfig, TmdbConfig, TraktConfig, default_scheduler_config};
pub use credentials::{CredentialStore, TokenRecord};
pub use paths::{PathManager, container_base_path};
