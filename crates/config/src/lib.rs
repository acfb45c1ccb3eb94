//! Configuration loading, env substitution and validation.
//!
//! Config files: `fimoney.toml`, `fimoney.yaml`, `fimoney.yml` or
//! `fimoney.json`, searched in `./` then the user config dir.
//!
//! Supports `${ENV_VAR}` substitution in all values.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{
        GATEWAY_URL_ENV, SERVER_URL_ENV, apply_env_overrides, discover_and_load,
        find_config_file, load_config, user_config_dir,
    },
    schema::{DashboardConfig, FiMoneyConfig, GatewayConfig, SessionConfig},
    validate::{Diagnostic, Severity, ValidationResult},
};
