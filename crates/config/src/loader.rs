use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::{env_subst::substitute_env, schema::FiMoneyConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "fimoney.toml",
    "fimoney.yaml",
    "fimoney.yml",
    "fimoney.json",
];

pub const GATEWAY_URL_ENV: &str = "FIMONEY_GATEWAY_URL";
pub const SERVER_URL_ENV: &str = "FIMONEY_SERVER_URL";

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<FiMoneyConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config, then apply environment overrides.
///
/// With `config_dir` set only that directory is searched. Otherwise:
/// 1. `./fimoney.{toml,yaml,yml,json}`
/// 2. the user config dir, e.g. `~/.config/fimoney/`
///
/// A missing or unreadable file falls back to defaults.
pub fn discover_and_load(config_dir: Option<&Path>) -> FiMoneyConfig {
    let mut config = match find_config_file(config_dir) {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            load_config(&path).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                FiMoneyConfig::default()
            })
        },
        None => {
            debug!("no config file found, using defaults");
            FiMoneyConfig::default()
        },
    };
    apply_env_overrides(&mut config);
    config
}

/// First existing config file in the search locations.
pub fn find_config_file(config_dir: Option<&Path>) -> Option<PathBuf> {
    let dirs: Vec<PathBuf> = match config_dir {
        Some(dir) => vec![dir.to_path_buf()],
        None => std::iter::once(PathBuf::from("."))
            .chain(user_config_dir())
            .collect(),
    };
    dirs.iter()
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)))
        .find(|p| p.exists())
}

/// The per-user config directory (`~/.config/fimoney/` on Linux).
pub fn user_config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "fimoney").map(|d| d.config_dir().to_path_buf())
}

/// `FIMONEY_GATEWAY_URL` and `FIMONEY_SERVER_URL` win over file values.
pub fn apply_env_overrides(config: &mut FiMoneyConfig) {
    apply_overrides_with(config, |name| std::env::var(name).ok());
}

fn apply_overrides_with(config: &mut FiMoneyConfig, lookup: impl Fn(&str) -> Option<String>) {
    let present = |name: &str| lookup(name).filter(|v: &String| !v.trim().is_empty());
    if let Some(url) = present(GATEWAY_URL_ENV) {
        info!(env = GATEWAY_URL_ENV, "gateway url overridden from environment");
        config.gateway.base_url = url;
    }
    if let Some(url) = present(SERVER_URL_ENV) {
        info!(env = SERVER_URL_ENV, "server url overridden from environment");
        config.session.server_url = url;
    }
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<FiMoneyConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

/// Parse any supported format into a generic JSON tree.
pub(crate) fn parse_config_value(raw: &str, path: &Path) -> anyhow::Result<serde_json::Value> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => {
            let v: toml::Value = toml::from_str(raw)?;
            Ok(serde_json::to_value(v)?)
        },
        "yaml" | "yml" => {
            let v: serde_yaml::Value = serde_yaml::from_str(raw)?;
            Ok(serde_json::to_value(v)?)
        },
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
