//! Configuration management for `docket`.
//!
//! Layers, lowest to highest precedence:
//! 1. Defaults
//! 2. User config (`~/.config/docket/config.yaml`)
//! 3. Project config (`.docket/config.yaml`)
//! 4. Environment (`DOCKET_*`)
//! 5. CLI overrides
//!
//! YAML is flattened into dotted keys (`merge.failure-log`), so nested and
//! flat spellings are equivalent.

use crate::error::{DocketError, Result, ResultExt};
use crate::merge::{DEFAULT_TEXT_FIELDS, MergeOptions};
use crate::resolve::ResolveOptions;
use crate::util::DATA_DIR_NAME;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILENAME: &str = "config.yaml";
pub const FAILURE_LOG_FILENAME: &str = "merge-driver.log";

/// Environment variable naming the data directory explicitly.
pub const DATA_DIR_ENV: &str = "DOCKET_DIR";
const ENV_PREFIX: &str = "DOCKET_";

pub const KEY_FAILURE_LOG: &str = "merge.failure-log";
pub const KEY_USE_GIT_STAGES: &str = "merge.use-git-stages";
pub const KEY_TEXT_FIELDS: &str = "merge.text-fields";

/// Discover the active `.docket` directory.
///
/// Honors `DOCKET_DIR` when set, otherwise walks up from `start` (or CWD).
///
/// # Errors
///
/// Returns `DocketError::NotInitialized` if no data directory is found.
pub fn discover_data_dir(start: Option<&Path>) -> Result<PathBuf> {
    let env_dir = env::var(DATA_DIR_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from);
    discover_data_dir_with_env(start, env_dir.as_deref())
}

/// [`discover_data_dir`] with the environment override passed explicitly.
///
/// # Errors
///
/// Returns `DocketError::NotInitialized` if no data directory is found.
pub fn discover_data_dir_with_env(
    start: Option<&Path>,
    env_override: Option<&Path>,
) -> Result<PathBuf> {
    if let Some(path) = env_override {
        if path.is_dir() {
            return Ok(path.to_path_buf());
        }
    }

    let start = match start {
        Some(path) => path.to_path_buf(),
        None => env::current_dir()?,
    };
    crate::util::find_data_dir(&start).ok_or(DocketError::NotInitialized)
}

/// A flattened configuration layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigLayer {
    pub values: HashMap<String, String>,
}

impl ConfigLayer {
    /// Merge another layer on top of this one (higher precedence wins).
    pub fn merge_from(&mut self, other: &Self) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// Merge multiple layers in precedence order (lowest to highest).
    #[must_use]
    pub fn merge_layers(layers: &[Self]) -> Self {
        let mut merged = Self::default();
        for layer in layers {
            merged.merge_from(layer);
        }
        merged
    }

    /// Build a layer from a YAML file path. Missing files return empty config.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn from_yaml(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path).with_path(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Build a layer from YAML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid YAML.
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let value: serde_yaml::Value = serde_yaml::from_str(contents)?;
        let mut flat = HashMap::new();
        flatten_yaml(&value, "", &mut flat);
        let mut layer = Self::default();
        for (key, value) in flat {
            layer.insert(&key, value);
        }
        Ok(layer)
    }

    /// Build a layer from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(env::vars())
    }

    /// Build a layer from `DOCKET_*` variables.
    ///
    /// `DOCKET_MERGE_FAILURE_LOG` maps to `merge.failure-log`: the first
    /// underscore after the prefix separates the section, the rest become
    /// dashes. `DOCKET_DIR` is not a config key and is ignored.
    #[must_use]
    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut layer = Self::default();
        for (key, value) in vars {
            if key == DATA_DIR_ENV {
                continue;
            }
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                layer.insert(&env_key(stripped), value);
            }
        }
        layer
    }

    /// Set a key, normalizing its spelling (`use_git_stages` == `use-git-stages`).
    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(normalize_key(key), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(&normalize_key(key)).map(String::as_str)
    }
}

/// CLI overrides for config loading (optional).
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub failure_log: Option<PathBuf>,
    pub use_git_stages: Option<bool>,
    pub text_fields: Option<Vec<String>>,
}

impl CliOverrides {
    #[must_use]
    pub fn as_layer(&self) -> ConfigLayer {
        let mut layer = ConfigLayer::default();
        if let Some(path) = &self.failure_log {
            layer.insert(KEY_FAILURE_LOG, path.to_string_lossy());
        }
        if let Some(enabled) = self.use_git_stages {
            layer.insert(KEY_USE_GIT_STAGES, enabled.to_string());
        }
        if let Some(fields) = &self.text_fields {
            layer.insert(KEY_TEXT_FIELDS, fields.join(","));
        }
        layer
    }
}

/// Load project config (`.docket/config.yaml`).
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_project_config(data_dir: &Path) -> Result<ConfigLayer> {
    ConfigLayer::from_yaml(&data_dir.join(CONFIG_FILENAME))
}

/// Load user config from `config_dir`, or `~/.config/docket/` by default.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config(config_dir: Option<&Path>) -> Result<ConfigLayer> {
    let dir = match config_dir {
        Some(dir) => dir.to_path_buf(),
        None => {
            let Ok(home) = env::var("HOME") else {
                return Ok(ConfigLayer::default());
            };
            Path::new(&home).join(".config").join("docket")
        }
    };
    ConfigLayer::from_yaml(&dir.join(CONFIG_FILENAME))
}

/// Default config layer (lowest precedence).
#[must_use]
pub fn default_config_layer() -> ConfigLayer {
    let mut layer = ConfigLayer::default();
    layer.insert(KEY_USE_GIT_STAGES, "true");
    layer.insert(KEY_TEXT_FIELDS, DEFAULT_TEXT_FIELDS.join(","));
    layer
}

/// Load configuration with the full precedence order.
///
/// `data_dir` is `None` when no project data directory exists yet.
///
/// # Errors
///
/// Returns an error if any config file cannot be read or parsed.
pub fn load_config(
    data_dir: Option<&Path>,
    user_config_dir: Option<&Path>,
    cli: &CliOverrides,
) -> Result<ConfigLayer> {
    let project = match data_dir {
        Some(dir) => load_project_config(dir)?,
        None => ConfigLayer::default(),
    };
    Ok(ConfigLayer::merge_layers(&[
        default_config_layer(),
        load_user_config(user_config_dir)?,
        project,
        ConfigLayer::from_env(),
        cli.as_layer(),
    ]))
}

/// Settings the merge commands need, resolved from a config layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeConfig {
    pub failure_log: PathBuf,
    pub use_git_stages: bool,
    pub text_fields: Vec<String>,
}

impl MergeConfig {
    /// Resolve merge settings.
    ///
    /// The failure log defaults to `<data dir>/merge-driver.log`, or
    /// `<cwd>/.docket/merge-driver.log` when there is no data directory. A
    /// relative configured path is taken relative to `cwd`.
    #[must_use]
    pub fn from_layer(layer: &ConfigLayer, data_dir: Option<&Path>, cwd: &Path) -> Self {
        let failure_log = match layer.get(KEY_FAILURE_LOG).map(str::trim) {
            Some(value) if !value.is_empty() => {
                let path = PathBuf::from(value);
                if path.is_absolute() {
                    path
                } else {
                    cwd.join(path)
                }
            }
            _ => data_dir
                .map_or_else(|| cwd.join(DATA_DIR_NAME), Path::to_path_buf)
                .join(FAILURE_LOG_FILENAME),
        };

        let use_git_stages = layer
            .get(KEY_USE_GIT_STAGES)
            .and_then(parse_bool)
            .unwrap_or(true);

        let mut text_fields: Vec<String> = layer
            .get(KEY_TEXT_FIELDS)
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default();
        if text_fields.is_empty() {
            text_fields = MergeOptions::default().text_fields;
        }

        Self {
            failure_log,
            use_git_stages,
            text_fields,
        }
    }

    #[must_use]
    pub fn merge_options(&self) -> MergeOptions {
        MergeOptions {
            text_fields: self.text_fields.clone(),
        }
    }

    #[must_use]
    pub fn resolve_options(&self, dry_run: bool) -> ResolveOptions {
        ResolveOptions {
            dry_run,
            use_git_stages: self.use_git_stages,
            merge: self.merge_options(),
        }
    }
}

fn env_key(raw: &str) -> String {
    let lower = raw.to_lowercase();
    match lower.split_once('_') {
        Some((section, rest)) => format!("{section}.{}", rest.replace('_', "-")),
        None => lower,
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase().replace('_', "-")
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn flatten_yaml(value: &serde_yaml::Value, prefix: &str, out: &mut HashMap<String, String>) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (key, value) in map {
                let Some(key_str) = key.as_str() else {
                    continue;
                };
                let next_prefix = if prefix.is_empty() {
                    key_str.to_string()
                } else {
                    format!("{prefix}.{key_str}")
                };
                flatten_yaml(value, &next_prefix, out);
            }
        }
        serde_yaml::Value::Sequence(values) => {
            let joined = values
                .iter()
                .filter_map(yaml_scalar_to_string)
                .collect::<Vec<_>>()
                .join(",");
            out.insert(prefix.to_string(), joined);
        }
        _ => {
            if let Some(value) = yaml_scalar_to_string(value) {
                out.insert(prefix.to_string(), value);
            }
        }
    }
}

fn yaml_scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Bool(v) => Some(v.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Null
        | serde_yaml::Value::Sequence(_)
        | serde_yaml::Value::Mapping(_) => None,
        serde_yaml::Value::Tagged(tagged) => yaml_scalar_to_string(&tagged.value),
    }
}
