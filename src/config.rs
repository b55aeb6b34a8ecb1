//! Engine settings resolution.
//!
//! Each setting is taken from the first source that provides a usable value:
//! command-line flag, environment variable, the `[engine]` section of
//! `bf.toml` in the user's config directory, then the built-in default.

use std::collections::HashMap;
use std::fs;
use std::num::NonZeroUsize;
use std::path::PathBuf;

use cross_xdg::BaseDirs;

use crate::engine::{BoundaryPolicy, EngineConfig, DEFAULT_TAPE_SIZE};

pub const TAPE_SIZE_ENV: &str = "BF_TAPE_SIZE";
pub const BOUNDARY_ENV: &str = "BF_BOUNDARY";
pub const CONFIG_FILE_NAME: &str = "bf.toml";

/// A value in the config file that could not be used.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid tape_size '{0}': expected a positive integer")]
    TapeSize(String),
    #[error("invalid boundary '{0}': expected 'strict' or 'wrapping'")]
    Boundary(String),
}

/// Settings that may be left unset at one layer and filled by the next.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Overrides {
    pub tape_size: Option<NonZeroUsize>,
    pub boundary: Option<BoundaryPolicy>,
}

impl Overrides {
    /// Fill unset fields from `fallback`.
    pub fn or(self, fallback: Overrides) -> Overrides {
        Overrides {
            tape_size: self.tape_size.or(fallback.tape_size),
            boundary: self.boundary.or(fallback.boundary),
        }
    }

    /// Finish resolution with the built-in defaults.
    pub fn into_config(self) -> EngineConfig {
        EngineConfig {
            tape_size: self.tape_size.unwrap_or(DEFAULT_TAPE_SIZE),
            boundary: self.boundary.unwrap_or_default(),
        }
    }
}

/// Resolve the engine configuration: `flags` -> env -> config file -> defaults.
pub fn resolve(flags: Overrides) -> EngineConfig {
    flags
        .or(from_env(|key| std::env::var(key).ok()))
        .or(from_file())
        .into_config()
}

/// Read overrides through `lookup`, which maps a variable name to its value.
/// Unparseable values are skipped with a warning.
pub fn from_env<F>(lookup: F) -> Overrides
where
    F: Fn(&str) -> Option<String>,
{
    let tape_size = lookup(TAPE_SIZE_ENV).and_then(|s| match parse_tape_size(&s) {
        Ok(n) => Some(n),
        Err(e) => {
            tracing::warn!("ignoring {TAPE_SIZE_ENV}: {e}");
            None
        }
    });
    let boundary = lookup(BOUNDARY_ENV).and_then(|s| match parse_boundary(&s) {
        Ok(b) => Some(b),
        Err(e) => {
            tracing::warn!("ignoring {BOUNDARY_ENV}: {e}");
            None
        }
    });
    Overrides { tape_size, boundary }
}

/// Location of `bf.toml`, if the platform has a config directory.
pub fn config_path() -> Option<PathBuf> {
    let base_dirs = BaseDirs::new().ok()?;

    // Linux: ~/.config/bf.toml, also used on macOS and Windows by cross-xdg
    let mut path = PathBuf::from(base_dirs.config_home());
    path.push(CONFIG_FILE_NAME);
    Some(path)
}

fn from_file() -> Overrides {
    let Some(path) = config_path() else {
        return Overrides::default();
    };
    let Ok(content) = fs::read_to_string(&path) else {
        return Overrides::default();
    };
    tracing::debug!(path = %path.display(), "loaded config file");

    let (overrides, errors) = parse_engine_section(&content);
    for err in errors {
        tracing::warn!("{}: {err}", path.display());
    }
    overrides
}

/// Parse the `[engine]` section of a config file.
///
/// Only `key = value` lines are understood; values may be quoted. Other
/// sections, comments and unknown keys are skipped. Returns what could be
/// used along with the errors for what could not.
pub fn parse_engine_section(content: &str) -> (Overrides, Vec<ConfigError>) {
    let mut in_engine = false;
    let mut map: HashMap<String, String> = HashMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with('[') && line.ends_with(']') {
            in_engine = line[1..line.len() - 1].trim() == "engine";
            continue;
        }
        if !in_engine {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            map.insert(key.trim().to_string(), unquote(value.trim()).to_string());
        }
    }

    let mut overrides = Overrides::default();
    let mut errors = Vec::new();

    if let Some(v) = map.get("tape_size") {
        match parse_tape_size(v) {
            Ok(n) => overrides.tape_size = Some(n),
            Err(_) => errors.push(ConfigError::TapeSize(v.clone())),
        }
    }
    if let Some(v) = map.get("boundary") {
        match parse_boundary(v) {
            Ok(b) => overrides.boundary = Some(b),
            Err(_) => errors.push(ConfigError::Boundary(v.clone())),
        }
    }

    (overrides, errors)
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn parse_tape_size(value: &str) -> Result<NonZeroUsize, ConfigError> {
    value
        .trim()
        .parse::<NonZeroUsize>()
        .map_err(|_| ConfigError::TapeSize(value.to_string()))
}

fn parse_boundary(value: &str) -> Result<BoundaryPolicy, ConfigError> {
    value
        .parse::<BoundaryPolicy>()
        .map_err(|_| ConfigError::Boundary(value.to_string()))
}
