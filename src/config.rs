//! Runtime configuration
//!
//! Settings come from an optional JSON file named by `NUMBRIDGE_CONF`, then
//! individual environment overrides:
//! - `NUMBRIDGE_HOME`: runtime installation directory
//! - `NUMBRIDGE_LIB_PATH`: directory holding the runtime's native libraries
//! - `NUMBRIDGE_SEED`: seed for the runtime's random generator

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::InitializationError;

pub const CONF_VAR: &str = "NUMBRIDGE_CONF";
pub const HOME_VAR: &str = "NUMBRIDGE_HOME";
pub const LIB_PATH_VAR: &str = "NUMBRIDGE_LIB_PATH";
pub const SEED_VAR: &str = "NUMBRIDGE_SEED";

fn default_root_module() -> String {
    "numeric".to_string()
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConf {
    #[serde(default)]
    pub home: Option<PathBuf>,
    #[serde(default)]
    pub lib_path: Option<PathBuf>,
    /// Shared libraries loaded before the runtime starts. Relative paths are
    /// taken relative to `lib_path`.
    #[serde(default)]
    pub preload: Vec<PathBuf>,
    /// Module that unqualified call paths resolve against.
    #[serde(default = "default_root_module")]
    pub root_module: String,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for RuntimeConf {
    fn default() -> Self {
        Self {
            home: None,
            lib_path: None,
            preload: Vec::new(),
            root_module: default_root_module(),
            seed: None,
        }
    }
}

impl RuntimeConf {
    pub fn from_json(text: &str) -> Result<Self, InitializationError> {
        serde_json::from_str(text).map_err(|e| InitializationError::Config(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self, InitializationError> {
        let text = fs::read_to_string(path).map_err(|e| {
            InitializationError::Config(format!("{}: {e}", path.display()))
        })?;
        Self::from_json(&text)
    }

    /// Configuration from the process environment.
    pub fn discover() -> Result<Self, InitializationError> {
        Self::discover_with(|name| std::env::var(name).ok())
    }

    /// Configuration from an arbitrary variable lookup.
    pub fn discover_with(
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, InitializationError> {
        let mut conf = match var(CONF_VAR) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        if let Some(home) = var(HOME_VAR) {
            conf.home = Some(PathBuf::from(home));
        }
        if let Some(lib_path) = var(LIB_PATH_VAR) {
            conf.lib_path = Some(PathBuf::from(lib_path));
        }
        if let Some(seed) = var(SEED_VAR) {
            let seed = seed.trim().parse().map_err(|_| {
                InitializationError::Config(format!("{SEED_VAR} is not an integer: {seed}"))
            })?;
            conf.seed = Some(seed);
        }
        Ok(conf)
    }
}
