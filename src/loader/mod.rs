//! Native library loader
//!
//! Resolves where the runtime is installed and preloads the shared libraries
//! it depends on before the runtime is initialized. Loaded libraries stay
//! resident for the rest of the process.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::config::RuntimeConf;
use crate::error::InitializationError;

static RESIDENT: Mutex<Vec<libloading::Library>> = Mutex::new(Vec::new());

/// Installation paths after resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallPaths {
    pub home: Option<PathBuf>,
    pub lib_path: Option<PathBuf>,
    /// Libraries that were preloaded, fully resolved.
    pub libraries: Vec<PathBuf>,
}

pub struct LibraryLoader;

impl LibraryLoader {
    /// Resolve installation paths and preload configured libraries.
    pub fn load(conf: &RuntimeConf) -> Result<InstallPaths, InitializationError> {
        let home = conf.home.clone().or_else(default_home);
        let lib_path = conf.lib_path.clone();
        tracing::debug!(?home, ?lib_path, "resolved runtime installation");

        let mut libraries = Vec::with_capacity(conf.preload.len());
        for library in &conf.preload {
            let path = resolve_library(lib_path.as_deref(), library);
            Self::preload(&path)?;
            libraries.push(path);
        }
        Ok(InstallPaths {
            home,
            lib_path,
            libraries,
        })
    }

    /// Load one shared library and keep it resident.
    pub fn preload(path: &Path) -> Result<(), InitializationError> {
        tracing::debug!("Attempting to load native library from: {}", path.display());

        // Safety: preloaded libraries are the runtime's own dependencies; their
        // initializers are trusted the same way linking against them would be.
        let library = unsafe { libloading::Library::new(path) }.map_err(|e| {
            InitializationError::Library {
                path: path.display().to_string(),
                message: e.to_string(),
            }
        })?;
        tracing::info!("loaded native library {}", path.display());
        RESIDENT.lock().push(library);
        Ok(())
    }

    /// Number of libraries preloaded so far.
    pub fn resident() -> usize {
        RESIDENT.lock().len()
    }
}

fn resolve_library(lib_path: Option<&Path>, library: &Path) -> PathBuf {
    match lib_path {
        Some(dir) if library.is_relative() && library.components().count() > 1 => {
            dir.join(library)
        }
        Some(dir) if library.is_relative() && dir.join(library).exists() => dir.join(library),
        _ => library.to_path_buf(),
    }
}

/// The directory above the executable's own directory.
fn default_home() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    exe.parent()?.parent().map(Path::to_path_buf)
}
