//! Compilation unit API.
//!
//! A [`Unit`] collects named source files, builds them into one module
//! against a host registry and keeps the result together with the
//! diagnostics of the last build.
//!
//! # Example
//!
//! ```
//! use vxscript::{Registry, Unit};
//!
//! let registry = Registry::new();
//! let mut unit = Unit::with_registry(&registry);
//!
//! unit.add_source("player.vxs", r#"
//!     struct Player {
//!         int health;
//!         float speed;
//!     }
//! "#).unwrap();
//!
//! unit.add_source("main.vxs", r#"
//!     int heal(int amount) {
//!         Player p;
//!         p.health = 10;
//!         return p.health + amount;
//!     }
//! "#).unwrap();
//!
//! unit.build().unwrap();
//! assert!(unit.compiled().unwrap().function("heal").is_some());
//! ```

use rustc_hash::FxHashSet;
use vxscript_compiler::{Builder, CompiledModule};
use vxscript_core::{BuildConfig, Diagnostics};
use vxscript_parser::SourceUnit;
use vxscript_registry::{HostRegistry, Registry};

/// Name given to modules built by a [`Unit`] unless set otherwise.
pub const DEFAULT_MODULE_NAME: &str = "main";

/// One registered source file.
#[derive(Debug, Clone)]
struct SourceFile {
    name: String,
    code: String,
    /// Hash of `code` for change detection.
    hash: u64,
}

/// A compilation unit.
///
/// 1. Create a unit with [`Unit::new`] or [`Unit::with_registry`]
/// 2. Add source files with [`add_source`](Unit::add_source)
/// 3. Build with [`build`](Unit::build)
/// 4. Read the module with [`compiled`](Unit::compiled)
///
/// Source files are compiled in the order they were added.
pub struct Unit<'r> {
    /// Host declarations; `None` builds against an empty registry.
    registry: Option<&'r dyn HostRegistry>,
    name: String,
    config: BuildConfig,
    sources: Vec<SourceFile>,
    /// Files changed since the last successful build.
    dirty_files: FxHashSet<String>,
    compiled: Option<CompiledModule>,
    /// Diagnostics of the last build, warnings included.
    diagnostics: Diagnostics,
    is_built: bool,
}

impl Default for Unit<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'r> Unit<'r> {
    /// Create a unit without host declarations. Scripts built by it can
    /// only use primitives, their own structs and arrays.
    pub fn new() -> Self {
        Self {
            registry: None,
            name: DEFAULT_MODULE_NAME.to_string(),
            config: BuildConfig::default(),
            sources: Vec::new(),
            dirty_files: FxHashSet::default(),
            compiled: None,
            diagnostics: Diagnostics::new(),
            is_built: false,
        }
    }

    /// Create a unit that builds against `registry`.
    pub fn with_registry(registry: &'r dyn HostRegistry) -> Self {
        Self {
            registry: Some(registry),
            ..Self::new()
        }
    }

    /// Set the module name, which config group access lists refer to.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_config(mut self, config: BuildConfig) -> Self {
        self.config = config;
        self
    }

    fn hash_source(source: &str) -> u64 {
        xxhash_rust::xxh64::xxh64(source.as_bytes(), 0)
    }

    /// Add a source file to the unit.
    ///
    /// # Errors
    ///
    /// Returns an error if the unit has already been built. Use
    /// `update_source()` to change a file after building, or `clear()` to
    /// start over.
    pub fn add_source(&mut self, filename: impl Into<String>, source: impl Into<String>) -> Result<(), UnitError> {
        if self.is_built {
            return Err(UnitError::AlreadyBuilt);
        }

        let name = filename.into();
        if self.sources.iter().any(|s| s.name == name) {
            return Err(UnitError::DuplicateFile(name));
        }
        let code = source.into();
        let hash = Self::hash_source(&code);

        self.dirty_files.insert(name.clone());
        self.sources.push(SourceFile { name, code, hash });
        Ok(())
    }

    /// Replace the code of a file and mark it for recompilation.
    ///
    /// Returns `true` if the source actually changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is not part of the unit.
    pub fn update_source(&mut self, filename: impl AsRef<str>, source: impl Into<String>) -> Result<bool, UnitError> {
        let filename = filename.as_ref();
        let Some(file) = self.sources.iter_mut().find(|s| s.name == filename) else {
            return Err(UnitError::FileNotFound(filename.to_string()));
        };

        let code = source.into();
        let hash = Self::hash_source(&code);
        if hash == file.hash {
            return Ok(false);
        }

        file.code = code;
        file.hash = hash;
        self.dirty_files.insert(filename.to_string());
        Ok(true)
    }

    /// Rebuild the module when any file changed since the last build.
    ///
    /// The whole module is rebuilt: global initialization order and struct
    /// layout depend on every file.
    ///
    /// # Errors
    ///
    /// Returns an error if the build fails. The previous module is dropped.
    pub fn rebuild(&mut self) -> Result<(), BuildError> {
        if !self.is_built {
            return self.build();
        }
        if self.dirty_files.is_empty() {
            return Ok(());
        }

        self.is_built = false;
        self.compiled = None;
        self.build()
    }

    /// Whether files changed since the last successful build.
    pub fn has_pending_changes(&self) -> bool {
        self.is_built && !self.dirty_files.is_empty()
    }

    pub fn dirty_files(&self) -> &FxHashSet<String> {
        &self.dirty_files
    }

    /// Parse and compile every source into one module.
    ///
    /// Diagnostics are kept whether the build succeeds or not and are
    /// available from [`diagnostics`](Unit::diagnostics).
    ///
    /// # Errors
    ///
    /// Returns an error if there is nothing to build, the unit is already
    /// built, or the build reported errors.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn build(&mut self) -> Result<(), BuildError> {
        if self.is_built {
            return Err(BuildError::AlreadyBuilt);
        }
        if self.sources.is_empty() {
            return Err(BuildError::NoSources);
        }

        let empty;
        let registry: &dyn HostRegistry = match self.registry {
            Some(registry) => registry,
            None => {
                empty = Registry::new();
                &empty
            }
        };

        let mut builder = Builder::new(registry, self.name.as_str()).with_config(self.config.clone());
        for file in &self.sources {
            builder.add_source(SourceUnit::new(file.name.as_str(), file.code.as_str()));
        }
        let output = builder.build();
        self.diagnostics = output.diagnostics;

        let Some(module) = output.module else {
            return Err(BuildError::Failed {
                errors: self.diagnostics.error_count(),
            });
        };

        self.compiled = Some(module);
        self.is_built = true;
        self.dirty_files.clear();
        Ok(())
    }

    pub fn is_built(&self) -> bool {
        self.is_built
    }

    /// The compiled module (available after a successful build).
    pub fn compiled(&self) -> Option<&CompiledModule> {
        self.compiled.as_ref()
    }

    /// Take the compiled module out of the unit.
    pub fn into_module(self) -> Option<CompiledModule> {
        self.compiled
    }

    /// Diagnostics of the last build.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Reset to an empty unit. The registry, name and config are kept.
    pub fn clear(&mut self) {
        self.sources.clear();
        self.dirty_files.clear();
        self.compiled = None;
        self.diagnostics.clear();
        self.is_built = false;
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Number of compiled script functions, not counting the init function.
    pub fn function_count(&self) -> usize {
        self.compiled.as_ref().map_or(0, |c| c.functions.len())
    }

    /// Number of script structs and array instances of the module.
    pub fn type_count(&self) -> usize {
        self.compiled.as_ref().map_or(0, |c| c.object_types.len())
    }
}

/// Errors that can occur when adding sources or managing the unit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnitError {
    #[error("Unit has already been built. Use update_source() for hot reloading or clear() to rebuild.")]
    AlreadyBuilt,

    #[error("File '{0}' not found in unit")]
    FileNotFound(String),

    #[error("File '{0}' was already added to the unit")]
    DuplicateFile(String),
}

/// Errors that can occur during unit building.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("No sources added to unit")]
    NoSources,

    #[error("Unit has already been built")]
    AlreadyBuilt,

    /// The build reported errors; see [`Unit::diagnostics`].
    #[error("Build failed with {errors} error(s)")]
    Failed { errors: usize },
}
