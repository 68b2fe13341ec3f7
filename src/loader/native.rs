//! Native Library Loader
//!
//! Orchestrates a single load: stage the library bytes to disk, invoke the
//! OS dynamic linker, run the optional post-load hook, find and call the
//! conventionally-named initializer under a scoped package context, and
//! resolve the registered module.
//!
//! The loader never caches or de-duplicates: every call re-stages and
//! re-links, even for an already-loaded name. Avoiding duplicate loads (and
//! races on the staging path) is the caller's responsibility.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::diag::{StderrSink, TraceSink};

use super::context::PackageContext;
use super::folder::find_writable_folder;
use super::linker::{Linked, NativeImage, NativeLinker, OsLinker};
use super::registry::{ModuleHandle, ModuleRegistry};

/// Errors surfaced by [`NativeLibraryLoader::load`].
///
/// Every variant carries the filepath or name of the failing step; nothing is
/// silently swallowed except diagnostic-sink output. The managed-to-plain
/// linker fallback inside a load is the only built-in recovery; every other
/// failure is terminal for that call.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Staging the library bytes to disk failed (write or flush).
    #[error("failed to stage native library at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Every linker attempt failed; the file is present but not loadable.
    #[error("failed to link native library '{name}' from '{path}': {reason}")]
    Link {
        name: String,
        path: PathBuf,
        reason: String,
    },

    /// The caller-supplied post-load hook failed.
    #[error("post-load hook failed for '{name}': {reason}")]
    Hook { name: String, reason: String },

    /// The initializer entry point was found but its invocation failed.
    #[error("initializer '{symbol}' failed for '{name}': {reason}")]
    Init {
        name: String,
        symbol: String,
        reason: String,
    },

    /// The initializer ran but did not register the expected module name.
    #[error("native library '{name}' did not register module '{module}'")]
    Resolve { name: String, module: String },

    /// No staging directory qualified among the candidates.
    #[error("no writable folder among staging candidates")]
    NoWritableFolder,
}

/// Result type for load operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// How the caller wants the library materialized. Chosen explicitly per
/// load, never inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Opaque dynamic-library handle; no initializer contract.
    RawHandle,
    /// Full initializer protocol producing a registered host module.
    ManagedModule,
}

/// Caller-supplied hook run once per load, after linking and before
/// initializer lookup. Receives the loaded image and the logical name; its
/// side effects are opaque to the loader.
pub type PostLoadHook<'a> = &'a (dyn Fn(&Arc<dyn NativeImage>, &str) -> Result<(), String> + 'a);

/// Per-load knobs.
#[derive(Default)]
pub struct LoadOptions<'a> {
    initializer_name: Option<String>,
    post_load_hook: Option<PostLoadHook<'a>>,
}

impl<'a> LoadOptions<'a> {
    /// Defaults: derived initializer name, no hook.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the derived `init<module_name>` symbol.
    pub fn with_initializer_name(mut self, name: impl Into<String>) -> Self {
        self.initializer_name = Some(name.into());
        self
    }

    /// Attach a post-load hook.
    pub fn with_post_load_hook(mut self, hook: PostLoadHook<'a>) -> Self {
        self.post_load_hook = Some(hook);
        self
    }
}

/// The loader. All collaborators are injected; `new` wires up the OS linker,
/// the process-global package context, and a stderr diagnostic sink.
pub struct NativeLibraryLoader {
    linker: Arc<dyn NativeLinker>,
    context: Arc<PackageContext>,
    registry: Arc<dyn ModuleRegistry>,
    sink: Arc<dyn TraceSink>,
}

impl NativeLibraryLoader {
    /// Loader over the OS dynamic linker and the process-global context slot.
    pub fn new(registry: Arc<dyn ModuleRegistry>) -> Self {
        Self {
            linker: Arc::new(OsLinker),
            context: PackageContext::global(),
            registry,
            sink: Arc::new(StderrSink),
        }
    }

    /// Replace the linker (tests, alternative loaders).
    pub fn with_linker(mut self, linker: Arc<dyn NativeLinker>) -> Self {
        self.linker = linker;
        self
    }

    /// Replace the package-context slot.
    pub fn with_context(mut self, context: Arc<PackageContext>) -> Self {
        self.context = context;
        self
    }

    /// Replace the diagnostic sink.
    pub fn with_sink(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Pick a staging directory for library files.
    ///
    /// Thin wrapper over [`find_writable_folder`] that maps exhaustion to
    /// [`LoadError::NoWritableFolder`].
    pub fn pick_staging_folder(
        &self,
        candidates: &[PathBuf],
        validate: Option<&dyn Fn(&Path) -> bool>,
    ) -> LoadResult<PathBuf> {
        find_writable_folder(candidates, validate, self.sink.as_ref())
            .ok_or(LoadError::NoWritableFolder)
    }

    /// Load a native library from raw bytes.
    ///
    /// `bytes` are staged at `filepath`, the file is linked into the process,
    /// and depending on `mode` either the opaque handle is returned or the
    /// initializer protocol runs and the registered module is resolved.
    pub fn load(
        &self,
        bytes: &[u8],
        filepath: &Path,
        name: &str,
        mode: LoadMode,
        options: LoadOptions<'_>,
    ) -> LoadResult<ModuleHandle> {
        self.stage(bytes, filepath)?;

        if mode == LoadMode::RawHandle {
            let image = self.link_plain(filepath, name)?;
            self.sink
                .trace(format_args!("load: library loaded: {} (raw)", name));

            if let Some(hook) = options.post_load_hook {
                hook(&image, name).map_err(|reason| LoadError::Hook {
                    name: name.to_string(),
                    reason,
                })?;
            }

            return Ok(ModuleHandle::Raw(image));
        }

        let linked = self.link_managed(filepath, name)?;
        self.sink.trace(format_args!(
            "load: library loaded: {} ({})",
            name,
            linked.style()
        ));

        let module_name = derive_module_name(name);
        let symbol = options
            .initializer_name
            .unwrap_or_else(|| format!("init{}", module_name));

        if let Some(hook) = options.post_load_hook {
            hook(linked.image(), name).map_err(|reason| LoadError::Hook {
                name: name.to_string(),
                reason,
            })?;
        }

        // Absence of the initializer is legal: pure data or side-effect-free
        // libraries simply skip straight to resolution.
        if let Some(init) = linked.image().find_initializer(&symbol) {
            self.sink
                .trace(format_args!("load: init found: {}", symbol));
            self.sink
                .trace(format_args!("load: call init {}@{}", symbol, module_name));

            let _package = self.context.scoped(&module_name);
            init.invoke().map_err(|reason| LoadError::Init {
                name: name.to_string(),
                symbol: symbol.clone(),
                reason,
            })?;

            self.sink.trace(format_args!(
                "load: call init {}@{} - complete",
                symbol, module_name
            ));
        }

        match self.registry.resolve(&module_name) {
            Some(module) => Ok(ModuleHandle::Module(module)),
            None => Err(LoadError::Resolve {
                name: name.to_string(),
                module: module_name,
            }),
        }
    }

    /// Write the library bytes to `filepath` and flush, so the dynamic
    /// linker observes a complete file. The handle is scoped to this call.
    fn stage(&self, bytes: &[u8], filepath: &Path) -> LoadResult<()> {
        let io_err = |source| LoadError::Io {
            path: filepath.to_path_buf(),
            source,
        };

        let mut file = File::create(filepath).map_err(io_err)?;
        file.write_all(bytes).map_err(io_err)?;
        file.flush().map_err(io_err)?;
        Ok(())
    }

    fn link_plain(&self, filepath: &Path, name: &str) -> LoadResult<Arc<dyn NativeImage>> {
        match self.linker.load_plain(filepath) {
            Ok(image) => Ok(Arc::from(image)),
            Err(reason) => Err(LoadError::Link {
                name: name.to_string(),
                path: filepath.to_path_buf(),
                reason,
            }),
        }
    }

    /// Managed link with plain fallback. Both attempts target the same
    /// on-disk file; the fallback path still runs the full initializer
    /// protocol afterwards.
    fn link_managed(&self, filepath: &Path, name: &str) -> LoadResult<Linked> {
        let managed_reason = match self.linker.load_managed(filepath) {
            Ok(image) => return Ok(Linked::Managed(Arc::from(image))),
            Err(reason) => reason,
        };

        self.sink.trace(format_args!(
            "load: managed link of '{}' failed: {}; retrying with plain linker",
            name, managed_reason
        ));

        match self.linker.load_plain(filepath) {
            Ok(image) => Ok(Linked::Plain(Arc::from(image))),
            Err(plain_reason) => Err(LoadError::Link {
                name: name.to_string(),
                path: filepath.to_path_buf(),
                reason: format!("managed: {}; plain: {}", managed_reason, plain_reason),
            }),
        }
    }
}

/// Canonicalize a logical name into the bare module name used for both the
/// initializer symbol and the package-context value: strip one trailing
/// platform library extension, then take the last dot-delimited segment.
pub(crate) fn derive_module_name(name: &str) -> String {
    let trimmed = name
        .strip_suffix(".so")
        .or_else(|| name.strip_suffix(".dll"))
        .or_else(|| name.strip_suffix(".pyd"))
        .unwrap_or(name);

    match trimmed.rfind('.') {
        Some(idx) => trimmed[idx + 1..].to_string(),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_module_name_plain() {
        assert_eq!(derive_module_name("mylib"), "mylib");
    }

    #[test]
    fn test_derive_module_name_strips_extension() {
        assert_eq!(derive_module_name("mylib.so"), "mylib");
        assert_eq!(derive_module_name("mylib.dll"), "mylib");
        assert_eq!(derive_module_name("mylib.pyd"), "mylib");
    }

    #[test]
    fn test_derive_module_name_takes_last_dot_segment() {
        assert_eq!(derive_module_name("foo.bar"), "bar");
        assert_eq!(derive_module_name("pkg.sub.leaf.so"), "leaf");
    }

    #[test]
    fn test_derive_module_name_strips_one_extension_only() {
        assert_eq!(derive_module_name("mylib.so.so"), "so");
    }

    #[test]
    fn test_load_error_messages_carry_context() {
        let err = LoadError::Link {
            name: "mylib".to_string(),
            path: PathBuf::from("/tmp/mylib.so"),
            reason: "bad image".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("mylib"));
        assert!(msg.contains("/tmp/mylib.so"));
        assert!(msg.contains("bad image"));

        let err = LoadError::Resolve {
            name: "foo.bar".to_string(),
            module: "bar".to_string(),
        };
        assert!(err.to_string().contains("bar"));
    }
}
