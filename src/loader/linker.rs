//! Dynamic Linker Boundary
//!
//! Narrow, trait-shaped wrapper over the OS dynamic linker. Two linking
//! styles exist: "plain" (opaque handle, default lazy/local binding) and
//! "managed" (host-runtime-aware load whose symbols stay visible to images
//! loaded afterwards). Both take a filesystem path and yield a symbol-
//! addressable image.
//!
//! All FFI unsafety lives in this module: constructing the `Library`,
//! looking up the initializer symbol, and the indirect call through the raw
//! zero-argument function pointer.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use libloading::Library;

/// ABI of the conventional native initializer entry point.
pub type InitFn = unsafe extern "C" fn();

/// An invokable initializer entry point found inside a loaded image.
pub struct Initializer {
    call: Box<dyn Fn() -> Result<(), String> + Send + Sync>,
}

impl Initializer {
    /// Wrap an arbitrary invocation. Mock linkers use this directly; the OS
    /// image wraps its raw entry point here.
    pub fn new(call: impl Fn() -> Result<(), String> + Send + Sync + 'static) -> Self {
        Self {
            call: Box::new(call),
        }
    }

    /// Call the initializer once.
    pub fn invoke(&self) -> Result<(), String> {
        (self.call)()
    }
}

/// A native library image loaded into the process.
pub trait NativeImage: Send + Sync {
    /// On-disk path the image was linked from.
    fn path(&self) -> &Path;

    /// Look up a zero-argument, no-return entry point by symbol name.
    ///
    /// Absence is `None`, never an error: libraries without an initializer
    /// are legal.
    fn find_initializer(&self, symbol: &str) -> Option<Initializer>;
}

/// The OS dynamic linker's two entry points.
pub trait NativeLinker: Send + Sync {
    /// Host-runtime-aware load (richer invocation semantics for the
    /// initializer protocol).
    fn load_managed(&self, path: &Path) -> Result<Box<dyn NativeImage>, String>;

    /// Opaque dynamic-library load.
    fn load_plain(&self, path: &Path) -> Result<Box<dyn NativeImage>, String>;
}

/// Which linking style produced a handle.
///
/// Kept as a tagged result rather than folded into one handle type: the
/// plain arm is the fallback path, and callers may want to observe which
/// style actually won.
pub enum Linked {
    Managed(Arc<dyn NativeImage>),
    Plain(Arc<dyn NativeImage>),
}

impl Linked {
    /// The loaded image, whichever style produced it.
    pub fn image(&self) -> &Arc<dyn NativeImage> {
        match self {
            Linked::Managed(image) | Linked::Plain(image) => image,
        }
    }

    /// Human-readable style tag for diagnostics.
    pub fn style(&self) -> &'static str {
        match self {
            Linked::Managed(_) => "managed",
            Linked::Plain(_) => "plain",
        }
    }
}

/// Linker backed by the host OS loader via `libloading`.
pub struct OsLinker;

impl NativeLinker for OsLinker {
    fn load_managed(&self, path: &Path) -> Result<Box<dyn NativeImage>, String> {
        #[cfg(unix)]
        {
            use libloading::os::unix::{Library as UnixLibrary, RTLD_GLOBAL, RTLD_NOW};

            // Safety: loading a native library executes its constructors;
            // the caller vouches for the staged bytes.
            let library =
                unsafe { UnixLibrary::open(Some(path.as_os_str()), RTLD_NOW | RTLD_GLOBAL) }
                    .map_err(|e| e.to_string())?;

            Ok(Box::new(OsImage {
                path: path.to_path_buf(),
                library: Arc::new(library.into()),
            }))
        }

        #[cfg(not(unix))]
        {
            // No binding-style distinction on this target; same entry point
            // as the plain load.
            self.load_plain(path)
        }
    }

    fn load_plain(&self, path: &Path) -> Result<Box<dyn NativeImage>, String> {
        // Safety: see load_managed.
        let library = unsafe { Library::new(path) }.map_err(|e| e.to_string())?;

        Ok(Box::new(OsImage {
            path: path.to_path_buf(),
            library: Arc::new(library),
        }))
    }
}

/// Image handle produced by [`OsLinker`].
pub struct OsImage {
    path: PathBuf,
    library: Arc<Library>,
}

impl NativeImage for OsImage {
    fn path(&self) -> &Path {
        &self.path
    }

    fn find_initializer(&self, symbol: &str) -> Option<Initializer> {
        let mut name = symbol.as_bytes().to_vec();
        name.push(0);

        // Safety: the symbol is declared with the conventional zero-argument,
        // no-return initializer ABI. This is the single site bridging the C
        // entry point; a symbol of any other shape is undefined behavior on
        // invocation, which is inherent to the dlsym contract.
        let entry: InitFn = match unsafe { self.library.get::<InitFn>(&name) } {
            Ok(symbol) => *symbol,
            Err(_) => return None,
        };

        // The Arc keeps the image mapped for as long as the initializer can
        // still be invoked.
        let library = Arc::clone(&self.library);
        Some(Initializer::new(move || {
            let _mapped = &library;
            unsafe { entry() };
            Ok(())
        }))
    }
}
