//! Nativeload - In-Process Native-Extension Loader
//!
//! Given the raw bytes of a compiled shared library and a logical module
//! name, nativeload stages the bytes where the OS dynamic linker can load
//! them, links the image, locates the conventionally-named initializer entry
//! point, brackets a process-global "current package" marker so the
//! initializer registers itself under the caller-chosen name, and returns
//! the resulting module handle.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │  caller (byte source)│  bytes + filepath + name + mode
//! └──────────┬───────────┘
//!            ▼
//! ┌──────────────────────┐
//! │ NativeLibraryLoader  │  stage → link → hook → init → resolve
//! └────┬──────┬──────┬───┘
//!      ▼      ▼      ▼
//! ┌────────┐┌──────────────┐┌────────────────┐
//! │ Native ││ Package      ││ ModuleRegistry │
//! │ Linker ││ Context slot ││ (collaborator) │
//! └────────┘└──────────────┘└────────────────┘
//! ```
//!
//! The linker boundary, the package-context slot, and the module registry
//! are all injectable, so the whole load algorithm is testable without
//! building real shared objects.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use nativeload::{InMemoryRegistry, LoadMode, LoadOptions, NativeLibraryLoader};
//!
//! let registry = Arc::new(InMemoryRegistry::new());
//! let loader = NativeLibraryLoader::new(registry);
//!
//! let staging = loader.pick_staging_folder(&[], None)?;
//! let handle = loader.load(
//!     &library_bytes,
//!     &staging.join("mylib.so"),
//!     "mylib.so",
//!     LoadMode::ManagedModule,
//!     LoadOptions::new(),
//! )?;
//! ```

#![warn(clippy::all)]

pub mod diag;
pub mod loader;

// Re-export commonly used types
pub use diag::{NullSink, StderrSink, TraceSink};
pub use loader::{
    find_writable_folder, HostModule, InMemoryRegistry, InitFn, Initializer, Linked, LoadError,
    LoadMode, LoadOptions, LoadResult, ModuleHandle, ModuleRegistry, NativeImage,
    NativeLibraryLoader, NativeLinker, OsLinker, PackageContext, PackageContextGuard,
    PostLoadHook,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
