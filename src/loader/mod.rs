//! Native Extension Loading
//!
//! Materializes a compiled shared library from raw bytes into the process:
//! stage the bytes where the OS dynamic linker can see them, link, run the
//! conventionally-named initializer under a scoped package context, and hand
//! back the resulting module.
//!
//! # Data flow
//!
//! ```text
//! caller
//!   │  bytes + filepath + logical name + mode
//!   ▼
//! NativeLibraryLoader::load
//!   │  write + flush
//!   ▼
//! NativeLinker (managed, falling back to plain)
//!   │  optional post-load hook
//!   ▼
//! initializer lookup ──── absent ────┐
//!   │ found                          │
//!   ▼                                │
//! PackageContext::scoped(module)     │
//!   │  invoke init<module>()         │
//!   ▼                                ▼
//! ModuleRegistry::resolve(module) ──► ModuleHandle
//! ```
//!
//! Raw loads (`LoadMode::RawHandle`) stop after the hook and return the
//! opaque library handle; they never touch the package context.

mod context;
mod folder;
mod linker;
mod native;
mod registry;

pub use context::{PackageContext, PackageContextGuard};
pub use folder::find_writable_folder;
pub use linker::{InitFn, Initializer, Linked, NativeImage, NativeLinker, OsLinker};
pub use native::{LoadError, LoadMode, LoadOptions, LoadResult, NativeLibraryLoader, PostLoadHook};
pub use registry::{HostModule, InMemoryRegistry, ModuleHandle, ModuleRegistry};
