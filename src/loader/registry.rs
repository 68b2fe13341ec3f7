//! Module Registry
//!
//! The loader's view of the host's module system. Initializers register
//! themselves under the current package name; after a managed load the
//! loader resolves that name back into a usable module handle. The registry
//! itself is an external collaborator and is only specified at this
//! interface.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::linker::NativeImage;

/// A registered host-level module object.
///
/// The payload is opaque to the loader; embedders decide what a module
/// actually is. Cloning is cheap (shared payload).
#[derive(Clone)]
pub struct HostModule {
    name: String,
    object: Arc<dyn Any + Send + Sync>,
}

impl HostModule {
    /// Create a module with an embedder-defined payload.
    pub fn new(name: impl Into<String>, object: Arc<dyn Any + Send + Sync>) -> Self {
        Self {
            name: name.into(),
            object,
        }
    }

    /// Create a module with no payload (name-only registration).
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, Arc::new(()))
    }

    /// The name the module was registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The embedder-defined payload.
    pub fn object(&self) -> &Arc<dyn Any + Send + Sync> {
        &self.object
    }
}

impl fmt::Debug for HostModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostModule").field("name", &self.name).finish()
    }
}

/// Result of a successful load.
///
/// Ownership passes to the caller; the loader retains no reference after
/// returning.
pub enum ModuleHandle {
    /// Opaque dynamic-library handle (no initializer contract).
    Raw(Arc<dyn NativeImage>),
    /// Registered host module produced by the initializer protocol.
    Module(HostModule),
}

impl ModuleHandle {
    /// True for handles produced by a `RawHandle` load.
    pub fn is_raw(&self) -> bool {
        matches!(self, ModuleHandle::Raw(_))
    }

    /// The registered module, if this was a managed load.
    pub fn as_module(&self) -> Option<&HostModule> {
        match self {
            ModuleHandle::Module(module) => Some(module),
            ModuleHandle::Raw(_) => None,
        }
    }

    /// The raw image, if this was a raw load.
    pub fn as_raw(&self) -> Option<&Arc<dyn NativeImage>> {
        match self {
            ModuleHandle::Raw(image) => Some(image),
            ModuleHandle::Module(_) => None,
        }
    }
}

impl fmt::Debug for ModuleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleHandle::Raw(image) => {
                f.debug_tuple("Raw").field(&image.path().display().to_string()).finish()
            }
            ModuleHandle::Module(module) => f.debug_tuple("Module").field(module).finish(),
        }
    }
}

/// Lookup interface the loader uses after a managed initializer ran.
pub trait ModuleRegistry: Send + Sync {
    /// Resolve a registered module by name.
    fn resolve(&self, name: &str) -> Option<HostModule>;
}

/// Thread-safe map-backed registry.
pub struct InMemoryRegistry {
    modules: RwLock<HashMap<String, HostModule>>,
}

impl InMemoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            modules: RwLock::new(HashMap::new()),
        }
    }

    /// Register a module under its own name, replacing any previous entry.
    pub fn register(&self, module: HostModule) {
        self.modules
            .write()
            .insert(module.name().to_string(), module);
    }

    /// Names of all registered modules.
    pub fn registered_names(&self) -> Vec<String> {
        self.modules.read().keys().cloned().collect()
    }
}

impl ModuleRegistry for InMemoryRegistry {
    fn resolve(&self, name: &str) -> Option<HostModule> {
        self.modules.read().get(name).cloned()
    }
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_resolve() {
        let registry = InMemoryRegistry::new();
        assert!(registry.resolve("mylib").is_none());

        registry.register(HostModule::named("mylib"));
        let module = registry.resolve("mylib").expect("registered");
        assert_eq!(module.name(), "mylib");
    }

    #[test]
    fn test_register_replaces_previous_entry() {
        let registry = InMemoryRegistry::new();
        registry.register(HostModule::new("mylib", Arc::new(1u32)));
        registry.register(HostModule::new("mylib", Arc::new(2u32)));

        let module = registry.resolve("mylib").unwrap();
        let payload = module.object().downcast_ref::<u32>().copied();
        assert_eq!(payload, Some(2));
        assert_eq!(registry.registered_names(), vec!["mylib".to_string()]);
    }
}
