//! Strata Runtime
//!
//! Initialization and process-wide configuration substrate for the Strata
//! GPU dataframe library. Brings the process into a consistent state before
//! any device computation occurs:
//!
//! - **Compatibility gate**: driver/runtime version validation before any
//!   device context exists, plus the read-once minor-version-compatibility
//!   flag.
//! - **Device memory manager**: one shared pool behind every GPU-consuming
//!   subsystem, with a generation-tracked reinitialize lifecycle.
//! - **Allocator adapters**: per-subsystem shims forwarding into the shared
//!   manager.
//! - **Reinitialization hooks**: caches holding device-derived state clear
//!   themselves when the pool is rebuilt.
//! - **Option registry**: dotted option names with validated values and
//!   scoped overrides.
//!
//! Columnar algorithms, query execution, and file-format I/O live elsewhere;
//! this crate is only the substrate they run on.

pub mod config;
pub mod memory;
pub mod options;
pub mod setup;
pub mod telemetry;

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use memory::{
    AdapterRegistry, BufferCache, BufferCacheConfig, HookToken, MemoryError, MemoryManager,
    PoolConfig, ReinitHook,
};
use options::OptionRegistry;
use setup::{DeviceProbe, SetupError, SetupReport};

/// Client subsystems bound to the shared allocator at initialization.
pub const ARRAY_CLIENT: &str = "array";
pub const INTEROP_CLIENT: &str = "interop";

/// Errors raised while bringing up the runtime context.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error(transparent)]
    Setup(#[from] SetupError),
}

/// Context construction parameters.
#[derive(Debug, Clone, Default)]
pub struct ContextConfig {
    pub pool: PoolConfig,
}

/// The runtime context.
///
/// Owns the option registry, the device memory manager, and the adapter
/// registry. Constructed explicitly and injected into dependent components;
/// tests can hold multiple isolated instances.
pub struct Context {
    options: OptionRegistry,
    memory: Arc<MemoryManager>,
    adapters: AdapterRegistry,
    buffer_cache: Arc<BufferCache>,
    setup: SetupReport,
}

impl Context {
    /// Bring the process into a consistent state for device computation.
    ///
    /// The sequence is fixed and ordering-sensitive: the compatibility flag
    /// is set before anything touches the compute runtime (it is read once
    /// at the runtime's first initialization), versions are validated before
    /// any device context is created, and only then is the memory manager
    /// constructed and installed behind every client subsystem.
    pub fn initialize(
        config: ContextConfig,
        probe: &dyn DeviceProbe,
    ) -> Result<Self, ContextError> {
        setup::configure_compatibility_mode();
        let report = setup::validate_setup(probe)?;

        let memory = Arc::new(MemoryManager::new(config.pool));
        let adapters = AdapterRegistry::new();
        adapters.bind(ARRAY_CLIENT, memory.clone());
        adapters.bind(INTEROP_CLIENT, memory.clone());

        let buffer_cache = Arc::new(BufferCache::new(BufferCacheConfig::default()));
        memory.register_reinitialize_hook(buffer_cache.clone());

        let options = OptionRegistry::with_builtin_options();

        info!(
            devices = report.device_count,
            clients = adapters.len(),
            "runtime context initialized"
        );

        Ok(Self { options, memory, adapters, buffer_cache, setup: report })
    }

    pub fn options(&self) -> &OptionRegistry {
        &self.options
    }

    pub fn memory(&self) -> &Arc<MemoryManager> {
        &self.memory
    }

    pub fn adapters(&self) -> &AdapterRegistry {
        &self.adapters
    }

    pub fn buffer_cache(&self) -> &Arc<BufferCache> {
        &self.buffer_cache
    }

    pub fn setup_report(&self) -> &SetupReport {
        &self.setup
    }

    /// Register a callback for pool reinitialization events.
    pub fn register_reinitialize_hook(&self, hook: Arc<dyn ReinitHook>) -> HookToken {
        self.memory.register_reinitialize_hook(hook)
    }

    /// Tear down and rebuild the device memory pool.
    pub fn reinitialize_pool(&self, config: PoolConfig) -> Result<(), MemoryError> {
        self.memory.reinitialize(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::DeviceAllocator;
    use crate::setup::MockDeviceProbe;

    #[test]
    fn initialize_wires_all_subsystems() {
        let ctx = Context::initialize(ContextConfig::default(), &MockDeviceProbe::default())
            .unwrap();
        assert!(ctx.adapters().binding(ARRAY_CLIENT).is_some());
        assert!(ctx.adapters().binding(INTEROP_CLIENT).is_some());
        assert_eq!(ctx.memory().generation(), 1);
        assert!(ctx.options().get("display.max_rows").is_ok());
    }

    #[test]
    fn initialize_fails_on_incompatible_setup() {
        let probe = MockDeviceProbe { devices: 0, ..Default::default() };
        let result = Context::initialize(ContextConfig::default(), &probe);
        assert!(matches!(result, Err(ContextError::Setup(SetupError::NoDevice))));
    }

    #[test]
    fn buffer_cache_is_cleared_on_reinitialize() {
        let ctx = Context::initialize(ContextConfig::default(), &MockDeviceProbe::default())
            .unwrap();
        let binding = ctx.adapters().binding(ARRAY_CLIENT).unwrap();
        let buf = binding.allocate(64).unwrap();
        ctx.buffer_cache().store("col".to_string(), buf);
        ctx.reinitialize_pool(PoolConfig::default()).unwrap();
        assert!(ctx.buffer_cache().is_empty());
    }

    #[test]
    fn contexts_are_isolated() {
        let probe = MockDeviceProbe::default();
        let a = Context::initialize(ContextConfig::default(), &probe).unwrap();
        let b = Context::initialize(ContextConfig::default(), &probe).unwrap();
        a.options().set("display.max_rows", options::OptionValue::Int(5)).unwrap();
        assert_eq!(
            b.options().get("display.max_rows").unwrap(),
            options::OptionValue::Int(60)
        );
    }
}
