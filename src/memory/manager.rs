// Copyright 2024-2026 Strata Contributors
// Licensed under the Apache License, Version 2.0

//! The single authority for device memory allocation.
//!
//! Every client subsystem allocates through one `MemoryManager`, so the
//! process holds one shared pool instead of per-subsystem reservations that
//! fragment the device. Reinitialization is a single well-defined event:
//! the pool is swapped, the generation advances, and every registered hook
//! runs before control returns to the caller.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use super::allocator::{DeviceAllocator, DeviceBuffer, MemoryError};
use super::hooks::{HookToken, ReinitHook, ReinitHookRegistry};
use super::pool::{DevicePool, PoolConfig};

/// Process-wide device memory manager.
pub struct MemoryManager {
    pool: Mutex<DevicePool>,
    hooks: ReinitHookRegistry,
    next_id: AtomicU64,
}

impl MemoryManager {
    pub fn new(config: PoolConfig) -> Self {
        info!(
            initial_bytes = config.initial_bytes,
            max_bytes = config.max_bytes,
            device_index = config.device_index,
            "creating device memory pool"
        );
        Self {
            pool: Mutex::new(DevicePool::new(config, 1)),
            hooks: ReinitHookRegistry::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Atomically replace the pool with a new one built from `config`.
    ///
    /// All handles from the prior generation become invalid the instant this
    /// call begins. Every registered hook is then invoked synchronously in
    /// registration order; hook failures are aggregated into `HookFailure`
    /// but do not roll back the swap - hooks observe the new generation.
    pub fn reinitialize(&self, config: PoolConfig) -> Result<(), MemoryError> {
        let generation = {
            let mut pool = self.pool.lock();
            let generation = pool.generation() + 1;
            *pool = DevicePool::new(config, generation);
            generation
        };
        info!(generation, "device memory pool reinitialized");

        let failures = self.hooks.invoke_all();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(MemoryError::HookFailure(failures))
        }
    }

    /// Register a callback for pool reinitialization events.
    pub fn register_reinitialize_hook(&self, hook: Arc<dyn ReinitHook>) -> HookToken {
        self.hooks.register(hook)
    }

    /// Remove a previously registered reinitialization hook.
    pub fn unregister_reinitialize_hook(&self, token: HookToken) {
        self.hooks.unregister(token);
    }

    /// Current pool generation.
    pub fn generation(&self) -> u64 {
        self.pool.lock().generation()
    }

    /// Current pool capacity (after any growth).
    pub fn capacity(&self) -> usize {
        self.pool.lock().capacity()
    }

    /// Count of live allocations in the current generation.
    pub fn live_allocations(&self) -> usize {
        self.pool.lock().live_allocations()
    }
}

impl DeviceAllocator for MemoryManager {
    fn allocate(&self, size: usize) -> Result<DeviceBuffer, MemoryError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut pool = self.pool.lock();
        pool.reserve(id, size)?;
        debug!(id, size, generation = pool.generation(), "allocated device buffer");
        Ok(DeviceBuffer {
            id,
            size,
            generation: pool.generation(),
            device_index: pool.device_index(),
        })
    }

    fn free(&self, buffer: &DeviceBuffer) -> Result<(), MemoryError> {
        let mut pool = self.pool.lock();
        if buffer.generation != pool.generation() {
            return Err(MemoryError::InvalidHandle {
                id: buffer.id,
                reason: format!(
                    "stale handle: generation {} but pool is at generation {}",
                    buffer.generation,
                    pool.generation()
                ),
            });
        }
        pool.release(buffer.id)
    }

    fn allocated_bytes(&self) -> usize {
        self.pool.lock().used()
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
