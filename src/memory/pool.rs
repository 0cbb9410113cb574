// Copyright 2024-2026 Strata Contributors
// Licensed under the Apache License, Version 2.0

//! Device memory pool with geometric growth and generation tracking.

use std::collections::HashMap;

use super::allocator::MemoryError;

/// Configuration for one pool generation.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Capacity the pool starts with.
    pub initial_bytes: usize,
    /// Hard ceiling the pool may grow to.
    pub max_bytes: usize,
    /// Device the pool lives on.
    pub device_index: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            initial_bytes: 256 * 1024 * 1024,      // 256 MiB
            max_bytes: 4 * 1024 * 1024 * 1024,     // 4 GiB
            device_index: 0,
        }
    }
}

/// One lifetime of the device memory pool.
///
/// Not internally synchronized; the `MemoryManager` wraps it in a mutex and
/// serializes allocate/free against reinitialize.
pub struct DevicePool {
    config: PoolConfig,
    capacity: usize,
    used: usize,
    allocations: HashMap<u64, usize>,
    generation: u64,
}

impl DevicePool {
    pub fn new(config: PoolConfig, generation: u64) -> Self {
        let capacity = config.initial_bytes.min(config.max_bytes);
        Self {
            config,
            capacity,
            used: 0,
            allocations: HashMap::new(),
            generation,
        }
    }

    /// Reserve `size` bytes under allocation id `id`, growing capacity
    /// geometrically up to `max_bytes` if needed.
    pub fn reserve(&mut self, id: u64, size: usize) -> Result<(), MemoryError> {
        // checked_add: a request near usize::MAX must report OutOfMemory,
        // not overflow the accounting.
        let needed = match self.used.checked_add(size) {
            Some(n) if n <= self.config.max_bytes => n,
            _ => {
                return Err(MemoryError::OutOfMemory {
                    requested: size,
                    available: self.config.max_bytes - self.used,
                })
            }
        };
        if needed > self.capacity {
            self.capacity = (self.capacity.saturating_mul(2))
                .max(needed)
                .min(self.config.max_bytes);
        }
        self.allocations.insert(id, size);
        self.used = needed;
        Ok(())
    }

    /// Release the allocation under `id`. Unknown ids are double-frees.
    pub fn release(&mut self, id: u64) -> Result<(), MemoryError> {
        match self.allocations.remove(&id) {
            Some(size) => {
                self.used -= size;
                Ok(())
            }
            None => Err(MemoryError::InvalidHandle {
                id,
                reason: "double-free or unknown allocation".to_string(),
            }),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn device_index(&self) -> usize {
        self.config.device_index
    }

    /// Count of live (un-freed) allocations.
    pub fn live_allocations(&self) -> usize {
        self.allocations.len()
    }
}
