// Copyright 2024-2026 Strata Contributors
// Licensed under the Apache License, Version 2.0

//! Cache of materialized device buffers.
//!
//! Uses DashMap for lock-free concurrent access. The cache registers as a
//! reinitialization hook: a cached handle describes memory in one specific
//! pool generation, so the whole cache is dropped when the pool is rebuilt.

use dashmap::DashMap;

use super::allocator::DeviceBuffer;
use super::hooks::{HookError, ReinitHook};

/// Configuration for the device buffer cache.
#[derive(Debug, Clone)]
pub struct BufferCacheConfig {
    pub max_entries: usize,
}

impl Default for BufferCacheConfig {
    fn default() -> Self {
        Self { max_entries: 128 }
    }
}

/// Concurrent cache of previously materialized device buffers.
pub struct BufferCache {
    entries: DashMap<String, DeviceBuffer>,
    config: BufferCacheConfig,
}

impl BufferCache {
    pub fn new(config: BufferCacheConfig) -> Self {
        Self {
            entries: DashMap::with_capacity(config.max_entries),
            config,
        }
    }

    /// Store a buffer handle under the given key, evicting if full.
    pub fn store(&self, key: String, buffer: DeviceBuffer) {
        if self.entries.len() >= self.config.max_entries {
            self.evict_one();
        }
        self.entries.insert(key, buffer);
    }

    /// Retrieve a cached buffer handle.
    pub fn get(&self, key: &str) -> Option<DeviceBuffer> {
        self.entries.get(key).map(|e| e.value().clone())
    }

    /// Drop every cached handle.
    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_one(&self) {
        let key = self.entries.iter().next().map(|e| e.key().clone());
        if let Some(key) = key {
            self.entries.remove(&key);
        }
    }
}

impl ReinitHook for BufferCache {
    fn name(&self) -> &str {
        "buffer-cache"
    }

    fn on_reinitialize(&self) -> Result<(), HookError> {
        self.clear();
        Ok(())
    }
}
