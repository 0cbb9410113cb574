// Copyright 2024-2026 Strata Contributors
// Licensed under the Apache License, Version 2.0

//! Allocator adapters for client subsystems.
//!
//! Each GPU-consuming subsystem (array compute, interop) calls through its own
//! binding, but every binding forwards to the one shared `MemoryManager`, so
//! the process holds a single pool rather than one reservation per subsystem.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use super::allocator::{DeviceAllocator, DeviceBuffer, MemoryError};
use super::manager::MemoryManager;

/// A pure-forwarding allocation shim for one named client subsystem.
#[derive(Clone)]
pub struct AllocatorBinding {
    client: String,
    manager: Arc<MemoryManager>,
}

impl AllocatorBinding {
    pub fn client(&self) -> &str {
        &self.client
    }

    pub fn manager(&self) -> &Arc<MemoryManager> {
        &self.manager
    }
}

impl DeviceAllocator for AllocatorBinding {
    fn allocate(&self, size: usize) -> Result<DeviceBuffer, MemoryError> {
        self.manager.allocate(size)
    }

    fn free(&self, buffer: &DeviceBuffer) -> Result<(), MemoryError> {
        self.manager.free(buffer)
    }

    fn allocated_bytes(&self) -> usize {
        self.manager.allocated_bytes()
    }
}

/// Registry of (client subsystem -> backing manager) associations.
pub struct AdapterRegistry {
    bindings: DashMap<String, AllocatorBinding>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self { bindings: DashMap::new() }
    }

    /// Install `manager` as the allocation backend for `client_id`.
    ///
    /// Idempotent per client: re-binding replaces the backend reference,
    /// never double-wraps.
    pub fn bind(&self, client_id: &str, manager: Arc<MemoryManager>) -> AllocatorBinding {
        let binding = AllocatorBinding { client: client_id.to_string(), manager };
        debug!(client = client_id, "bound allocator backend");
        self.bindings.insert(client_id.to_string(), binding.clone());
        binding
    }

    /// Look up the binding for a client subsystem.
    pub fn binding(&self, client_id: &str) -> Option<AllocatorBinding> {
        self.bindings.get(client_id).map(|b| b.value().clone())
    }

    /// Names of all bound client subsystems.
    pub fn clients(&self) -> Vec<String> {
        self.bindings.iter().map(|b| b.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
