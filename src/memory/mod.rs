// Copyright 2024-2026 Strata Contributors
// Licensed under the Apache License, Version 2.0

//! Device memory management.
//!
//! One `MemoryManager` backs every GPU-consuming subsystem through allocator
//! adapters, with a hook registry propagating pool reinitialization events to
//! dependent caches.

mod adapter;
mod allocator;
mod cache;
mod hooks;
mod manager;
mod pool;

pub use adapter::{AdapterRegistry, AllocatorBinding};
pub use allocator::{DeviceAllocator, DeviceBuffer, MemoryError};
pub use cache::{BufferCache, BufferCacheConfig};
pub use hooks::{HookError, HookToken, ReinitHook, ReinitHookRegistry};
pub use manager::MemoryManager;
pub use pool::{DevicePool, PoolConfig};
