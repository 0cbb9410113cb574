// Copyright 2024-2026 Strata Contributors
// Licensed under the Apache License, Version 2.0

//! Device allocator interface shared by every GPU-consuming subsystem.

use thiserror::Error;

use super::hooks::HookError;

/// A handle representing one device memory allocation.
///
/// Handles are valid only within the pool generation that produced them;
/// after a reinitialize, freeing a stale handle fails with `InvalidHandle`.
#[derive(Debug, Clone)]
pub struct DeviceBuffer {
    pub id: u64,
    pub size: usize,
    pub generation: u64,
    pub device_index: usize,
}

/// Trait abstracting device memory allocation.
///
/// Client subsystems (array compute, interop) consume this interface only;
/// the concrete backend is always the process-wide `MemoryManager`.
pub trait DeviceAllocator: Send + Sync {
    fn allocate(&self, size: usize) -> Result<DeviceBuffer, MemoryError>;
    fn free(&self, buffer: &DeviceBuffer) -> Result<(), MemoryError>;
    fn allocated_bytes(&self) -> usize;
}

/// Device memory error taxonomy.
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("out of device memory: requested {requested} bytes, available {available} bytes")]
    OutOfMemory { requested: usize, available: usize },

    #[error("invalid buffer handle id={id}: {reason}")]
    InvalidHandle { id: u64, reason: String },

    #[error("{} reinitialize hook(s) failed: {}", .0.len(), format_hook_errors(.0))]
    HookFailure(Vec<HookError>),
}

fn format_hook_errors(errors: &[HookError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
