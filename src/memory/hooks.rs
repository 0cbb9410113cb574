// Copyright 2024-2026 Strata Contributors
// Licensed under the Apache License, Version 2.0

//! Reinitialization hook registry.
//!
//! Components caching device-buffer-derived state register here; the
//! `MemoryManager` invokes every hook synchronously whenever the pool is torn
//! down and rebuilt, so no cache outlives the generation it describes.

use std::sync::Arc;

use parking_lot::Mutex;

/// One hook failure; `reinitialize` aggregates these into `HookFailure`.
#[derive(Debug, Clone)]
pub struct HookError {
    pub hook: String,
    pub message: String,
}

impl std::fmt::Display for HookError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.hook, self.message)
    }
}

/// Callback invoked on every pool reinitialization.
///
/// Implementations must not assume any handle from a prior generation is
/// still valid when this runs.
pub trait ReinitHook: Send + Sync {
    /// Identifier used in failure reports.
    fn name(&self) -> &str;

    fn on_reinitialize(&self) -> Result<(), HookError>;
}

/// Identity of one registration, returned by `register`.
///
/// Registering the same hook twice yields two tokens and two invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookToken(u64);

/// Ordered registry of reinitialization hooks.
pub struct ReinitHookRegistry {
    hooks: Mutex<Vec<(HookToken, Arc<dyn ReinitHook>)>>,
    next_token: Mutex<u64>,
}

impl ReinitHookRegistry {
    pub fn new() -> Self {
        Self {
            hooks: Mutex::new(Vec::new()),
            next_token: Mutex::new(1),
        }
    }

    /// Add a hook to the invocation set. Hooks run in registration order.
    pub fn register(&self, hook: Arc<dyn ReinitHook>) -> HookToken {
        let token = {
            let mut next = self.next_token.lock();
            let t = HookToken(*next);
            *next += 1;
            t
        };
        self.hooks.lock().push((token, hook));
        token
    }

    /// Remove a previously registered hook. Unknown tokens are ignored.
    pub fn unregister(&self, token: HookToken) {
        self.hooks.lock().retain(|(t, _)| *t != token);
    }

    /// Invoke every registered hook in registration order.
    ///
    /// A failing hook does not stop later hooks; all failures are returned.
    pub fn invoke_all(&self) -> Vec<HookError> {
        // Snapshot under the lock, invoke outside it: a hook may register or
        // unregister other hooks.
        let snapshot: Vec<Arc<dyn ReinitHook>> =
            self.hooks.lock().iter().map(|(_, h)| h.clone()).collect();

        let mut failures = Vec::new();
        for hook in snapshot {
            if let Err(e) = hook.on_reinitialize() {
                tracing::warn!(hook = %e.hook, error = %e.message, "reinitialize hook failed");
                failures.push(e);
            }
        }
        failures
    }

    pub fn len(&self) -> usize {
        self.hooks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.lock().is_empty()
    }
}

impl Default for ReinitHookRegistry {
    fn default() -> Self {
        Self::new()
    }
}
