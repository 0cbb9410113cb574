//! TDD-Light tests for the pool reinitialize lifecycle.

use std::sync::Arc;

use parking_lot::Mutex;

use strata_runtime::memory::{
    DeviceAllocator, HookError, MemoryError, MemoryManager, PoolConfig, ReinitHook,
};

fn pool_config() -> PoolConfig {
    PoolConfig { initial_bytes: 4096, max_bytes: 16384, device_index: 0 }
}

struct NamedHook {
    label: &'static str,
    log: Arc<Mutex<Vec<&'static str>>>,
    fail: bool,
}

impl ReinitHook for NamedHook {
    fn name(&self) -> &str {
        self.label
    }

    fn on_reinitialize(&self) -> Result<(), HookError> {
        self.log.lock().push(self.label);
        if self.fail {
            Err(HookError { hook: self.label.to_string(), message: "cache clear failed".to_string() })
        } else {
            Ok(())
        }
    }
}

#[test]
fn reinitialize_invokes_hooks_in_order_and_invalidates_handles() {
    let manager = MemoryManager::new(pool_config());
    let log = Arc::new(Mutex::new(Vec::new()));
    manager.register_reinitialize_hook(Arc::new(NamedHook {
        label: "h1",
        log: log.clone(),
        fail: false,
    }));
    manager.register_reinitialize_hook(Arc::new(NamedHook {
        label: "h2",
        log: log.clone(),
        fail: false,
    }));

    let stale_a = manager.allocate(128).unwrap();
    let stale_b = manager.allocate(256).unwrap();
    let generation_before = manager.generation();

    manager.reinitialize(pool_config()).unwrap();

    assert_eq!(*log.lock(), vec!["h1", "h2"]);
    assert_eq!(manager.generation(), generation_before + 1);
    assert!(matches!(manager.free(&stale_a), Err(MemoryError::InvalidHandle { .. })));
    assert!(matches!(manager.free(&stale_b), Err(MemoryError::InvalidHandle { .. })));
}

#[test]
fn hook_failure_is_aggregated_and_swap_still_completes() {
    let manager = MemoryManager::new(pool_config());
    let log = Arc::new(Mutex::new(Vec::new()));
    manager.register_reinitialize_hook(Arc::new(NamedHook {
        label: "first-fails",
        log: log.clone(),
        fail: true,
    }));
    manager.register_reinitialize_hook(Arc::new(NamedHook {
        label: "second-fails",
        log: log.clone(),
        fail: true,
    }));
    manager.register_reinitialize_hook(Arc::new(NamedHook {
        label: "third-ok",
        log: log.clone(),
        fail: false,
    }));

    let err = manager.reinitialize(pool_config()).unwrap_err();

    match err {
        MemoryError::HookFailure(failures) => {
            assert_eq!(failures.len(), 2);
            assert_eq!(failures[0].hook, "first-fails");
            assert_eq!(failures[1].hook, "second-fails");
        }
        other => panic!("expected HookFailure, got {}", other),
    }
    assert_eq!(*log.lock(), vec!["first-fails", "second-fails", "third-ok"]);
    assert_eq!(manager.generation(), 2);

    // The new pool is usable despite the hook failures.
    let buf = manager.allocate(64).unwrap();
    manager.free(&buf).unwrap();
}

#[test]
fn reinitialize_can_change_pool_sizing() {
    let manager = MemoryManager::new(pool_config());
    let _big = manager.allocate(16384).unwrap();

    manager
        .reinitialize(PoolConfig { initial_bytes: 1024, max_bytes: 2048, device_index: 0 })
        .unwrap();

    // New growth ceiling applies.
    let result = manager.allocate(4096);
    assert!(matches!(result, Err(MemoryError::OutOfMemory { .. })));
    let ok = manager.allocate(2048).unwrap();
    assert_eq!(ok.generation, 2);
}

#[test]
fn each_reinitialize_invokes_hooks_exactly_once() {
    let manager = MemoryManager::new(pool_config());
    let log = Arc::new(Mutex::new(Vec::new()));
    manager.register_reinitialize_hook(Arc::new(NamedHook {
        label: "h",
        log: log.clone(),
        fail: false,
    }));

    manager.reinitialize(pool_config()).unwrap();
    manager.reinitialize(pool_config()).unwrap();
    manager.reinitialize(pool_config()).unwrap();

    assert_eq!(log.lock().len(), 3);
    assert_eq!(manager.generation(), 4);
}
