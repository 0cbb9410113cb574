// Copyright 2024-2026 Strata Contributors
// Licensed under the Apache License, Version 2.0

//! Runtime compatibility gate.
//!
//! Runs before any device context is created: checks that the installed
//! driver and compute runtime can work together, and sets the process-wide
//! minor-version-compatibility flag. The flag is read once by the compute
//! runtime at its first touch, so `configure_compatibility_mode` must run
//! before anything else reaches the device - `Context::initialize` enforces
//! that ordering.

use std::sync::Once;

use thiserror::Error;
use tracing::{debug, warn};

/// Env flag enabling the minor-version-compatibility shim.
/// Read-once: has no effect after the compute runtime initializes.
pub const COMPAT_MODE_ENV: &str = "STRATA_MINOR_VERSION_COMPAT";

/// Oldest compute capability the library supports.
pub const MIN_COMPUTE_CAPABILITY: (u32, u32) = (6, 0);

static COMPAT_MODE: Once = Once::new();

/// Setup error taxonomy. All variants are fatal; startup should abort.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("no compute device detected; a GPU with compute capability {}.{}+ is required",
        MIN_COMPUTE_CAPABILITY.0, MIN_COMPUTE_CAPABILITY.1)]
    NoDevice,

    #[error("device {device} has compute capability {major}.{minor}, \
             minimum supported is {}.{}",
        MIN_COMPUTE_CAPABILITY.0, MIN_COMPUTE_CAPABILITY.1)]
    UnsupportedComputeCapability { device: usize, major: u32, minor: u32 },

    #[error("driver version {driver_major}.{driver_minor} is older than runtime version \
             {runtime_major}.{runtime_minor}; upgrade the driver or pin the runtime \
             to a version the driver supports")]
    DriverRuntimeMismatch {
        driver_major: u32,
        driver_minor: u32,
        runtime_major: u32,
        runtime_minor: u32,
    },

    #[error("device probe failed: {0}")]
    ProbeFailed(String),
}

/// Queries the installed driver, runtime, and devices.
///
/// Abstracted as a trait so the gate is testable without hardware; the
/// `cuda` feature provides a probe backed by the real driver.
pub trait DeviceProbe: Send + Sync {
    fn device_count(&self) -> Result<usize, SetupError>;
    fn compute_capability(&self, device: usize) -> Result<(u32, u32), SetupError>;
    fn driver_version(&self) -> Result<(u32, u32), SetupError>;
    fn runtime_version(&self) -> Result<(u32, u32), SetupError>;
}

/// What `validate_setup` observed. No side effects are taken on success.
#[derive(Debug, Clone)]
pub struct SetupReport {
    pub device_count: usize,
    pub compute_capability: (u32, u32),
    pub driver_version: (u32, u32),
    pub runtime_version: (u32, u32),
    /// Whether the driver is older-minor than the runtime and the
    /// compatibility shim is what makes the combination workable.
    pub minor_version_compat_active: bool,
}

/// Inspect driver and runtime versions; fail on known-incompatible setups.
///
/// Must execute strictly before any device context is created - enforced by
/// `Context::initialize` ordering, not by checks here.
pub fn validate_setup(probe: &dyn DeviceProbe) -> Result<SetupReport, SetupError> {
    let device_count = probe.device_count()?;
    if device_count == 0 {
        return Err(SetupError::NoDevice);
    }

    let (major, minor) = probe.compute_capability(0)?;
    if (major, minor) < MIN_COMPUTE_CAPABILITY {
        return Err(SetupError::UnsupportedComputeCapability { device: 0, major, minor });
    }

    let driver = probe.driver_version()?;
    let runtime = probe.runtime_version()?;

    // An older driver major cannot run a newer runtime at all. A same-major,
    // older-minor driver works only through the compatibility shim.
    let minor_version_compat_active = if driver < runtime {
        if driver.0 < runtime.0 || !compatibility_mode_enabled() {
            return Err(SetupError::DriverRuntimeMismatch {
                driver_major: driver.0,
                driver_minor: driver.1,
                runtime_major: runtime.0,
                runtime_minor: runtime.1,
            });
        }
        warn!(
            driver = %format!("{}.{}", driver.0, driver.1),
            runtime = %format!("{}.{}", runtime.0, runtime.1),
            "driver older than runtime; relying on minor version compatibility"
        );
        true
    } else {
        false
    };

    debug!(
        device_count,
        compute_capability = %format!("{}.{}", major, minor),
        "device setup validated"
    );

    Ok(SetupReport {
        device_count,
        compute_capability: (major, minor),
        driver_version: driver,
        runtime_version: runtime,
        minor_version_compat_active,
    })
}

/// Set the process-wide minor-version-compatibility flag.
///
/// Idempotent; later calls are no-ops. The flag only has effect if set
/// before the compute runtime first initializes.
pub fn configure_compatibility_mode() {
    COMPAT_MODE.call_once(|| {
        std::env::set_var(COMPAT_MODE_ENV, "1");
        debug!(flag = COMPAT_MODE_ENV, "minor version compatibility mode enabled");
    });
}

/// Whether the compatibility flag is set in this process.
pub fn compatibility_mode_enabled() -> bool {
    std::env::var(COMPAT_MODE_ENV).map(|v| v == "1").unwrap_or(false)
}

/// Configurable probe for tests and CPU-only environments.
#[derive(Debug, Clone)]
pub struct MockDeviceProbe {
    pub devices: usize,
    pub compute_capability: (u32, u32),
    pub driver: (u32, u32),
    pub runtime: (u32, u32),
}

impl Default for MockDeviceProbe {
    fn default() -> Self {
        Self {
            devices: 1,
            compute_capability: (8, 0),
            driver: (12, 4),
            runtime: (12, 4),
        }
    }
}

impl DeviceProbe for MockDeviceProbe {
    fn device_count(&self) -> Result<usize, SetupError> {
        Ok(self.devices)
    }

    fn compute_capability(&self, _device: usize) -> Result<(u32, u32), SetupError> {
        Ok(self.compute_capability)
    }

    fn driver_version(&self) -> Result<(u32, u32), SetupError> {
        Ok(self.driver)
    }

    fn runtime_version(&self) -> Result<(u32, u32), SetupError> {
        Ok(self.runtime)
    }
}

/// Probe backed by the CUDA driver API.
#[cfg(feature = "cuda")]
pub struct CudaDeviceProbe {
    /// Runtime version the library was built against, e.g. (12, 4).
    pub built_against: (u32, u32),
}

#[cfg(feature = "cuda")]
impl DeviceProbe for CudaDeviceProbe {
    fn device_count(&self) -> Result<usize, SetupError> {
        cudarc::driver::CudaDevice::count()
            .map(|n| n as usize)
            .map_err(|e| SetupError::ProbeFailed(e.to_string()))
    }

    fn compute_capability(&self, device: usize) -> Result<(u32, u32), SetupError> {
        use cudarc::driver::sys::CUdevice_attribute;
        let dev = cudarc::driver::CudaDevice::new(device)
            .map_err(|e| SetupError::ProbeFailed(e.to_string()))?;
        let major = dev
            .attribute(CUdevice_attribute::CU_DEVICE_ATTRIBUTE_COMPUTE_CAPABILITY_MAJOR)
            .map_err(|e| SetupError::ProbeFailed(e.to_string()))?;
        let minor = dev
            .attribute(CUdevice_attribute::CU_DEVICE_ATTRIBUTE_COMPUTE_CAPABILITY_MINOR)
            .map_err(|e| SetupError::ProbeFailed(e.to_string()))?;
        Ok((major as u32, minor as u32))
    }

    fn driver_version(&self) -> Result<(u32, u32), SetupError> {
        let mut raw: std::os::raw::c_int = 0;
        let status = unsafe { cudarc::driver::sys::cuDriverGetVersion(&mut raw) };
        if status != cudarc::driver::sys::CUresult::CUDA_SUCCESS {
            return Err(SetupError::ProbeFailed(format!("cuDriverGetVersion: {:?}", status)));
        }
        Ok(((raw / 1000) as u32, ((raw % 1000) / 10) as u32))
    }

    fn runtime_version(&self) -> Result<(u32, u32), SetupError> {
        Ok(self.built_against)
    }
}
