// SPDX-License-Identifier: GPL-3.0-only

//! Exclusive display ownership

use crate::backends::hardware::{BufferDesc, DisplayDesc, DisplayHandle, DisplayState, StatusCode};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Client handle on the hardware display
///
/// Owns the hardware handle until [`DisplayProxy::shutdown`]. After that every
/// operation answers with the "device gone" value for that call instead of
/// reaching the hardware.
pub struct DisplayProxy {
    hardware: Mutex<Option<Arc<dyn DisplayHandle>>>,
}

impl DisplayProxy {
    pub fn new(hardware: Arc<dyn DisplayHandle>) -> Arc<Self> {
        Arc::new(Self {
            hardware: Mutex::new(Some(hardware)),
        })
    }

    /// Drop the hardware handle
    pub fn shutdown(&self) {
        if self.release().is_some() {
            debug!("Display proxy shut down");
        }
    }

    /// Check if the proxy still owns a hardware handle
    pub fn is_alive(&self) -> bool {
        self.lock_hardware().is_some()
    }

    /// Take the hardware handle so it can be closed with the provider
    pub(crate) fn release(&self) -> Option<Arc<dyn DisplayHandle>> {
        self.lock_hardware().take()
    }

    pub fn get_info(&self) -> DisplayDesc {
        self.hardware().map(|hw| hw.info()).unwrap_or_default()
    }

    pub fn set_display_state(&self, state: DisplayState) -> StatusCode {
        match self.hardware() {
            Some(hw) => hw.set_display_state(state),
            None => StatusCode::UnderlyingServiceError,
        }
    }

    pub fn get_display_state(&self) -> DisplayState {
        match self.hardware() {
            Some(hw) => hw.get_display_state(),
            None => DisplayState::Dead,
        }
    }

    pub fn get_target_buffer(&self) -> Option<BufferDesc> {
        self.hardware()?.get_target_buffer()
    }

    pub fn return_target_buffer(&self, buffer: BufferDesc) -> StatusCode {
        match self.hardware() {
            Some(hw) => hw.return_target_buffer(buffer),
            None => StatusCode::OwnershipLost,
        }
    }

    // Cloned out so hardware calls never run under our lock
    fn hardware(&self) -> Option<Arc<dyn DisplayHandle>> {
        self.lock_hardware().clone()
    }

    fn lock_hardware(&self) -> MutexGuard<'_, Option<Arc<dyn DisplayHandle>>> {
        self.hardware.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for DisplayProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplayProxy")
            .field("alive", &self.is_alive())
            .finish()
    }
}
