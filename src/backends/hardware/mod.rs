// SPDX-License-Identifier: GPL-3.0-only

//! Hardware provider abstraction
//!
//! The broker never talks to a driver directly. Everything it knows about the
//! devices comes through these traits:
//!
//! ```text
//! ┌─────────────────────┐
//! │     Enumerator      │
//! └──────────┬──────────┘
//!            │ init(name)
//!            ▼
//! ┌─────────────────────┐
//! │  ProviderRegistry   │  ← name → provider lookup
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐      ┌────────────────┐
//! │  HardwareProvider   │ ───▶ │ CameraHandle   │
//! └─────────────────────┘      │ DisplayHandle  │
//!                              └────────────────┘
//! ```
//!
//! All calls are synchronous and report failure through empty results or
//! status codes, never by panicking.

pub mod registry;
pub mod simulated;
pub mod types;

pub use registry::{ProviderRegistry, StaticRegistry};
pub use simulated::{ProviderStats, SimulatedProvider};
pub use types::*;

use std::sync::Arc;

/// A device provider backed by real (or simulated) hardware
pub trait HardwareProvider: Send + Sync {
    /// List the cameras the provider knows about
    fn list_devices(&self) -> Vec<CameraDesc>;

    /// Open a camera for exclusive use
    ///
    /// Returns `None` if the camera does not exist or is already in use.
    fn open_camera(&self, camera_id: &str) -> Option<Arc<dyn CameraHandle>>;

    /// Release a camera previously returned by [`HardwareProvider::open_camera`]
    fn close_camera(&self, camera: Arc<dyn CameraHandle>);

    /// Open the display
    ///
    /// Providers with a single display invalidate any handle they issued
    /// earlier when a new one is opened.
    fn open_display(&self) -> Option<Arc<dyn DisplayHandle>>;

    /// Release a display previously returned by [`HardwareProvider::open_display`]
    fn close_display(&self, display: Arc<dyn DisplayHandle>);
}

/// An open hardware camera
pub trait CameraHandle: Send + Sync {
    fn info(&self) -> CameraDesc;

    fn start_video_stream(&self) -> StatusCode;

    /// Give a frame buffer back to the device
    fn done_with_frame(&self, buffer: BufferDesc);

    fn stop_video_stream(&self);
}

/// An open hardware display
pub trait DisplayHandle: Send + Sync {
    fn info(&self) -> DisplayDesc;

    fn set_display_state(&self, state: DisplayState) -> StatusCode;

    fn get_display_state(&self) -> DisplayState;

    /// Borrow the buffer the next frame should be drawn into
    fn get_target_buffer(&self) -> Option<BufferDesc>;

    /// Hand a filled buffer back for presentation
    fn return_target_buffer(&self, buffer: BufferDesc) -> StatusCode;
}
