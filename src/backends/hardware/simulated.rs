// SPDX-License-Identifier: GPL-3.0-only

//! In-memory hardware provider
//!
//! Behaves like a single-display automotive camera HAL: each camera can be
//! opened by one owner at a time, and opening the display invalidates any
//! display handle issued before. Every provider call is counted so callers
//! can verify exactly how often the hardware was touched.

use super::{
    BufferDesc, CameraDesc, CameraHandle, DisplayDesc, DisplayHandle, DisplayState,
    HardwareProvider, StatusCode,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Identifier the simulated display reports about itself
pub const SIMULATED_DISPLAY_ID: &str = "simulated-display";

/// Buffer id handed out by the simulated display
const DISPLAY_BUFFER_ID: u32 = 1;

/// Number of provider calls seen so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProviderStats {
    pub camera_opens: u32,
    pub camera_closes: u32,
    pub display_opens: u32,
    pub display_closes: u32,
}

struct ProviderState {
    cameras: Vec<CameraDesc>,
    in_use: HashMap<String, Arc<SimulatedCamera>>,
    displays: Vec<Arc<SimulatedDisplay>>,
    stats: ProviderStats,
}

/// Simulated hardware provider
pub struct SimulatedProvider {
    state: Mutex<ProviderState>,
    has_display: bool,
    /// When false, superseded display handles keep working
    invalidate_superseded_display: bool,
    display_generation: Arc<AtomicU64>,
}

impl SimulatedProvider {
    /// Create a provider exposing the given camera ids and one display
    pub fn new<I, S>(camera_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let cameras = camera_ids.into_iter().map(CameraDesc::new).collect();
        Self {
            state: Mutex::new(ProviderState {
                cameras,
                in_use: HashMap::new(),
                displays: Vec::new(),
                stats: ProviderStats::default(),
            }),
            has_display: true,
            invalidate_superseded_display: true,
            display_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Remove the display from this provider
    pub fn without_display(mut self) -> Self {
        self.has_display = false;
        self
    }

    /// Keep earlier display handles alive when a new display is opened
    pub fn with_lenient_display(mut self) -> Self {
        self.invalidate_superseded_display = false;
        self
    }

    /// Snapshot of the call counters
    pub fn stats(&self) -> ProviderStats {
        self.lock_state().stats
    }

    /// Check whether a camera is currently held open by someone
    pub fn is_in_use(&self, camera_id: &str) -> bool {
        self.lock_state().in_use.contains_key(camera_id)
    }

    fn lock_state(&self) -> MutexGuard<'_, ProviderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl HardwareProvider for SimulatedProvider {
    fn list_devices(&self) -> Vec<CameraDesc> {
        self.lock_state().cameras.clone()
    }

    fn open_camera(&self, camera_id: &str) -> Option<Arc<dyn CameraHandle>> {
        let mut state = self.lock_state();
        state.stats.camera_opens += 1;

        let Some(desc) = state.cameras.iter().find(|c| c.camera_id == camera_id).cloned() else {
            warn!(camera_id, "Requested camera does not exist");
            return None;
        };

        if state.in_use.contains_key(camera_id) {
            warn!(camera_id, "Requested camera is already open");
            return None;
        }

        let camera = Arc::new(SimulatedCamera {
            desc,
            streaming: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        });
        state.in_use.insert(camera_id.to_string(), Arc::clone(&camera));

        debug!(camera_id, "Simulated camera opened");
        Some(camera as Arc<dyn CameraHandle>)
    }

    fn close_camera(&self, camera: Arc<dyn CameraHandle>) {
        let camera_id = camera.info().camera_id;
        let mut state = self.lock_state();
        state.stats.camera_closes += 1;

        match state.in_use.remove(&camera_id) {
            Some(sim) if std::ptr::addr_eq(Arc::as_ptr(&camera), Arc::as_ptr(&sim)) => {
                sim.stop_video_stream();
                // Other references to the handle become inert
                sim.closed.store(true, Ordering::SeqCst);
                debug!(camera_id = %camera_id, "Simulated camera closed");
            }
            Some(other) => {
                warn!(camera_id = %camera_id, "Closing a stale handle for an open camera");
                state.in_use.insert(camera_id, other);
            }
            None => warn!(camera_id = %camera_id, "Closing a camera that was not open"),
        }
    }

    fn open_display(&self) -> Option<Arc<dyn DisplayHandle>> {
        let mut state = self.lock_state();
        state.stats.display_opens += 1;
        if !self.has_display {
            warn!("Simulated provider has no display");
            return None;
        }

        let generation = self.display_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let display = Arc::new(SimulatedDisplay {
            generation,
            current_generation: Arc::clone(&self.display_generation),
            enforce_generation: self.invalidate_superseded_display,
            closed: AtomicBool::new(false),
            inner: Mutex::new(DisplayInner {
                state: DisplayState::NotVisible,
                buffer_out: false,
            }),
        });
        if self.invalidate_superseded_display {
            // Earlier handles are dead from here on
            state.displays.clear();
        }
        state.displays.push(Arc::clone(&display));

        debug!(generation, "Simulated display opened");
        Some(display as Arc<dyn DisplayHandle>)
    }

    fn close_display(&self, display: Arc<dyn DisplayHandle>) {
        let mut state = self.lock_state();
        state.stats.display_closes += 1;

        let position = state
            .displays
            .iter()
            .position(|sim| std::ptr::addr_eq(Arc::as_ptr(&display), Arc::as_ptr(sim)));
        match position {
            Some(index) => {
                let sim = state.displays.swap_remove(index);
                sim.closed.store(true, Ordering::SeqCst);
                debug!(generation = sim.generation, "Simulated display closed");
            }
            None => warn!("Closing a display this provider did not issue"),
        }
    }
}

impl std::fmt::Debug for SimulatedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock_state();
        f.debug_struct("SimulatedProvider")
            .field("cameras", &state.cameras)
            .field("in_use", &state.in_use.keys().collect::<Vec<_>>())
            .field("stats", &state.stats)
            .field("has_display", &self.has_display)
            .finish()
    }
}

struct SimulatedCamera {
    desc: CameraDesc,
    streaming: AtomicBool,
    closed: AtomicBool,
}

impl CameraHandle for SimulatedCamera {
    fn info(&self) -> CameraDesc {
        self.desc.clone()
    }

    fn start_video_stream(&self) -> StatusCode {
        if self.closed.load(Ordering::SeqCst) {
            return StatusCode::OwnershipLost;
        }
        if self.streaming.swap(true, Ordering::SeqCst) {
            return StatusCode::StreamAlreadyRunning;
        }
        debug!(camera_id = %self.desc.camera_id, "Simulated stream started");
        StatusCode::Ok
    }

    fn done_with_frame(&self, buffer: BufferDesc) {
        debug!(
            camera_id = %self.desc.camera_id,
            buffer_id = buffer.buffer_id,
            "Frame returned"
        );
    }

    fn stop_video_stream(&self) {
        if self.streaming.swap(false, Ordering::SeqCst) {
            debug!(camera_id = %self.desc.camera_id, "Simulated stream stopped");
        }
    }
}

struct DisplayInner {
    state: DisplayState,
    buffer_out: bool,
}

struct SimulatedDisplay {
    generation: u64,
    current_generation: Arc<AtomicU64>,
    enforce_generation: bool,
    closed: AtomicBool,
    inner: Mutex<DisplayInner>,
}

impl SimulatedDisplay {
    /// A display is live until closed or (when enforced) superseded
    fn is_live(&self) -> bool {
        if self.closed.load(Ordering::SeqCst) {
            return false;
        }
        !self.enforce_generation
            || self.current_generation.load(Ordering::SeqCst) == self.generation
    }

    fn lock_inner(&self) -> MutexGuard<'_, DisplayInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DisplayHandle for SimulatedDisplay {
    fn info(&self) -> DisplayDesc {
        if !self.is_live() {
            return DisplayDesc::default();
        }
        DisplayDesc {
            display_id: SIMULATED_DISPLAY_ID.to_string(),
            vendor_flags: 0,
        }
    }

    fn set_display_state(&self, state: DisplayState) -> StatusCode {
        if !self.is_live() {
            return StatusCode::OwnershipLost;
        }

        let mut inner = self.lock_inner();
        inner.state = match state {
            DisplayState::NotVisible => DisplayState::NotVisible,
            // Content only shows up once a frame has been returned
            DisplayState::Visible | DisplayState::VisibleOnNextFrame => {
                DisplayState::VisibleOnNextFrame
            }
            DisplayState::NotOpen | DisplayState::Dead => return StatusCode::InvalidArg,
        };
        StatusCode::Ok
    }

    fn get_display_state(&self) -> DisplayState {
        if !self.is_live() {
            return DisplayState::Dead;
        }
        self.lock_inner().state
    }

    fn get_target_buffer(&self) -> Option<BufferDesc> {
        if !self.is_live() {
            return None;
        }

        let mut inner = self.lock_inner();
        if inner.buffer_out {
            return None;
        }
        inner.buffer_out = true;
        Some(BufferDesc {
            buffer_id: DISPLAY_BUFFER_ID,
            width: 1280,
            height: 720,
        })
    }

    fn return_target_buffer(&self, buffer: BufferDesc) -> StatusCode {
        if !self.is_live() {
            return StatusCode::OwnershipLost;
        }

        let mut inner = self.lock_inner();
        if buffer.buffer_id != DISPLAY_BUFFER_ID {
            return StatusCode::InvalidArg;
        }
        if !inner.buffer_out {
            return StatusCode::BufferNotAvailable;
        }
        inner.buffer_out = false;
        if inner.state == DisplayState::VisibleOnNextFrame {
            inner.state = DisplayState::Visible;
        }
        StatusCode::Ok
    }
}
