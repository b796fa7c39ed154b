// SPDX-License-Identifier: GPL-3.0-only

//! Shared camera ownership
//!
//! A [`DeviceWrapper`] owns one open hardware camera and is shared by every
//! [`ClientProxy`] minted from it. Proxies hold the wrapper alive; the wrapper
//! only remembers proxy ids, so there is no ownership cycle between them.
//!
//! Adding and removing clients is driven by the enumerator while it holds its
//! own lock, which is what makes the 1 → 0 transition observable exactly once.

use crate::backends::hardware::{BufferDesc, CameraDesc, CameraHandle, StatusCode};
use chrono::{DateTime, Local};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};
use uuid::Uuid;

struct WrapperState {
    hardware: Option<Arc<dyn CameraHandle>>,
    clients: Vec<Uuid>,
    /// Clients that asked for the video stream
    streaming: HashSet<Uuid>,
}

/// One physically open hardware camera shared by its clients
pub struct DeviceWrapper {
    state: Mutex<WrapperState>,
    opened_at: DateTime<Local>,
}

impl DeviceWrapper {
    /// Wrap a freshly opened hardware camera
    pub fn new(hardware: Arc<dyn CameraHandle>) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(WrapperState {
                hardware: Some(hardware),
                clients: Vec::new(),
                streaming: HashSet::new(),
            }),
            opened_at: Local::now(),
        })
    }

    /// Mint a new client proxy attached to this wrapper
    ///
    /// Returns `None` once the hardware handle has been released.
    pub fn make_client_proxy(self: &Arc<Self>) -> Option<Arc<ClientProxy>> {
        let mut state = self.lock_state();
        if state.hardware.is_none() {
            warn!("Refusing to add a client to a released camera");
            return None;
        }

        let proxy = Arc::new(ClientProxy {
            id: Uuid::new_v4(),
            parent: Mutex::new(Some(Arc::clone(self))),
        });
        state.clients.push(proxy.id);
        debug!(client = %proxy.id, clients = state.clients.len(), "Client attached");
        Some(proxy)
    }

    /// Forget a client; removing an absent client does nothing
    pub fn disown(&self, proxy: &ClientProxy) -> bool {
        let mut state = self.lock_state();
        let Some(index) = state.clients.iter().position(|id| *id == proxy.id) else {
            return false;
        };
        state.clients.remove(index);
        Self::end_stream_locked(&mut state, proxy.id);
        debug!(client = %proxy.id, clients = state.clients.len(), "Client detached");
        true
    }

    pub fn client_count(&self) -> usize {
        self.lock_state().clients.len()
    }

    /// Number of clients currently running the video stream
    pub fn streaming_count(&self) -> usize {
        self.lock_state().streaming.len()
    }

    /// The owned hardware camera, or `None` after release
    pub fn hardware_handle(&self) -> Option<Arc<dyn CameraHandle>> {
        self.lock_state().hardware.clone()
    }

    /// Hardware identity, queried from the device itself
    pub fn camera_id(&self) -> Option<String> {
        self.hardware_handle().map(|hw| hw.info().camera_id)
    }

    pub fn opened_at(&self) -> DateTime<Local> {
        self.opened_at
    }

    /// Give up the hardware handle; only the first call gets it
    pub(crate) fn release(&self) -> Option<Arc<dyn CameraHandle>> {
        let mut state = self.lock_state();
        if let Some(hw) = state.hardware.as_ref()
            && !state.streaming.is_empty()
        {
            hw.stop_video_stream();
        }
        state.streaming.clear();
        state.hardware.take()
    }

    /// Start the hardware stream for the first streaming client
    ///
    /// A client disowned since it looked up this wrapper is refused.
    fn client_stream_starting(&self, client: Uuid) -> StatusCode {
        let mut state = self.lock_state();
        let Some(hw) = state.hardware.clone() else {
            return StatusCode::UnderlyingServiceError;
        };
        if !state.clients.contains(&client) {
            return StatusCode::UnderlyingServiceError;
        }
        if state.streaming.contains(&client) {
            return StatusCode::StreamAlreadyRunning;
        }

        if state.streaming.is_empty() {
            let status = hw.start_video_stream();
            if !status.is_ok() {
                warn!(client = %client, %status, "Hardware refused to start streaming");
                return status;
            }
        }
        state.streaming.insert(client);
        StatusCode::Ok
    }

    /// Stop the hardware stream once the last streaming client is done
    fn client_stream_ending(&self, client: Uuid) {
        let mut state = self.lock_state();
        Self::end_stream_locked(&mut state, client);
    }

    fn end_stream_locked(state: &mut WrapperState, client: Uuid) {
        if state.streaming.remove(&client)
            && state.streaming.is_empty()
            && let Some(hw) = state.hardware.as_ref()
        {
            hw.stop_video_stream();
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, WrapperState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for DeviceWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock_state();
        f.debug_struct("DeviceWrapper")
            .field("camera_id", &state.hardware.as_ref().map(|hw| hw.info().camera_id))
            .field("clients", &state.clients.len())
            .field("streaming", &state.streaming.len())
            .finish()
    }
}

/// A single client's handle on a shared camera
///
/// Every operation goes through the parent wrapper. Once the proxy is closed
/// the link is cut and operations report that the service is gone.
pub struct ClientProxy {
    id: Uuid,
    parent: Mutex<Option<Arc<DeviceWrapper>>>,
}

impl ClientProxy {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The wrapper this proxy is attached to, if still attached
    pub fn parent(&self) -> Option<Arc<DeviceWrapper>> {
        self.lock_parent().clone()
    }

    pub fn is_attached(&self) -> bool {
        self.lock_parent().is_some()
    }

    /// Cut the link to the parent; only the first call gets it
    pub(crate) fn detach(&self) -> Option<Arc<DeviceWrapper>> {
        self.lock_parent().take()
    }

    pub fn get_info(&self) -> Result<CameraDesc, StatusCode> {
        self.parent()
            .and_then(|parent| parent.hardware_handle())
            .map(|hw| hw.info())
            .ok_or(StatusCode::UnderlyingServiceError)
    }

    pub fn start_video_stream(&self) -> StatusCode {
        match self.parent() {
            Some(parent) => parent.client_stream_starting(self.id),
            None => StatusCode::UnderlyingServiceError,
        }
    }

    /// Return a frame buffer to the camera
    pub fn done_with_frame(&self, buffer: BufferDesc) -> StatusCode {
        match self.parent().and_then(|parent| parent.hardware_handle()) {
            Some(hw) => {
                hw.done_with_frame(buffer);
                StatusCode::Ok
            }
            None => StatusCode::OwnershipLost,
        }
    }

    pub fn stop_video_stream(&self) {
        if let Some(parent) = self.parent() {
            parent.client_stream_ending(self.id);
        }
    }

    fn lock_parent(&self) -> MutexGuard<'_, Option<Arc<DeviceWrapper>>> {
        self.parent.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ClientProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientProxy")
            .field("id", &self.id)
            .field("attached", &self.is_attached())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::hardware::{HardwareProvider, SimulatedProvider};

    fn open_wrapper(provider: &SimulatedProvider) -> Arc<DeviceWrapper> {
        DeviceWrapper::new(provider.open_camera("cam0").unwrap())
    }

    #[test]
    fn test_proxies_share_wrapper() {
        let provider = SimulatedProvider::new(["cam0"]);
        let wrapper = open_wrapper(&provider);

        let a = wrapper.make_client_proxy().unwrap();
        let b = wrapper.make_client_proxy().unwrap();

        assert_ne!(a.id(), b.id());
        assert_eq!(wrapper.client_count(), 2);
        assert!(Arc::ptr_eq(&a.parent().unwrap(), &b.parent().unwrap()));
        assert_eq!(wrapper.camera_id().as_deref(), Some("cam0"));
    }

    #[test]
    fn test_disown_is_idempotent() {
        let provider = SimulatedProvider::new(["cam0"]);
        let wrapper = open_wrapper(&provider);
        let proxy = wrapper.make_client_proxy().unwrap();

        assert!(wrapper.disown(&proxy));
        assert!(!wrapper.disown(&proxy));
        assert_eq!(wrapper.client_count(), 0);
    }

    #[test]
    fn test_released_wrapper_refuses_clients() {
        let provider = SimulatedProvider::new(["cam0"]);
        let wrapper = open_wrapper(&provider);

        assert!(wrapper.release().is_some());
        assert!(wrapper.release().is_none());
        assert!(wrapper.make_client_proxy().is_none());
    }

    #[test]
    fn test_detached_proxy_reports_service_gone() {
        let provider = SimulatedProvider::new(["cam0"]);
        let wrapper = open_wrapper(&provider);
        let proxy = wrapper.make_client_proxy().unwrap();

        assert!(proxy.detach().is_some());
        assert!(proxy.detach().is_none());
        assert_eq!(proxy.get_info(), Err(StatusCode::UnderlyingServiceError));
        assert_eq!(proxy.start_video_stream(), StatusCode::UnderlyingServiceError);
        let buffer = BufferDesc {
            buffer_id: 7,
            width: 1,
            height: 1,
        };
        assert_eq!(proxy.done_with_frame(buffer), StatusCode::OwnershipLost);
        proxy.stop_video_stream();
    }

    #[test]
    fn test_stream_runs_while_any_client_streams() {
        let provider = SimulatedProvider::new(["cam0"]);
        let wrapper = open_wrapper(&provider);
        let a = wrapper.make_client_proxy().unwrap();
        let b = wrapper.make_client_proxy().unwrap();

        assert_eq!(a.start_video_stream(), StatusCode::Ok);
        assert_eq!(a.start_video_stream(), StatusCode::StreamAlreadyRunning);
        assert_eq!(b.start_video_stream(), StatusCode::Ok);
        assert_eq!(wrapper.streaming_count(), 2);

        a.stop_video_stream();
        assert_eq!(wrapper.streaming_count(), 1);

        // Disowning a streaming client ends its stream too
        wrapper.disown(&b);
        assert_eq!(wrapper.streaming_count(), 0);

        // Hardware stream was stopped, so it can start again
        assert_eq!(a.start_video_stream(), StatusCode::Ok);
    }

    #[test]
    fn test_stream_request_after_disown_is_refused() {
        let provider = SimulatedProvider::new(["cam0"]);
        let wrapper = open_wrapper(&provider);
        let a = wrapper.make_client_proxy().unwrap();
        let b = wrapper.make_client_proxy().unwrap();

        // `a` looked up its parent, then got closed before asking to stream
        let parent = a.parent().unwrap();
        assert!(a.detach().is_some());
        assert!(wrapper.disown(&a));

        assert_eq!(
            parent.client_stream_starting(a.id()),
            StatusCode::UnderlyingServiceError
        );
        assert_eq!(wrapper.client_count(), 1);
        assert_eq!(wrapper.streaming_count(), 0);

        // The hardware stream was never started, so `b` starts it cleanly
        assert_eq!(b.start_video_stream(), StatusCode::Ok);
        b.stop_video_stream();
        assert_eq!(wrapper.streaming_count(), 0);
    }
}
