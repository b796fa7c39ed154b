// SPDX-License-Identifier: GPL-3.0-only

//! Client-facing entry point of the broker
//!
//! The enumerator hands out camera and display proxies. Its mutable state
//! (the open cameras and the active display) sits behind a single mutex that
//! is held for the whole of every lookup-or-create, disown-then-release and
//! display switch, including the provider calls made along the way.

use super::auth::{Authorizer, CallerIdentity, UidAllowList};
use super::device::{ClientProxy, DeviceWrapper};
use super::display::DisplayProxy;
use super::status::{BrokerStatus, CameraStatus};
use crate::backends::hardware::{CameraDesc, DisplayState, HardwareProvider, ProviderRegistry};
use crate::config::{Config, DisplayTakeover};
use crate::errors::{BrokerError, BrokerResult};
use chrono::Local;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};
use tracing::{debug, info, warn};

struct BoundProvider {
    name: String,
    provider: Arc<dyn HardwareProvider>,
}

struct EnumeratorState {
    open_cameras: Vec<Arc<DeviceWrapper>>,
    /// Most recently opened display; never keeps it alive
    active_display: Weak<DisplayProxy>,
}

/// Broker entry point shared by all client connections
pub struct Enumerator {
    registry: Arc<dyn ProviderRegistry>,
    authorizer: Box<dyn Authorizer>,
    display_takeover: DisplayTakeover,
    bound: OnceLock<BoundProvider>,
    state: Mutex<EnumeratorState>,
}

impl Enumerator {
    /// Create an enumerator that is not yet bound to a provider
    pub fn new(registry: Arc<dyn ProviderRegistry>, authorizer: impl Authorizer + 'static) -> Self {
        Self {
            registry,
            authorizer: Box::new(authorizer),
            display_takeover: DisplayTakeover::default(),
            bound: OnceLock::new(),
            state: Mutex::new(EnumeratorState {
                open_cameras: Vec::new(),
                active_display: Weak::new(),
            }),
        }
    }

    /// Create an enumerator using the permission and display policy from `config`
    pub fn from_config(config: &Config, registry: Arc<dyn ProviderRegistry>) -> Self {
        Self::new(registry, UidAllowList::new(config.allowed_uids.iter().copied()))
            .with_display_takeover(config.display_takeover)
    }

    pub fn with_display_takeover(mut self, policy: DisplayTakeover) -> Self {
        self.display_takeover = policy;
        self
    }

    pub fn display_takeover(&self) -> DisplayTakeover {
        self.display_takeover
    }

    /// Bind to the hardware provider registered as `provider_name`
    ///
    /// Must be called once before anything else; a second call fails.
    pub fn init(&self, provider_name: &str) -> BrokerResult<()> {
        if self.bound.get().is_some() {
            warn!(provider = provider_name, "Enumerator is already initialized");
            return Err(BrokerError::AlreadyInitialized);
        }

        let Some(provider) = self.registry.find(provider_name) else {
            warn!(provider = provider_name, "Hardware provider not found");
            return Err(BrokerError::ProviderNotFound(provider_name.to_string()));
        };

        let bound = BoundProvider {
            name: provider_name.to_string(),
            provider,
        };
        if self.bound.set(bound).is_err() {
            // Lost a race with a concurrent init
            return Err(BrokerError::AlreadyInitialized);
        }

        info!(provider = provider_name, "Enumerator bound to hardware provider");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.bound.get().is_some()
    }

    /// Check whether `caller` may use the broker
    pub fn check_permission(&self, caller: &CallerIdentity) -> bool {
        let allowed = self.authorizer.is_authorized(caller);
        if !allowed {
            warn!(%caller, "Rejecting call from unauthorized caller");
        }
        allowed
    }

    /// List the cameras the provider knows about
    pub fn get_camera_list(&self, caller: &CallerIdentity) -> BrokerResult<Vec<CameraDesc>> {
        let provider = self.gate(caller)?;
        Ok(provider.list_devices())
    }

    /// Open `camera_id` for `caller`, sharing the hardware with other clients
    pub fn open_camera(
        &self,
        caller: &CallerIdentity,
        camera_id: &str,
    ) -> BrokerResult<Arc<ClientProxy>> {
        let provider = self.gate(caller)?;
        let mut state = self.lock_state();

        let existing = state
            .open_cameras
            .iter()
            .find(|wrapper| wrapper.camera_id().as_deref() == Some(camera_id))
            .cloned();

        let (wrapper, is_new) = match existing {
            Some(wrapper) => (wrapper, false),
            None => {
                let Some(hardware) = provider.open_camera(camera_id) else {
                    warn!(camera_id, "Hardware provider refused to open camera");
                    return Err(BrokerError::DeviceUnavailable(camera_id.to_string()));
                };
                debug!(camera_id, "Opened hardware camera");
                (DeviceWrapper::new(hardware), true)
            }
        };

        let Some(proxy) = wrapper.make_client_proxy() else {
            warn!(camera_id, "Failed to create a client proxy");
            if is_new && let Some(hardware) = wrapper.release() {
                provider.close_camera(hardware);
            }
            return Err(BrokerError::StaleHandle);
        };

        if is_new {
            state.open_cameras.push(Arc::clone(&wrapper));
        }

        info!(
            camera_id,
            %caller,
            client = %proxy.id(),
            clients = wrapper.client_count(),
            "Camera opened"
        );
        Ok(proxy)
    }

    /// Close a client's camera handle
    ///
    /// An empty or already-closed handle is a no-op reported as `NotFound`.
    /// The hardware camera is closed when its last client goes away.
    pub fn close_camera(
        &self,
        caller: &CallerIdentity,
        proxy: Option<&Arc<ClientProxy>>,
    ) -> BrokerResult<()> {
        if !self.check_permission(caller) {
            return Err(BrokerError::PermissionDenied { uid: caller.uid });
        }

        let Some(proxy) = proxy else {
            debug!(%caller, "Ignoring close of an empty camera handle");
            return Err(BrokerError::NotFound);
        };

        let mut state = self.lock_state();

        let Some(wrapper) = proxy.detach() else {
            debug!(client = %proxy.id(), "Ignoring close of an already closed camera");
            return Err(BrokerError::NotFound);
        };

        wrapper.disown(proxy);
        let remaining = wrapper.client_count();
        info!(client = %proxy.id(), clients = remaining, "Camera client closed");

        if remaining == 0 {
            state
                .open_cameras
                .retain(|open| !Arc::ptr_eq(open, &wrapper));

            if let Some(hardware) = wrapper.release() {
                let camera_id = hardware.info().camera_id;
                match self.bound.get() {
                    Some(bound) => bound.provider.close_camera(hardware),
                    None => warn!(camera_id = %camera_id, "No provider to close camera with"),
                }
                info!(camera_id = %camera_id, "Hardware camera released");
            }
        }

        Ok(())
    }

    /// Open the display; the new proxy becomes the active one
    ///
    /// Under [`DisplayTakeover::ShutdownPrevious`] the previous display is
    /// closed first, so single-handle providers can hand the display over.
    /// If the provider then refuses, the previous owner stays shut down.
    pub fn open_display(&self, caller: &CallerIdentity) -> BrokerResult<Arc<DisplayProxy>> {
        let provider = self.gate(caller)?;
        let mut state = self.lock_state();

        if let Some(previous) = state.active_display.upgrade() {
            match self.display_takeover {
                DisplayTakeover::ShutdownPrevious => {
                    if let Some(hardware) = previous.release() {
                        provider.close_display(hardware);
                    }
                    state.active_display = Weak::new();
                    info!("Previous display shut down for new owner");
                }
                DisplayTakeover::LeaveToProvider => {
                    debug!("Previous display superseded");
                }
            }
        }

        let Some(hardware) = provider.open_display() else {
            warn!(%caller, "Hardware provider refused to open the display");
            return Err(BrokerError::DeviceUnavailable("display".to_string()));
        };

        let display = DisplayProxy::new(hardware);
        state.active_display = Arc::downgrade(&display);
        info!(%caller, "Display opened");
        Ok(display)
    }

    /// Close the active display
    ///
    /// A handle that is not the active display is left alone and reported as
    /// `Mismatch`.
    pub fn close_display(
        &self,
        caller: &CallerIdentity,
        display: Option<&Arc<DisplayProxy>>,
    ) -> BrokerResult<()> {
        if !self.check_permission(caller) {
            return Err(BrokerError::PermissionDenied { uid: caller.uid });
        }

        let Some(display) = display else {
            debug!(%caller, "Ignoring close of an empty display handle");
            return Err(BrokerError::NotFound);
        };

        let mut state = self.lock_state();
        let active = state.active_display.upgrade();
        if !active.is_some_and(|active| Arc::ptr_eq(&active, display)) {
            warn!(%caller, "Ignoring close of a display that is not the active one");
            return Err(BrokerError::Mismatch);
        }

        if let Some(hardware) = display.release() {
            match self.bound.get() {
                Some(bound) => bound.provider.close_display(hardware),
                None => warn!("No provider to close display with"),
            }
        }
        state.active_display = Weak::new();
        info!(%caller, "Display closed");
        Ok(())
    }

    /// State of the active display
    ///
    /// Unauthorized callers get `Dead`; with no live display the answer is
    /// `NotOpen`.
    pub fn get_display_state(&self, caller: &CallerIdentity) -> DisplayState {
        if !self.check_permission(caller) {
            return DisplayState::Dead;
        }

        let mut state = self.lock_state();
        match state.active_display.upgrade() {
            Some(display) => display.get_display_state(),
            None => {
                state.active_display = Weak::new();
                DisplayState::NotOpen
            }
        }
    }

    /// Diagnostic snapshot of open cameras and the display
    pub fn snapshot(&self, caller: &CallerIdentity) -> BrokerResult<BrokerStatus> {
        if !self.check_permission(caller) {
            return Err(BrokerError::PermissionDenied { uid: caller.uid });
        }

        let state = self.lock_state();
        let open_cameras = state
            .open_cameras
            .iter()
            .map(|wrapper| CameraStatus {
                camera_id: wrapper.camera_id().unwrap_or_default(),
                clients: wrapper.client_count(),
                streaming_clients: wrapper.streaming_count(),
                opened_at: wrapper.opened_at(),
            })
            .collect();
        let display = state
            .active_display
            .upgrade()
            .map(|display| display.get_display_state())
            .unwrap_or(DisplayState::NotOpen);

        Ok(BrokerStatus {
            provider: self.bound.get().map(|bound| bound.name.clone()),
            open_cameras,
            display,
            taken_at: Local::now(),
        })
    }

    /// Permission check followed by the initialized check
    fn gate(&self, caller: &CallerIdentity) -> BrokerResult<Arc<dyn HardwareProvider>> {
        if !self.check_permission(caller) {
            return Err(BrokerError::PermissionDenied { uid: caller.uid });
        }
        self.bound
            .get()
            .map(|bound| Arc::clone(&bound.provider))
            .ok_or(BrokerError::NotInitialized)
    }

    fn lock_state(&self) -> MutexGuard<'_, EnumeratorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Enumerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock_state();
        f.debug_struct("Enumerator")
            .field("provider", &self.bound.get().map(|bound| bound.name.as_str()))
            .field("open_cameras", &state.open_cameras.len())
            .field("display_active", &(state.active_display.strong_count() > 0))
            .field("display_takeover", &self.display_takeover)
            .finish()
    }
}
