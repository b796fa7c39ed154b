// SPDX-License-Identifier: GPL-3.0-only

//! Per-connection bookkeeping
//!
//! A client process can die without closing what it opened. The transport
//! keeps one [`ClientSession`] per connection; every handle opened through it
//! is remembered, and whatever is still open when the session ends is closed
//! on the client's behalf.

use super::auth::{CallerIdentity, IdentitySource};
use super::device::ClientProxy;
use super::display::DisplayProxy;
use super::enumerator::Enumerator;
use crate::backends::hardware::{CameraDesc, DisplayState};
use crate::errors::BrokerResult;
use std::sync::Arc;
use tracing::{debug, info};

/// One client connection to the broker
pub struct ClientSession {
    caller: CallerIdentity,
    enumerator: Arc<Enumerator>,
    cameras: Vec<Arc<ClientProxy>>,
    displays: Vec<Arc<DisplayProxy>>,
}

impl ClientSession {
    pub fn new(enumerator: Arc<Enumerator>, caller: CallerIdentity) -> Self {
        debug!(%caller, "Client session started");
        Self {
            caller,
            enumerator,
            cameras: Vec::new(),
            displays: Vec::new(),
        }
    }

    /// Start a session for whoever `source` says is calling
    pub fn connect(enumerator: Arc<Enumerator>, source: &dyn IdentitySource) -> Self {
        Self::new(enumerator, source.calling_identity())
    }

    pub fn caller(&self) -> CallerIdentity {
        self.caller
    }

    /// Number of handles still held by this session
    pub fn open_handles(&self) -> usize {
        self.cameras.len() + self.displays.len()
    }

    pub fn get_camera_list(&self) -> BrokerResult<Vec<CameraDesc>> {
        self.enumerator.get_camera_list(&self.caller)
    }

    pub fn open_camera(&mut self, camera_id: &str) -> BrokerResult<Arc<ClientProxy>> {
        let proxy = self.enumerator.open_camera(&self.caller, camera_id)?;
        self.cameras.push(Arc::clone(&proxy));
        Ok(proxy)
    }

    pub fn close_camera(&mut self, proxy: &Arc<ClientProxy>) -> BrokerResult<()> {
        self.cameras.retain(|held| !Arc::ptr_eq(held, proxy));
        self.enumerator.close_camera(&self.caller, Some(proxy))
    }

    pub fn open_display(&mut self) -> BrokerResult<Arc<DisplayProxy>> {
        let display = self.enumerator.open_display(&self.caller)?;
        self.displays.push(Arc::clone(&display));
        Ok(display)
    }

    pub fn close_display(&mut self, display: &Arc<DisplayProxy>) -> BrokerResult<()> {
        self.displays.retain(|held| !Arc::ptr_eq(held, display));
        self.enumerator.close_display(&self.caller, Some(display))
    }

    pub fn get_display_state(&self) -> DisplayState {
        self.enumerator.get_display_state(&self.caller)
    }

    /// End the session, closing everything still held
    pub fn disconnect(mut self) {
        self.release_all();
    }

    fn release_all(&mut self) {
        if self.cameras.is_empty() && self.displays.is_empty() {
            return;
        }

        info!(
            caller = %self.caller,
            cameras = self.cameras.len(),
            displays = self.displays.len(),
            "Releasing handles left open by client"
        );
        // Outcomes are not reported anywhere; the client is gone
        for proxy in std::mem::take(&mut self.cameras) {
            let _ = self.enumerator.close_camera(&self.caller, Some(&proxy));
        }
        for display in std::mem::take(&mut self.displays) {
            let _ = self.enumerator.close_display(&self.caller, Some(&display));
        }
    }
}

impl Drop for ClientSession {
    fn drop(&mut self) {
        self.release_all();
    }
}

impl std::fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSession")
            .field("caller", &self.caller)
            .field("cameras", &self.cameras.len())
            .field("displays", &self.displays.len())
            .finish()
    }
}
