// SPDX-License-Identifier: GPL-3.0-only

//! Serializable view of the broker state for diagnostics

use crate::backends::hardware::DisplayState;
use chrono::{DateTime, Local};
use serde::Serialize;

/// One open hardware camera and who is using it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CameraStatus {
    pub camera_id: String,
    pub clients: usize,
    pub streaming_clients: usize,
    pub opened_at: DateTime<Local>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrokerStatus {
    /// Name of the bound hardware provider, if `init` succeeded
    pub provider: Option<String>,
    pub open_cameras: Vec<CameraStatus>,
    /// State of the active display, `NotOpen` when there is none
    pub display: DisplayState,
    pub taken_at: DateTime<Local>,
}

impl BrokerStatus {
    /// Total number of client proxies across all open cameras
    pub fn total_clients(&self) -> usize {
        self.open_cameras.iter().map(|c| c.clients).sum()
    }

    /// Find the entry for a camera id
    pub fn camera(&self, camera_id: &str) -> Option<&CameraStatus> {
        self.open_cameras.iter().find(|c| c.camera_id == camera_id)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
