// SPDX-License-Identifier: GPL-3.0-only
// Shared types for the hardware provider interface

//! Wire-level types exchanged with the hardware provider and with clients

use serde::{Deserialize, Serialize};

/// Description of a camera exposed by the hardware provider
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CameraDesc {
    /// Stable hardware identifier (e.g. "cam0" or a device node path)
    pub camera_id: String,
    /// Vendor-specific flags, passed through untouched
    pub vendor_flags: u32,
}

impl CameraDesc {
    pub fn new(camera_id: impl Into<String>) -> Self {
        Self {
            camera_id: camera_id.into(),
            vendor_flags: 0,
        }
    }
}

impl std::fmt::Display for CameraDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.camera_id)
    }
}

/// Description of the display exposed by the hardware provider
///
/// An empty `display_id` is what a dead display reports.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DisplayDesc {
    pub display_id: String,
    pub vendor_flags: u32,
}

impl DisplayDesc {
    /// Check if this descriptor came from a live display
    pub fn is_valid(&self) -> bool {
        !self.display_id.is_empty()
    }
}

/// Handle to a graphics buffer owned by the provider
///
/// The broker never looks inside buffers; only the id travels back and forth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BufferDesc {
    pub buffer_id: u32,
    pub width: u32,
    pub height: u32,
}

/// Display visibility state as reported over the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DisplayState {
    /// No display is open
    #[default]
    NotOpen,
    /// Display is open but not showing content
    NotVisible,
    /// Content becomes visible once the next frame is returned
    VisibleOnNextFrame,
    /// Content is on screen
    Visible,
    /// The display is gone, or the caller may not know about it
    Dead,
}

impl std::fmt::Display for DisplayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DisplayState::NotOpen => "NOT_OPEN",
            DisplayState::NotVisible => "NOT_VISIBLE",
            DisplayState::VisibleOnNextFrame => "VISIBLE_ON_NEXT_FRAME",
            DisplayState::Visible => "VISIBLE",
            DisplayState::Dead => "DEAD",
        };
        write!(f, "{}", name)
    }
}

/// Status codes returned by data operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusCode {
    Ok,
    InvalidArg,
    StreamAlreadyRunning,
    /// The buffer was not lent out by this device
    BufferNotAvailable,
    /// The handle no longer owns the device it was issued for
    OwnershipLost,
    /// The device behind the handle has gone away
    UnderlyingServiceError,
}

impl StatusCode {
    pub fn is_ok(&self) -> bool {
        matches!(self, StatusCode::Ok)
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StatusCode::Ok => "OK",
            StatusCode::InvalidArg => "INVALID_ARG",
            StatusCode::StreamAlreadyRunning => "STREAM_ALREADY_RUNNING",
            StatusCode::BufferNotAvailable => "BUFFER_NOT_AVAILABLE",
            StatusCode::OwnershipLost => "OWNERSHIP_LOST",
            StatusCode::UnderlyingServiceError => "UNDERLYING_SERVICE_ERROR",
        };
        write!(f, "{}", name)
    }
}
