// SPDX-License-Identifier: GPL-3.0-only

//! Resource-multiplexing broker
//!
//! # Architecture
//!
//! ```text
//!   client A        client B        client C
//!      │               │               │
//!      ▼               ▼               ▼
//! ┌──────────────────────────────────────────┐
//! │               Enumerator                  │  ← permission gate, one lock
//! └───────┬───────────────┬──────────────┬────┘
//!         │               │              │ weak
//!  ┌──────┴─────┐  ┌──────┴─────┐  ┌─────┴────────┐
//!  │ClientProxy │  │ClientProxy │  │ DisplayProxy │
//!  └──────┬─────┘  └──────┬─────┘  └─────┬────────┘
//!         └───────┬───────┘              │
//!          ┌──────┴───────┐              │
//!          │DeviceWrapper │              │
//!          └──────┬───────┘              │
//!                 ▼                      ▼
//!          ┌──────────────────────────────────┐
//!          │        HardwareProvider          │
//!          └──────────────────────────────────┘
//! ```
//!
//! Cameras are shared: the first open of an id opens the hardware, later
//! opens attach to the same [`DeviceWrapper`], and the hardware is closed when
//! the last [`ClientProxy`] is closed. The display is exclusive: the newest
//! [`DisplayProxy`] is the only one the enumerator routes to.

pub mod auth;
pub mod device;
pub mod display;
pub mod enumerator;
pub mod session;
pub mod status;

pub use auth::{Authorizer, CallerIdentity, IdentitySource, LocalIdentity, UidAllowList};
pub use device::{ClientProxy, DeviceWrapper};
pub use display::DisplayProxy;
pub use enumerator::Enumerator;
pub use session::ClientSession;
pub use status::{BrokerStatus, CameraStatus};
