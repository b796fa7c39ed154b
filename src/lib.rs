// SPDX-License-Identifier: GPL-3.0-only

//! Camera broker - shares cameras and hands out an exclusive display
//!
//! Many client processes may use the same hardware camera at once, while the
//! display has a single owner at a time. The broker reference-counts camera
//! users, releases hardware exactly when the last user leaves, and checks the
//! caller's identity on every call.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`broker`]: enumerator, shared camera wrappers, client and display proxies
//! - [`backends`]: hardware provider abstraction and the simulated provider
//! - [`config`]: configuration handling
//! - [`errors`]: error types
//!
//! # Example
//!
//! ```
//! use camera_broker::backends::hardware::{SimulatedProvider, StaticRegistry};
//! use camera_broker::broker::{CallerIdentity, Enumerator, UidAllowList};
//! use camera_broker::constants::AID_AUTOMOTIVE_EVS;
//! use std::sync::Arc;
//!
//! let provider = Arc::new(SimulatedProvider::new(["cam0"]));
//! let registry = Arc::new(StaticRegistry::new().with("hw", provider));
//! let enumerator = Enumerator::new(registry, UidAllowList::new([AID_AUTOMOTIVE_EVS]));
//! enumerator.init("hw").unwrap();
//!
//! let caller = CallerIdentity::new(1234, AID_AUTOMOTIVE_EVS);
//! let camera = enumerator.open_camera(&caller, "cam0").unwrap();
//! assert_eq!(camera.get_info().unwrap().camera_id, "cam0");
//! enumerator.close_camera(&caller, Some(&camera)).unwrap();
//! ```

pub mod backends;
pub mod broker;
pub mod config;
pub mod constants;
pub mod errors;

// Re-export commonly used types
pub use broker::{CallerIdentity, ClientProxy, ClientSession, DisplayProxy, Enumerator};
pub use config::{Config, DisplayTakeover};
pub use errors::{BrokerError, BrokerResult};
