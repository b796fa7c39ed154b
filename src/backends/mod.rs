// SPDX-License-Identifier: GPL-3.0-only

//! Backend abstraction layer for the hardware the broker multiplexes
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                 Broker Layer                 │
//! └────────────────────┬────────────────────────┘
//!                      │
//! ┌────────────────────┴────────────────────────┐
//! │               Backend Layer                  │
//! │  ┌──────────────────┐  ┌─────────────────┐  │
//! │  │ HardwareProvider │  │ SimulatedProvider│ │
//! │  │     (trait)      │  │   (in-memory)    │ │
//! │  └──────────────────┘  └─────────────────┘  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`hardware`]: provider, camera and display handle traits plus the
//!   simulated provider used by the CLI and tests

pub mod hardware;
