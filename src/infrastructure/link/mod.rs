//! Device Link Module
//!
//! Carries Control commands from the handheld to the wearable and
//! Telemetry back the other way.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                  DeviceLink                  │
//! │  (best-effort send, reachability-gated)      │
//! └────────────┬──────────────────┬──────────────┘
//!              │                  │
//!              ▼                  ▼
//!      ┌──────────────┐   ┌──────────────┐
//!      │   Protocol   │   │  Transport   │
//!      │              │   │              │
//!      │ - encode     │   │ - reachable? │
//!      │ - decode     │   │ - send       │
//!      │              │   │ - subscribe  │
//!      └──────────────┘   └──────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`protocol`] - Wire keys, encoding and tolerant decoding
//! - [`transport`] - Transport and observer traits, in-process paired simulator
//! - [`service`] - Best-effort sender used by both devices

pub mod protocol;
pub mod service;
pub mod transport;

pub use service::DeviceLink;
