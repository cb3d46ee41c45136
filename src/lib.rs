//! Heart-rate nap guard for a paired wearable and handheld.
//!
//! The wearable samples heart rate during a session and plays a six-pulse
//! haptic wake sequence when the rate drops below the operator's threshold.
//! The handheld starts and stops sessions and retunes the threshold over a
//! best-effort device link, and mirrors the wearable's telemetry.
//!
//! - [`domain`] - data model, alert engine, session state machine, settings
//! - [`infrastructure`] - link protocol and transport, sensor and actuator
//!   seams, logging
//! - [`app`] - the wearable's serialized runtime and the handheld connector

pub mod app;
pub mod domain;
pub mod infrastructure;
