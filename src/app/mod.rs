//! Device-level wiring: the wearable's session runtime and the handheld's
//! connector, each built from injected collaborators.

pub mod handheld;
pub mod wearable;

pub use handheld::{HandheldConnector, HandheldSnapshot};
pub use wearable::{SessionHandle, WearableRuntime};
