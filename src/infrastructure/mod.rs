pub mod haptics;
pub mod link;
pub mod logging;
pub mod sensor;
