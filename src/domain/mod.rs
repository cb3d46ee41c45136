pub mod alert;
pub mod error;
pub mod models;
pub mod session;
pub mod settings;
