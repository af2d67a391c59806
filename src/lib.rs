//! mailcast: per-agent mail campaigns over an uploaded contact table.

pub mod api;
pub mod campaign;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod transport;
