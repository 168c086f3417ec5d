//! WebSocket game sessions

pub mod handler;
pub mod protocol;
pub mod registry;

pub use registry::SessionRegistry;
