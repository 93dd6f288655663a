//! TCP transport: listener, per-connection tasks and client handles.

pub mod client;
pub mod connection;
pub mod gateway;

pub use connection::Connection;
pub use gateway::Gateway;
