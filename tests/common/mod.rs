//! Integration test common infrastructure.
//!
//! Provides utilities for spawning amcpd instances and driving them
//! over raw TCP.

pub mod client;
pub mod server;

#[allow(unused_imports)]
pub use client::TestClient;
#[allow(unused_imports)]
pub use server::TestServer;
