//! Accept loop and connection supervision.

pub mod listener;
pub mod supervisor;

pub use listener::Server;
