//! Socket plumbing: name resolution and listening socket setup.

pub mod resolver;
pub mod socket;
