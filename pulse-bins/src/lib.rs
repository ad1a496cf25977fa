//! Shared setup for the Pulse binaries

pub mod common;
