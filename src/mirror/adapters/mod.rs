//! Adapter implementations for the mirror tracker port.

pub mod memory;
