//! Adapter implementations of the [`MirrorProvisioner`] port.
//!
//! [`MirrorProvisioner`]: crate::pipeline::ports::MirrorProvisioner

pub mod memory;
