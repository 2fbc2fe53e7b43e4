//! Ports consumed by pipeline orchestration.

mod provisioner;

pub use provisioner::{MirrorProvisioner, ProvisionError, ProvisionResult};
