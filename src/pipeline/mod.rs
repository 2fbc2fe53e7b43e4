//! Pipeline orchestration bounded context.
//!
//! Composes the issue lifecycle, the mirror resolver, and the run
//! dispatcher into one flow: advancing an issue into implementation
//! resolves or provisions its mirror artifact and dispatches the
//! fabrication workflow; a polled terminal run feeds back into the issue
//! state machine per the completion policy.
//!
//! Follows the hexagonal layout: `domain` holds the policy and target
//! types, `ports` the provisioner contract, `adapters` its in-memory
//! implementation, and `services` the orchestrator.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
