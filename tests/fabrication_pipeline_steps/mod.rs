//! Step definitions for issue fabrication behaviour scenarios.

pub mod world;

pub mod given;
pub mod then;
pub mod when;
