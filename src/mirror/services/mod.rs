//! Application services for mirror resolution.

mod resolver;

pub use resolver::{MirrorResolver, ResolveError, ResolveResult};
