//! Core traits for service resolution and disposal.

pub mod dispose;
pub mod resolver;

pub use dispose::{AsyncDispose, Dispose};
pub use resolver::{Resolver, ResolverCore};
