//! Internal implementation details.

pub(crate) mod cast;
pub(crate) mod circular;
pub(crate) mod dispose_bag;

pub(crate) use circular::{ResolutionGuard, SlotGuard};
pub use dispose_bag::BoxFutureUnit;
pub(crate) use dispose_bag::DisposeBag;
