//! Downcasting helpers shared by resolvers and dependency bags.

use std::any::Any;
use std::sync::Arc;

use crate::error::{DiError, DiResult};

/// Type-erased instance as stored in caches and handed between resolvers.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// Concrete types are stored as `Arc<T>`.
pub(crate) fn downcast_instance<T: Send + Sync + 'static>(any: AnyArc) -> DiResult<Arc<T>> {
    any.downcast::<T>()
        .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>().to_string()))
}

/// Trait objects are stored as `Arc<Arc<dyn Trait>>` inside the `Any`.
pub(crate) fn downcast_trait<T: ?Sized + Send + Sync + 'static>(any: AnyArc) -> DiResult<Arc<T>> {
    any.downcast::<Arc<T>>()
        .map(|boxed| (*boxed).clone())
        .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>().to_string()))
}

/// Collection resolutions are stored as `Arc<Vec<AnyArc>>`.
pub(crate) fn downcast_list(any: AnyArc) -> DiResult<Vec<AnyArc>> {
    any.downcast::<Vec<AnyArc>>()
        .map(|list| (*list).clone())
        .map_err(|_| DiError::TypeMismatch("collection".to_string()))
}

pub(crate) fn wrap_list(items: Vec<AnyArc>) -> AnyArc {
    Arc::new(items)
}
