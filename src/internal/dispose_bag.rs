//! Internal disposal bag for managing cleanup hooks.

use std::future::Future;
use std::pin::Pin;

/// Future type for disposal operations.
pub type BoxFutureUnit = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Disposal hooks with LIFO execution order.
///
/// Async hooks run first (in reverse order), followed by sync hooks.
#[derive(Default)]
pub(crate) struct DisposeBag {
    sync: Vec<Box<dyn FnOnce() + Send>>,
    asyncs: Vec<Box<dyn FnOnce() -> BoxFutureUnit + Send>>,
}

impl DisposeBag {
    pub(crate) fn push_sync(&mut self, f: Box<dyn FnOnce() + Send>) {
        self.sync.push(f);
    }

    pub(crate) fn push_async(&mut self, f: Box<dyn FnOnce() -> BoxFutureUnit + Send>) {
        self.asyncs.push(f);
    }

    /// Removes all sync hooks, last registered first.
    pub(crate) fn take_sync_reverse(&mut self) -> Vec<Box<dyn FnOnce() + Send>> {
        let mut hooks = std::mem::take(&mut self.sync);
        hooks.reverse();
        hooks
    }

    /// Removes all async hooks, last registered first.
    pub(crate) fn take_async_reverse(&mut self) -> Vec<Box<dyn FnOnce() -> BoxFutureUnit + Send>> {
        let mut hooks = std::mem::take(&mut self.asyncs);
        hooks.reverse();
        hooks
    }

    pub(crate) fn async_len(&self) -> usize {
        self.asyncs.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.sync.is_empty() && self.asyncs.is_empty()
    }
}
