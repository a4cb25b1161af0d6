//! Disposal traits for resource cleanup.

/// Synchronous resource disposal.
///
/// Factories register disposable instances through the resolver they are
/// handed. Singletons register with the root provider, everything built
/// inside a scope registers with that scope. Hooks run in LIFO order.
///
/// # Examples
///
/// ```
/// use keyed_di::{Dispose, ServiceCollection, Resolver};
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// trait Channel: Send + Sync {}
///
/// struct Connection {
///     closed: Arc<AtomicBool>,
/// }
///
/// impl Channel for Connection {}
///
/// impl Dispose for Connection {
///     fn dispose(&self) {
///         self.closed.store(true, Ordering::SeqCst);
///     }
/// }
///
/// let closed = Arc::new(AtomicBool::new(false));
/// let flag = closed.clone();
///
/// let mut services = ServiceCollection::new();
/// services.add_scoped_trait_factory::<dyn Channel, _>(move |resolver| {
///     let connection = Arc::new(Connection { closed: flag.clone() });
///     resolver.register_disposer(connection.clone());
///     connection as Arc<dyn Channel>
/// }).unwrap();
///
/// let provider = services.build();
/// {
///     let scope = provider.create_scope();
///     let _connection = scope.get_required_trait::<dyn Channel>();
/// } // scope dropped here
/// assert!(closed.load(Ordering::SeqCst));
/// ```
pub trait Dispose: Send + Sync + 'static {
    /// Perform synchronous cleanup of resources.
    fn dispose(&self);
}

/// Asynchronous resource disposal.
///
/// Async hooks run before sync hooks when `dispose_all()` is awaited.
#[async_trait::async_trait]
pub trait AsyncDispose: Send + Sync + 'static {
    /// Perform asynchronous cleanup of resources.
    async fn dispose(&self);
}
