//! Resolver traits for service resolution.

use std::sync::Arc;

use crate::error::DiResult;
use crate::internal::cast::{downcast_instance, downcast_trait, AnyArc};
use crate::internal::BoxFutureUnit;
use crate::key::{key_of, ServiceKey};
use crate::traits::{AsyncDispose, Dispose};

/// Object-safe resolution primitives.
///
/// Implemented by [`ServiceProvider`](crate::ServiceProvider),
/// [`ServiceScope`](crate::ServiceScope) and the
/// [`ResolverContext`](crate::ResolverContext) handed to factories. Most
/// callers use the typed methods of [`Resolver`] instead.
pub trait ResolverCore: Send + Sync {
    /// Resolves `key` to its type-erased instance.
    ///
    /// "Collection of T" keys (see [`ServiceKey::collection_of`]) resolve to
    /// every registration of `T`, stored as `Vec<AnyArc>`.
    fn resolve(&self, key: &ServiceKey) -> DiResult<AnyArc>;

    /// Resolves every registration of `contract`, in registration order.
    fn resolve_many(&self, contract: &ServiceKey) -> DiResult<Vec<AnyArc>>;

    /// True when [`resolve`](Self::resolve) can find something for `key`.
    /// Collection keys are always contained. Never fails.
    fn contains(&self, key: &ServiceKey) -> bool;

    /// Registers a synchronous disposal hook with this resolver's owner.
    fn push_sync_disposer(&self, f: Box<dyn FnOnce() + Send>);

    /// Registers an asynchronous disposal hook with this resolver's owner.
    fn push_async_disposer(&self, f: Box<dyn FnOnce() -> BoxFutureUnit + Send>);
}

/// Typed resolution API.
///
/// Concrete types are resolved with [`get`](Self::get); trait objects, which
/// are stored as `Arc<Arc<dyn Trait>>`, with [`get_trait`](Self::get_trait).
///
/// # Examples
///
/// ```
/// use keyed_di::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {
///     fn log(&self, msg: &str);
/// }
///
/// struct ConsoleLogger;
/// impl Logger for ConsoleLogger {
///     fn log(&self, msg: &str) {
///         println!("LOG: {}", msg);
///     }
/// }
///
/// let mut collection = ServiceCollection::new();
/// collection.add_singleton(42usize).unwrap();
/// collection.add_singleton_trait(Arc::new(ConsoleLogger) as Arc<dyn Logger>).unwrap();
///
/// let provider = collection.build();
/// assert_eq!(*provider.get_required::<usize>(), 42);
/// provider.get_required_trait::<dyn Logger>().log("resolved");
/// assert!(provider.has::<dyn Logger>());
/// assert!(!provider.has::<String>());
/// ```
pub trait Resolver: ResolverCore {
    /// Resolves a concrete service type.
    fn get<T: Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        self.get_by_key(&key_of::<T>())
    }

    /// Resolves a concrete type registered under an explicit key.
    fn get_by_key<T: Send + Sync + 'static>(&self, key: &ServiceKey) -> DiResult<Arc<T>> {
        downcast_instance(self.resolve(key)?)
    }

    /// Resolves a trait object.
    fn get_trait<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        self.get_trait_by_key(&key_of::<T>())
    }

    /// Resolves a trait object registered under an explicit key.
    fn get_trait_by_key<T: ?Sized + Send + Sync + 'static>(&self, key: &ServiceKey) -> DiResult<Arc<T>> {
        downcast_trait(self.resolve(key)?)
    }

    /// Resolves every concrete registration of `T`.
    fn get_all<T: Send + Sync + 'static>(&self) -> DiResult<Vec<Arc<T>>> {
        self.resolve_many(&key_of::<T>())?
            .into_iter()
            .map(downcast_instance)
            .collect()
    }

    /// Resolves every trait-object registration of `T`.
    ///
    /// ```
    /// use keyed_di::{ServiceCollection, Resolver};
    /// use std::sync::Arc;
    ///
    /// trait Plugin: Send + Sync {
    ///     fn name(&self) -> &str;
    /// }
    ///
    /// struct PluginA;
    /// impl Plugin for PluginA {
    ///     fn name(&self) -> &str { "a" }
    /// }
    ///
    /// struct PluginB;
    /// impl Plugin for PluginB {
    ///     fn name(&self) -> &str { "b" }
    /// }
    ///
    /// let mut collection = ServiceCollection::new();
    /// collection.add_trait_implementation::<dyn Plugin, _>(PluginA, |p| p as Arc<dyn Plugin>).unwrap();
    /// collection.add_trait_implementation::<dyn Plugin, _>(PluginB, |p| p as Arc<dyn Plugin>).unwrap();
    ///
    /// let provider = collection.build();
    /// let plugins = provider.get_all_trait::<dyn Plugin>().unwrap();
    /// let names: Vec<_> = plugins.iter().map(|p| p.name()).collect();
    /// assert_eq!(names, ["a", "b"]);
    /// ```
    fn get_all_trait<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Vec<Arc<T>>> {
        self.resolve_many(&key_of::<T>())?
            .into_iter()
            .map(downcast_trait)
            .collect()
    }

    /// Resolves a concrete service type, panicking on failure.
    fn get_required<T: Send + Sync + 'static>(&self) -> Arc<T> {
        self.get::<T>()
            .unwrap_or_else(|e| panic!("Failed to resolve {}: {}", std::any::type_name::<T>(), e))
    }

    /// Resolves a trait object, panicking on failure.
    fn get_required_trait<T: ?Sized + Send + Sync + 'static>(&self) -> Arc<T> {
        self.get_trait::<T>()
            .unwrap_or_else(|e| panic!("Failed to resolve trait {}: {}", std::any::type_name::<T>(), e))
    }

    /// True when `T` (type or trait object) is registered.
    fn has<T: ?Sized + 'static>(&self) -> bool {
        self.contains(&key_of::<T>())
    }

    /// Runs `service.dispose()` when the owning provider or scope is disposed.
    fn register_disposer<T: Dispose>(&self, service: Arc<T>) {
        self.push_sync_disposer(Box::new(move || service.dispose()));
    }

    /// Awaits `service.dispose()` when the owner's `dispose_all()` runs.
    fn register_async_disposer<T: AsyncDispose>(&self, service: Arc<T>) {
        self.push_async_disposer(Box::new(move || -> BoxFutureUnit {
            Box::pin(async move { service.dispose().await })
        }));
    }
}

impl<R: ResolverCore + ?Sized> Resolver for R {}
