//! Service collection module for dependency injection.
//!
//! This module contains the ServiceCollection type: the ordered,
//! mutable-until-sealed list of registrations a provider is built from.

use std::fmt;
use std::sync::Arc;

use crate::descriptors::ServiceDescriptor;
use crate::error::{DiError, DiResult};
use crate::internal::cast::AnyArc;
use crate::key::{key_of, ServiceKey};
use crate::lifetime::Lifetime;
use crate::metadata::Injectable;
use crate::observer::{DiObserver, Observers};
use crate::provider::{ResolverContext, ServiceProvider};

pub mod module_system;
pub use module_system::*;

/// Ordered list of service registrations.
///
/// Lookups return the first registration satisfying a key, so earlier
/// registrations win. Once [`seal`](Self::seal) has been called every
/// mutating operation fails with [`DiError::SealedCollection`].
///
/// # Examples
///
/// ```rust
/// use keyed_di::{ServiceCollection, ServiceKey, DiError};
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton(8080u16).unwrap();
/// services.add_singleton(9090u16).unwrap();
/// assert_eq!(services.len(), 2);
/// assert_eq!(services.position(&ServiceKey::of::<u16>()), Some(0));
///
/// services.seal();
/// assert_eq!(services.add_singleton(1u8).unwrap_err(), DiError::SealedCollection);
/// ```
pub struct ServiceCollection {
    descriptors: Vec<ServiceDescriptor>,
    sealed: bool,
    observers: Observers,
}

impl ServiceCollection {
    /// Creates a new empty service collection.
    pub fn new() -> Self {
        Self {
            descriptors: Vec::new(),
            sealed: false,
            observers: Observers::new(),
        }
    }

    // ----- Core List Operations -----

    /// Appends a descriptor.
    pub fn add(&mut self, descriptor: ServiceDescriptor) -> DiResult<&mut Self> {
        self.ensure_mutable()?;
        self.descriptors.push(descriptor);
        Ok(self)
    }

    /// Appends every descriptor, stopping at the first failure.
    pub fn add_all<I>(&mut self, descriptors: I) -> DiResult<&mut Self>
    where
        I: IntoIterator<Item = ServiceDescriptor>,
    {
        self.ensure_mutable()?;
        self.descriptors.extend(descriptors);
        Ok(self)
    }

    /// Appends `descriptor` unless its service type is already registered.
    ///
    /// Returns whether the descriptor was added.
    pub fn try_add(&mut self, descriptor: ServiceDescriptor) -> DiResult<bool> {
        self.ensure_mutable()?;
        if self.position(descriptor.service_type()).is_some() {
            return Ok(false);
        }
        self.descriptors.push(descriptor);
        Ok(true)
    }

    /// Descriptor at `index`, in registration order.
    pub fn get(&self, index: usize) -> Option<&ServiceDescriptor> {
        self.descriptors.get(index)
    }

    /// Replaces the descriptor at `index`.
    pub fn set(&mut self, index: usize, descriptor: ServiceDescriptor) -> DiResult<&mut Self> {
        self.ensure_mutable()?;
        let len = self.descriptors.len();
        let slot = self.descriptors.get_mut(index).ok_or_else(|| {
            DiError::Registration(format!("index {} out of range for {} descriptors", index, len))
        })?;
        *slot = descriptor;
        Ok(self)
    }

    /// First descriptor whose service type is `key` or whose metadata
    /// provides `key`.
    pub fn find(&self, key: &ServiceKey) -> Option<&ServiceDescriptor> {
        self.descriptors.iter().find(|d| d.matches(key))
    }

    /// Position of the descriptor [`find`](Self::find) would return.
    pub fn position(&self, key: &ServiceKey) -> Option<usize> {
        self.descriptors.iter().position(|d| d.matches(key))
    }

    /// Freezes the collection. Idempotent.
    pub fn seal(&mut self) {
        if !self.sealed {
            tracing::debug!(descriptors = self.descriptors.len(), "service collection sealed");
        }
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Descriptors in registration order.
    pub fn iter(&self) -> std::slice::Iter<'_, ServiceDescriptor> {
        self.descriptors.iter()
    }

    fn ensure_mutable(&self) -> DiResult<()> {
        if self.sealed {
            Err(DiError::SealedCollection)
        } else {
            Ok(())
        }
    }

    // ----- Concrete Type Registrations -----

    /// Registers a singleton instance shared across the entire application.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use keyed_di::{ServiceCollection, Resolver};
    /// struct Config {
    ///     database_url: String
    /// }
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_singleton(Config {
    ///     database_url: "postgres://localhost".to_string()
    /// }).unwrap();
    ///
    /// let provider = services.build();
    /// assert_eq!(provider.get_required::<Config>().database_url, "postgres://localhost");
    /// ```
    pub fn add_singleton<T: Send + Sync + 'static>(&mut self, value: T) -> DiResult<&mut Self> {
        self.add(ServiceDescriptor::from_instance(key_of::<T>(), value)?)
    }

    /// Registers a singleton instance under a string-named contract.
    pub fn add_named_singleton<T: Send + Sync + 'static>(
        &mut self,
        name: &'static str,
        value: T,
    ) -> DiResult<&mut Self> {
        self.add(ServiceDescriptor::from_instance(ServiceKey::named(name), value)?)
    }

    /// Registers a singleton instance unless `T` is already registered.
    pub fn try_add_singleton<T: Send + Sync + 'static>(&mut self, value: T) -> DiResult<bool> {
        self.try_add(ServiceDescriptor::from_instance(key_of::<T>(), value)?)
    }

    /// Registers a factory called once, on first request.
    pub fn add_singleton_factory<T, F>(&mut self, factory: F) -> DiResult<&mut Self>
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext) -> T + Send + Sync + 'static,
    {
        self.add_factory(Lifetime::Singleton, factory)
    }

    /// Registers a factory called once per scope.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use keyed_di::{ServiceCollection, Resolver};
    /// # use std::sync::Arc;
    /// struct Database { url: String }
    /// struct RequestContext { request_id: String }
    /// struct UserService { db: Arc<Database>, context: Arc<RequestContext> }
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_singleton(Database { url: "postgres://localhost".to_string() }).unwrap();
    /// services.add_scoped_factory::<RequestContext, _>(|_| {
    ///     RequestContext { request_id: "req-123".to_string() }
    /// }).unwrap();
    /// services.add_scoped_factory::<UserService, _>(|resolver| {
    ///     UserService {
    ///         db: resolver.get_required::<Database>(),
    ///         context: resolver.get_required::<RequestContext>()
    ///     }
    /// }).unwrap();
    ///
    /// let provider = services.build();
    /// let scope = provider.create_scope();
    /// assert_eq!(scope.get_required::<UserService>().context.request_id, "req-123");
    /// ```
    pub fn add_scoped_factory<T, F>(&mut self, factory: F) -> DiResult<&mut Self>
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext) -> T + Send + Sync + 'static,
    {
        self.add_factory(Lifetime::Scoped, factory)
    }

    /// Registers a factory called on every request.
    pub fn add_transient_factory<T, F>(&mut self, factory: F) -> DiResult<&mut Self>
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext) -> T + Send + Sync + 'static,
    {
        self.add_factory(Lifetime::Transient, factory)
    }

    /// Registers a fallible factory; its errors reach the caller of `get`
    /// unchanged.
    pub fn add_try_factory<T, F>(&mut self, lifetime: Lifetime, factory: F) -> DiResult<&mut Self>
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext) -> DiResult<T> + Send + Sync + 'static,
    {
        self.add(ServiceDescriptor::from_factory(key_of::<T>(), lifetime, factory)?)
    }

    fn add_factory<T, F>(&mut self, lifetime: Lifetime, factory: F) -> DiResult<&mut Self>
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext) -> T + Send + Sync + 'static,
    {
        self.add_try_factory(lifetime, move |r: &ResolverContext| Ok(factory(r)))
    }

    // ----- Trait Single-Binding Registrations -----

    /// Registers a singleton trait implementation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use keyed_di::{ServiceCollection, Resolver};
    /// # use std::sync::Arc;
    /// trait Logger: Send + Sync {
    ///     fn log(&self, message: &str);
    /// }
    ///
    /// struct FileLogger { path: String }
    /// impl Logger for FileLogger {
    ///     fn log(&self, _message: &str) {}
    /// }
    ///
    /// let mut services = ServiceCollection::new();
    /// let logger = Arc::new(FileLogger { path: "/var/log/app.log".to_string() });
    /// services.add_singleton_trait::<dyn Logger>(logger).unwrap();
    /// assert!(services.build().has::<dyn Logger>());
    /// ```
    pub fn add_singleton_trait<T>(&mut self, value: Arc<T>) -> DiResult<&mut Self>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.add(ServiceDescriptor::from_trait_instance(key_of::<T>(), value)?)
    }

    pub fn add_singleton_trait_factory<Trait, F>(&mut self, factory: F) -> DiResult<&mut Self>
    where
        Trait: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext) -> Arc<Trait> + Send + Sync + 'static,
    {
        self.add_trait_factory_impl(key_of::<Trait>(), Lifetime::Singleton, factory)
    }

    pub fn add_scoped_trait_factory<Trait, F>(&mut self, factory: F) -> DiResult<&mut Self>
    where
        Trait: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext) -> Arc<Trait> + Send + Sync + 'static,
    {
        self.add_trait_factory_impl(key_of::<Trait>(), Lifetime::Scoped, factory)
    }

    pub fn add_transient_trait_factory<Trait, F>(&mut self, factory: F) -> DiResult<&mut Self>
    where
        Trait: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext) -> Arc<Trait> + Send + Sync + 'static,
    {
        self.add_trait_factory_impl(key_of::<Trait>(), Lifetime::Transient, factory)
    }

    fn add_trait_factory_impl<Trait, F>(
        &mut self,
        key: ServiceKey,
        lifetime: Lifetime,
        factory: F,
    ) -> DiResult<&mut Self>
    where
        Trait: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext) -> Arc<Trait> + Send + Sync + 'static,
    {
        self.add(ServiceDescriptor::from_trait_factory(
            key,
            lifetime,
            move |r: &ResolverContext| Ok(factory(r)),
        )?)
    }

    // ----- Metadata-Driven Registrations -----

    /// Registers `I` under its own key, constructed from its metadata.
    pub fn add_type<I: Injectable>(&mut self, lifetime: Lifetime) -> DiResult<&mut Self> {
        self.add(ServiceDescriptor::from_type::<I>(key_of::<I>(), lifetime)?)
    }

    /// Registers `I` once per contract its metadata provides.
    ///
    /// For singleton and scoped lifetimes every contract resolves to the same
    /// instance.
    pub fn add_provides<I: Injectable>(&mut self) -> DiResult<&mut Self> {
        let descriptors = ServiceDescriptor::from_provides::<I>()?;
        self.add_all(descriptors)
    }

    /// Adds `I` to the implementations of `contract`.
    pub fn add_implementation<I: Injectable>(
        &mut self,
        contract: &ServiceKey,
        lifetime: Lifetime,
    ) -> DiResult<&mut Self> {
        self.add(ServiceDescriptor::implementation::<I>(contract, lifetime)?)
    }

    // ----- Trait Multi-Binding Registrations -----

    /// Adds a singleton instance of `I` to the implementations of trait `C`.
    ///
    /// Resolve them together with `get_all_trait::<C>()` or through a
    /// "collection of C" dependency.
    pub fn add_trait_implementation<C, I>(&mut self, value: I, cast: fn(Arc<I>) -> Arc<C>) -> DiResult<&mut Self>
    where
        C: ?Sized + Send + Sync + 'static,
        I: Send + Sync + 'static,
    {
        let key = ServiceKey::implementation(&key_of::<I>(), &key_of::<C>());
        let instance: AnyArc = Arc::new(cast(Arc::new(value)));
        self.add(ServiceDescriptor::from_any_instance(key, instance)?)
    }

    /// Adds a factory to the implementations of trait `C`.
    pub fn add_trait_factory<C, F>(&mut self, lifetime: Lifetime, factory: F) -> DiResult<&mut Self>
    where
        C: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext) -> Arc<C> + Send + Sync + 'static,
    {
        // Keyed by the closure type; caching is per descriptor, so repeated
        // registrations of one closure type stay separate instances
        let key = ServiceKey::implementation(&key_of::<F>(), &key_of::<C>());
        self.add_trait_factory_impl(key, lifetime, factory)
    }

    // ----- Observers -----

    /// Adds an observer notified around every resolution.
    ///
    /// ```
    /// use keyed_di::{ServiceCollection, TracingObserver};
    /// use std::sync::Arc;
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_observer(Arc::new(TracingObserver::new())).unwrap();
    ///
    /// services.seal();
    /// assert!(services.add_observer(Arc::new(TracingObserver::new())).is_err());
    /// ```
    pub fn add_observer(&mut self, observer: Arc<dyn DiObserver>) -> DiResult<&mut Self> {
        self.ensure_mutable()?;
        self.observers.add(observer);
        Ok(self)
    }

    pub(crate) fn observers(&self) -> &Observers {
        &self.observers
    }

    /// Seals the collection and builds the root provider.
    ///
    /// ```
    /// use keyed_di::{ServiceCollection, Resolver};
    ///
    /// let mut collection = ServiceCollection::new();
    /// collection.add_singleton(42usize).unwrap();
    /// collection.add_transient_factory::<String, _>(|_| "Hello".to_string()).unwrap();
    ///
    /// let provider = collection.build();
    /// assert_eq!(*provider.get_required::<usize>(), 42);
    /// assert_eq!(&*provider.get_required::<String>(), "Hello");
    /// ```
    pub fn build(self) -> ServiceProvider {
        ServiceProvider::new(self)
    }
}

impl Default for ServiceCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ServiceCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceCollection")
            .field("descriptors", &self.descriptors)
            .field("sealed", &self.sealed)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl<'a> IntoIterator for &'a ServiceCollection {
    type Item = &'a ServiceDescriptor;
    type IntoIter = std::slice::Iter<'a, ServiceDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
