//! Service provider module for dependency injection.
//!
//! This module contains the root [`ServiceProvider`], the [`ServiceScope`]
//! child resolver and the [`ResolverContext`] handed to factories.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::collection::ServiceCollection;
use crate::descriptors::{CacheSlot, ServiceDescriptor, Strategy};
use crate::error::{DiError, DiResult};
use crate::internal::cast::{wrap_list, AnyArc};
use crate::internal::{BoxFutureUnit, DisposeBag, ResolutionGuard, SlotGuard};
use crate::key::ServiceKey;
use crate::lifetime::Lifetime;
use crate::metadata::Dependencies;
use crate::observer::Observers;
use crate::traits::ResolverCore;

pub mod context;
pub mod scope;

pub use context::ResolverContext;
pub use scope::ServiceScope;

/// Root resolver built from a sealed [`ServiceCollection`].
///
/// The provider owns the collection snapshot and the singleton cache. It is
/// cheap to clone; clones share the same caches and disposal hooks.
///
/// # Thread Safety
///
/// Resolution may run concurrently from several threads. Each cached
/// instance has its own init cell: the first caller runs the factory while
/// later callers for that slot wait, so a singleton is built exactly once.
/// Unrelated slots initialize in parallel.
///
/// # Examples
///
/// ```
/// use keyed_di::{ServiceCollection, ServiceProvider, Resolver, DiError};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct UserService { db: Arc<Database> }
///
/// let mut collection = ServiceCollection::new();
/// collection.add_singleton(Database { url: "postgres://localhost".to_string() }).unwrap();
/// collection.add_transient_factory::<UserService, _>(|resolver| {
///     UserService { db: resolver.get_required::<Database>() }
/// }).unwrap();
///
/// let provider = ServiceProvider::new(collection);
/// let user_service = provider.get_required::<UserService>();
/// assert_eq!(user_service.db.url, "postgres://localhost");
/// ```
pub struct ServiceProvider {
    inner: Arc<ProviderInner>,
}

pub(crate) struct ProviderInner {
    collection: ServiceCollection,
    singletons: SlotCache,
    root_disposers: Mutex<DisposeBag>,
    observers: Observers,
}

impl ProviderInner {
    /// First registration satisfying `key`, with its position.
    pub(crate) fn find(&self, key: &ServiceKey) -> Option<(usize, &ServiceDescriptor)> {
        let index = self.collection.position(key)?;
        self.collection.get(index).map(|d| (index, d))
    }

    /// Every registration contributing to `contract`, in registration order.
    pub(crate) fn contributors<'a>(
        &'a self,
        contract: &'a ServiceKey,
    ) -> impl Iterator<Item = (usize, &'a ServiceDescriptor)> + 'a {
        self.collection
            .iter()
            .enumerate()
            .filter(move |(_, d)| d.contributes_to(contract))
    }

    /// Collection keys always resolve, to an empty list when nothing
    /// contributes, so they are always contained.
    pub(crate) fn contains(&self, key: &ServiceKey) -> bool {
        key.as_collection().is_some() || self.collection.position(key).is_some()
    }

    pub(crate) fn observers(&self) -> &Observers {
        &self.observers
    }
}

impl ServiceProvider {
    /// Seals `collection` and builds a provider over it.
    ///
    /// The provider owns the collection, so the descriptors it sees are
    /// exactly those registered before this call.
    pub fn new(mut collection: ServiceCollection) -> Self {
        collection.seal();
        let observers = collection.observers().clone();
        tracing::debug!(
            descriptors = collection.len(),
            observers = observers.len(),
            "service provider built"
        );
        Self {
            inner: Arc::new(ProviderInner {
                collection,
                singletons: SlotCache::default(),
                root_disposers: Mutex::new(DisposeBag::default()),
                observers,
            }),
        }
    }

    #[inline]
    pub(crate) fn inner(&self) -> &ProviderInner {
        &self.inner
    }

    /// Creates a new scope for resolving scoped services.
    ///
    /// Each scope keeps its own cache of scoped instances while singletons
    /// keep coming from this provider.
    ///
    /// # Examples
    ///
    /// ```
    /// use keyed_di::{ServiceCollection, Resolver};
    /// use std::sync::Arc;
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    ///
    /// struct RequestId(usize);
    ///
    /// let counter = Arc::new(AtomicUsize::new(0));
    /// let next = counter.clone();
    ///
    /// let mut collection = ServiceCollection::new();
    /// collection.add_scoped_factory::<RequestId, _>(move |_| {
    ///     RequestId(next.fetch_add(1, Ordering::SeqCst))
    /// }).unwrap();
    ///
    /// let provider = collection.build();
    /// let scope1 = provider.create_scope();
    /// let scope2 = provider.create_scope();
    ///
    /// let req1a = scope1.get_required::<RequestId>();
    /// let req1b = scope1.get_required::<RequestId>();
    /// let req2 = scope2.get_required::<RequestId>();
    ///
    /// assert!(Arc::ptr_eq(&req1a, &req1b));
    /// assert!(!Arc::ptr_eq(&req1a, &req2));
    /// ```
    pub fn create_scope(&self) -> ServiceScope {
        tracing::trace!("scope created");
        ServiceScope::new(self.clone())
    }

    /// The sealed collection this provider resolves from.
    pub fn collection(&self) -> &ServiceCollection {
        &self.inner.collection
    }

    /// Resolves a singleton registration through the root cache.
    ///
    /// Singletons are always built by the root, so their dependencies come
    /// from the root as well, whichever scope asked for them.
    pub(crate) fn resolve_singleton(
        &self,
        index: usize,
        descriptor: &ServiceDescriptor,
        requested: &ServiceKey,
    ) -> DiResult<AnyArc> {
        if let Strategy::Instance(instance) = descriptor.strategy() {
            return Ok(instance.clone());
        }
        let raw = self
            .inner
            .singletons
            .get_or_construct(descriptor.cache_slot(index), requested, || construct(descriptor, self))?;
        descriptor.project(requested, raw)
    }

    fn resolve_descriptor(
        &self,
        index: usize,
        descriptor: &ServiceDescriptor,
        requested: &ServiceKey,
    ) -> DiResult<AnyArc> {
        match descriptor.lifetime() {
            Lifetime::Singleton => self.resolve_singleton(index, descriptor, requested),
            Lifetime::Scoped => Err(DiError::ScopedOutsideScope(requested.display_name())),
            Lifetime::Transient => descriptor.project(requested, construct(descriptor, self)?),
        }
    }

    fn resolve_unobserved(&self, key: &ServiceKey) -> DiResult<AnyArc> {
        let _guard = ResolutionGuard::enter(key)?;
        if let Some(contract) = key.as_collection() {
            return self.resolve_many(contract).map(wrap_list);
        }
        let (index, descriptor) = self
            .inner
            .find(key)
            .ok_or_else(|| DiError::NotRegistered(key.display_name()))?;
        self.resolve_descriptor(index, descriptor, key)
    }

    /// Runs synchronous disposal hooks in LIFO order and clears the
    /// singleton cache.
    ///
    /// Async hooks are left in place; use [`dispose_all`](Self::dispose_all)
    /// when any were registered.
    pub fn dispose(&self) {
        let hooks = self.inner.root_disposers.lock().take_sync_reverse();
        tracing::debug!(hooks = hooks.len(), "disposing service provider");
        for hook in hooks {
            hook();
        }
        self.inner.singletons.clear();
    }

    /// Runs every disposal hook in LIFO order, async hooks first, then
    /// clears the singleton cache.
    ///
    /// # Examples
    ///
    /// ```
    /// use keyed_di::{ServiceCollection, Dispose, AsyncDispose, Resolver};
    /// use async_trait::async_trait;
    /// use std::sync::Arc;
    ///
    /// struct Cache;
    /// impl Dispose for Cache {
    ///     fn dispose(&self) {
    ///         println!("Cache disposed");
    ///     }
    /// }
    ///
    /// struct Client;
    /// #[async_trait]
    /// impl AsyncDispose for Client {
    ///     async fn dispose(&self) {
    ///         println!("Client disposed");
    ///     }
    /// }
    ///
    /// # async fn example() {
    /// let mut services = ServiceCollection::new();
    /// services.add_singleton_factory::<Cache, _>(|r| {
    ///     r.register_disposer(Arc::new(Cache));
    ///     Cache
    /// }).unwrap();
    /// services.add_singleton_factory::<Client, _>(|r| {
    ///     r.register_async_disposer(Arc::new(Client));
    ///     Client
    /// }).unwrap();
    ///
    /// let provider = services.build();
    /// provider.get_required::<Cache>();
    /// provider.get_required::<Client>();
    /// provider.dispose_all().await;
    /// # }
    /// ```
    pub async fn dispose_all(&self) {
        let async_hooks = self.inner.root_disposers.lock().take_async_reverse();
        tracing::debug!(hooks = async_hooks.len(), "running async disposal hooks");
        for hook in async_hooks {
            hook().await;
        }
        self.dispose();
    }

    #[cfg(feature = "diagnostics")]
    pub fn to_debug_string(&self) -> String {
        let mut s = String::new();
        s.push_str("=== Service Provider Debug ===\n");
        for (index, descriptor) in self.inner.collection.iter().enumerate() {
            s.push_str(&format!(
                "  [{}] {}: {}\n",
                index,
                descriptor.service_type(),
                descriptor.lifetime()
            ));
        }
        s.push_str(&format!("Cached singletons: {}\n", self.inner.singletons.len()));
        s
    }
}

impl Clone for ServiceProvider {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl Drop for ServiceProvider {
    fn drop(&mut self) {
        if Arc::strong_count(&self.inner) == 1 {
            if let Some(bag) = self.inner.root_disposers.try_lock() {
                if !bag.is_empty() {
                    tracing::warn!(
                        "ServiceProvider dropped with undisposed resources; call dispose_all().await before dropping"
                    );
                }
            }
        }
    }
}

impl ResolverCore for ServiceProvider {
    fn resolve(&self, key: &ServiceKey) -> DiResult<AnyArc> {
        self.inner
            .observers
            .observe(key, || self.resolve_unobserved(key))
            .inspect_err(|error| tracing::debug!(service = %key, %error, "resolution failed"))
    }

    fn resolve_many(&self, contract: &ServiceKey) -> DiResult<Vec<AnyArc>> {
        self.inner
            .contributors(contract)
            .map(|(index, d)| self.resolve_descriptor(index, d, d.service_type()))
            .collect()
    }

    fn contains(&self, key: &ServiceKey) -> bool {
        self.inner.contains(key)
    }

    fn push_sync_disposer(&self, f: Box<dyn FnOnce() + Send>) {
        self.inner.root_disposers.lock().push_sync(f);
    }

    fn push_async_disposer(&self, f: Box<dyn FnOnce() -> BoxFutureUnit + Send>) {
        self.inner.root_disposers.lock().push_async(f);
    }
}

/// Builds a raw instance of `descriptor`, resolving its dependencies
/// through `resolver`.
pub(crate) fn construct(descriptor: &ServiceDescriptor, resolver: &dyn ResolverCore) -> DiResult<AnyArc> {
    match descriptor.strategy() {
        Strategy::Instance(instance) => Ok(instance.clone()),
        Strategy::Factory(factory) => factory(&ResolverContext::new(resolver)),
        Strategy::Type { metadata, construct: build } => {
            let mut entries = Vec::with_capacity(metadata.inject().len());
            for (name, key) in metadata.inject() {
                entries.push((*name, resolver.resolve(key)?));
            }
            build(Dependencies::new(entries))
        }
    }
}

/// Instances cached per [`CacheSlot`], one init cell each.
#[derive(Default)]
pub(crate) struct SlotCache {
    cells: Mutex<HashMap<CacheSlot, Arc<OnceCell<AnyArc>>>>,
}

impl SlotCache {
    /// Returns the instance cached for `slot`, running `create` if there is
    /// none yet.
    ///
    /// The map lock is only held to find the cell, so `create` may resolve
    /// other services. Concurrent callers for the same slot block on the cell
    /// until the first one finishes; a failed `create` leaves the cell empty
    /// for the next caller.
    pub(crate) fn get_or_construct<F>(&self, slot: CacheSlot, requested: &ServiceKey, create: F) -> DiResult<AnyArc>
    where
        F: FnOnce() -> DiResult<AnyArc>,
    {
        let cell = self
            .cells
            .lock()
            .entry(slot.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        if let Some(cached) = cell.get() {
            return Ok(cached.clone());
        }

        let _guard = SlotGuard::enter(self as *const Self as usize, &slot, requested)?;
        cell.get_or_try_init(create).cloned()
    }

    pub(crate) fn clear(&self) {
        self.cells.lock().clear();
    }

    #[cfg(feature = "diagnostics")]
    pub(crate) fn len(&self) -> usize {
        self.cells.lock().values().filter(|cell| cell.get().is_some()).count()
    }
}
