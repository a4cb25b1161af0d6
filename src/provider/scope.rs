//! Scoped service resolution and lifecycle management.

use parking_lot::Mutex;

use super::{construct, ServiceProvider, SlotCache};
use crate::descriptors::ServiceDescriptor;
use crate::error::{DiError, DiResult};
use crate::internal::cast::{wrap_list, AnyArc};
use crate::internal::{BoxFutureUnit, DisposeBag, ResolutionGuard};
use crate::key::ServiceKey;
use crate::lifetime::Lifetime;
use crate::traits::ResolverCore;

/// Child resolver isolating scoped instances for one unit of work.
///
/// # Lifetime Behavior
///
/// - **Singleton**: resolved and cached by the root provider, shared by all scopes
/// - **Scoped**: resolved and cached within this scope; dependencies are
///   resolved through this scope, so nested scoped services share it
/// - **Transient**: built fresh on every resolution
///
/// Dropping a scope drops its cache and runs its synchronous disposal hooks.
///
/// # Examples
///
/// ```
/// use keyed_di::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// struct DatabaseConnection(String);
///
/// struct UserService {
///     db: Arc<DatabaseConnection>,
/// }
///
/// let mut collection = ServiceCollection::new();
/// collection.add_scoped_factory::<DatabaseConnection, _>(|_| {
///     DatabaseConnection("connection-123".to_string())
/// }).unwrap();
/// collection.add_transient_factory::<UserService, _>(|resolver| {
///     UserService { db: resolver.get_required::<DatabaseConnection>() }
/// }).unwrap();
///
/// let provider = collection.build();
/// let scope = provider.create_scope();
///
/// let user1 = scope.get_required::<UserService>();
/// let user2 = scope.get_required::<UserService>();
/// assert!(!Arc::ptr_eq(&user1, &user2));
/// assert!(Arc::ptr_eq(&user1.db, &user2.db));
/// ```
pub struct ServiceScope {
    root: ServiceProvider,
    scoped: SlotCache,
    scoped_disposers: Mutex<DisposeBag>,
}

impl ServiceScope {
    pub(crate) fn new(root: ServiceProvider) -> Self {
        Self {
            root,
            scoped: SlotCache::default(),
            scoped_disposers: Mutex::new(DisposeBag::default()),
        }
    }

    /// The provider this scope was created from.
    pub fn provider(&self) -> &ServiceProvider {
        &self.root
    }

    fn resolve_descriptor(
        &self,
        index: usize,
        descriptor: &ServiceDescriptor,
        requested: &ServiceKey,
    ) -> DiResult<AnyArc> {
        match descriptor.lifetime() {
            Lifetime::Singleton => self.root.resolve_singleton(index, descriptor, requested),
            Lifetime::Scoped => {
                let raw = self
                    .scoped
                    .get_or_construct(descriptor.cache_slot(index), requested, || construct(descriptor, self))?;
                descriptor.project(requested, raw)
            }
            Lifetime::Transient => descriptor.project(requested, construct(descriptor, self)?),
        }
    }

    fn resolve_unobserved(&self, key: &ServiceKey) -> DiResult<AnyArc> {
        let _guard = ResolutionGuard::enter(key)?;
        if let Some(contract) = key.as_collection() {
            return self.resolve_many(contract).map(wrap_list);
        }
        let (index, descriptor) = self
            .root
            .inner()
            .find(key)
            .ok_or_else(|| DiError::NotRegistered(key.display_name()))?;
        self.resolve_descriptor(index, descriptor, key)
    }

    /// Runs this scope's synchronous disposal hooks in LIFO order and clears
    /// the scoped cache.
    pub fn dispose(&self) {
        let hooks = self.scoped_disposers.lock().take_sync_reverse();
        tracing::trace!(hooks = hooks.len(), "disposing scope");
        for hook in hooks {
            hook();
        }
        self.scoped.clear();
    }

    /// Runs every disposal hook of this scope, async hooks first, then
    /// clears the scoped cache.
    pub async fn dispose_all(&self) {
        let async_hooks = self.scoped_disposers.lock().take_async_reverse();
        for hook in async_hooks {
            hook().await;
        }
        self.dispose();
    }
}

impl Drop for ServiceScope {
    fn drop(&mut self) {
        let bag = self.scoped_disposers.get_mut();
        if bag.async_len() > 0 {
            tracing::warn!(
                pending = bag.async_len(),
                "ServiceScope dropped with async disposal hooks; call dispose_all().await before dropping"
            );
        }
        for hook in bag.take_sync_reverse() {
            hook();
        }
    }
}

impl ResolverCore for ServiceScope {
    fn resolve(&self, key: &ServiceKey) -> DiResult<AnyArc> {
        self.root
            .inner()
            .observers()
            .observe(key, || self.resolve_unobserved(key))
            .inspect_err(|error| tracing::debug!(service = %key, %error, "scoped resolution failed"))
    }

    fn resolve_many(&self, contract: &ServiceKey) -> DiResult<Vec<AnyArc>> {
        self.root
            .inner()
            .contributors(contract)
            .map(|(index, d)| self.resolve_descriptor(index, d, d.service_type()))
            .collect()
    }

    fn contains(&self, key: &ServiceKey) -> bool {
        self.root.inner().contains(key)
    }

    fn push_sync_disposer(&self, f: Box<dyn FnOnce() + Send>) {
        self.scoped_disposers.lock().push_sync(f);
    }

    fn push_async_disposer(&self, f: Box<dyn FnOnce() -> BoxFutureUnit + Send>) {
        self.scoped_disposers.lock().push_async(f);
    }
}
