//! Resolver context handed to factories.

use crate::error::DiResult;
use crate::internal::cast::AnyArc;
use crate::internal::BoxFutureUnit;
use crate::key::ServiceKey;
use crate::traits::ResolverCore;

/// Context passed to factory functions for resolving dependencies.
///
/// Wraps whichever resolver is constructing the service: the root provider
/// for singletons, or the scope for scoped and transient services. Disposal
/// hooks registered through the context belong to that same owner.
///
/// # Examples
///
/// ```
/// use keyed_di::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct UserService { db: Arc<Database> }
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton(Database { url: "postgres://localhost".to_string() }).unwrap();
/// services.add_try_factory::<UserService, _>(keyed_di::Lifetime::Transient, |resolver| {
///     Ok(UserService { db: resolver.get::<Database>()? })
/// }).unwrap();
///
/// let provider = services.build();
/// assert_eq!(provider.get_required::<UserService>().db.url, "postgres://localhost");
/// ```
pub struct ResolverContext<'a> {
    resolver: &'a dyn ResolverCore,
}

impl<'a> ResolverContext<'a> {
    pub(crate) fn new(resolver: &'a dyn ResolverCore) -> Self {
        Self { resolver }
    }
}

impl<'a> ResolverCore for ResolverContext<'a> {
    fn resolve(&self, key: &ServiceKey) -> DiResult<AnyArc> {
        self.resolver.resolve(key)
    }

    fn resolve_many(&self, contract: &ServiceKey) -> DiResult<Vec<AnyArc>> {
        self.resolver.resolve_many(contract)
    }

    fn contains(&self, key: &ServiceKey) -> bool {
        self.resolver.contains(key)
    }

    fn push_sync_disposer(&self, f: Box<dyn FnOnce() + Send>) {
        self.resolver.push_sync_disposer(f);
    }

    fn push_async_disposer(&self, f: Box<dyn FnOnce() -> BoxFutureUnit + Send>) {
        self.resolver.push_async_disposer(f);
    }
}
