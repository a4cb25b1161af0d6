//! Service module system for modular registration.

use crate::collection::ServiceCollection;
use crate::error::DiResult;

/// A reusable group of registrations.
///
/// # Example
///
/// ```rust
/// use keyed_di::{ServiceCollection, ServiceModule, DiResult, Resolver};
///
/// #[derive(Default)]
/// struct UserConfig;
///
/// struct UserService;
/// impl UserService {
///     fn new(_config: std::sync::Arc<UserConfig>) -> Self { Self }
/// }
///
/// struct UserModule;
///
/// impl ServiceModule for UserModule {
///     fn register_services(self, services: &mut ServiceCollection) -> DiResult<()> {
///         services.add_singleton(UserConfig::default())?;
///         services.add_scoped_factory::<UserService, _>(|r| {
///             UserService::new(r.get_required::<UserConfig>())
///         })?;
///         Ok(())
///     }
/// }
///
/// # fn main() -> DiResult<()> {
/// let mut services = ServiceCollection::new();
/// services.add_module(UserModule)?;
/// let provider = services.build();
/// assert!(provider.has::<UserService>());
/// # Ok(())
/// # }
/// ```
pub trait ServiceModule {
    /// Registers this module's services.
    fn register_services(self, services: &mut ServiceCollection) -> DiResult<()>;
}

impl<F> ServiceModule for F
where
    F: FnOnce(&mut ServiceCollection) -> DiResult<()>,
{
    fn register_services(self, services: &mut ServiceCollection) -> DiResult<()> {
        self(services)
    }
}

impl ServiceCollection {
    /// Applies `module` to this collection.
    ///
    /// Registration errors raised by the module propagate unchanged; a sealed
    /// collection fails before the module runs.
    pub fn add_module<M: ServiceModule>(&mut self, module: M) -> DiResult<&mut Self> {
        if self.is_sealed() {
            return Err(crate::error::DiError::SealedCollection);
        }
        module.register_services(self)?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiError;

    #[test]
    fn closures_are_modules() {
        let mut services = ServiceCollection::new();
        services
            .add_module(|s: &mut ServiceCollection| -> DiResult<()> {
                s.add_singleton(1u8)?;
                s.add_singleton(2u16)?;
                Ok(())
            })
            .unwrap();
        assert_eq!(services.len(), 2);
    }

    #[test]
    fn sealed_collections_reject_modules() {
        let mut services = ServiceCollection::new();
        services.seal();
        let result = services.add_module(|_: &mut ServiceCollection| -> DiResult<()> { Ok(()) });
        assert!(matches!(result, Err(DiError::SealedCollection)));
    }
}
