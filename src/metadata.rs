//! Declarative metadata driving automatic construction.
//!
//! A type that the container can build on its own implements [`Injectable`]:
//! it declares which contracts it provides, which named dependencies its
//! constructor needs, and optionally its lifetime. The provider resolves every
//! declared dependency through the same `get` entry point and hands the
//! results to [`Injectable::construct`] as a [`Dependencies`] bag.

use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::internal::cast::{downcast_instance, downcast_list, downcast_trait, AnyArc};
use crate::key::{key_of, ServiceKey};
use crate::lifetime::Lifetime;

type Caster = Arc<dyn Fn(AnyArc) -> DiResult<AnyArc> + Send + Sync>;

/// A type the container can construct from its metadata.
///
/// # Examples
///
/// ```rust
/// use keyed_di::{Injectable, ServiceMetadata, Dependencies, DiResult, Lifetime,
///     ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// struct Config { env: &'static str }
///
/// struct Greeter { config: Arc<Config> }
///
/// impl Injectable for Greeter {
///     fn metadata() -> ServiceMetadata {
///         ServiceMetadata::builder::<Self>()
///             .provides_self()
///             .inject::<Config>("config")
///             .lifetime(Lifetime::Transient)
///             .build()
///     }
///
///     fn construct(deps: Dependencies) -> DiResult<Self> {
///         Ok(Greeter { config: deps.get("config")? })
///     }
/// }
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton(Config { env: "prod" }).unwrap();
/// services.add_provides::<Greeter>().unwrap();
///
/// let provider = services.build();
/// let greeter = provider.get_required::<Greeter>();
/// assert_eq!(greeter.config.env, "prod");
/// ```
pub trait Injectable: Sized + Send + Sync + 'static {
    /// Describes what this type provides and what it needs.
    fn metadata() -> ServiceMetadata;

    /// Builds the instance from its resolved dependencies.
    fn construct(deps: Dependencies) -> DiResult<Self>;
}

/// One contract provided by an implementation.
#[derive(Clone)]
pub struct Capability {
    key: ServiceKey,
    cast: Option<Caster>,
}

impl Capability {
    /// Key of the provided contract.
    pub fn key(&self) -> &ServiceKey {
        &self.key
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capability")
            .field("key", &self.key)
            .field("projected", &self.cast.is_some())
            .finish()
    }
}

/// Metadata for one concrete implementation.
#[derive(Debug, Clone)]
pub struct ServiceMetadata {
    implementation: ServiceKey,
    provides: Vec<Capability>,
    inject: Vec<(&'static str, ServiceKey)>,
    lifetime: Option<Lifetime>,
}

impl ServiceMetadata {
    /// Starts describing implementation `I`.
    pub fn builder<I: Send + Sync + 'static>() -> MetadataBuilder<I> {
        MetadataBuilder {
            metadata: ServiceMetadata {
                implementation: key_of::<I>(),
                provides: Vec::new(),
                inject: Vec::new(),
                lifetime: None,
            },
            _impl: PhantomData,
        }
    }

    /// Key of the concrete implementation.
    pub fn implementation(&self) -> &ServiceKey {
        &self.implementation
    }

    /// Provided contracts in declaration order.
    pub fn provides(&self) -> impl Iterator<Item = &ServiceKey> {
        self.provides.iter().map(|c| &c.key)
    }

    /// True when `key` is one of the provided contracts.
    pub fn provides_key(&self, key: &ServiceKey) -> bool {
        self.provides.iter().any(|c| &c.key == key)
    }

    /// Named constructor dependencies in declaration order.
    pub fn inject(&self) -> &[(&'static str, ServiceKey)] {
        &self.inject
    }

    /// Declared lifetime, if any.
    pub fn lifetime(&self) -> Option<Lifetime> {
        self.lifetime
    }

    /// Checks the metadata contract.
    ///
    /// `provides` must be non-empty, every key must be valid, and dependency
    /// names must be non-empty and unique.
    pub fn validate(&self) -> DiResult<()> {
        if self.provides.is_empty() {
            return Err(DiError::Registration(format!(
                "{} declares no provided contracts",
                self.implementation
            )));
        }
        for capability in &self.provides {
            capability.key.validate()?;
        }

        let mut names = HashSet::new();
        for (name, key) in &self.inject {
            if name.trim().is_empty() {
                return Err(DiError::Registration(format!(
                    "{} declares a dependency with an empty name",
                    self.implementation
                )));
            }
            if !names.insert(*name) {
                return Err(DiError::Registration(format!(
                    "{} declares dependency '{}' twice",
                    self.implementation, name
                )));
            }
            key.validate()?;
        }
        Ok(())
    }

    /// Converts a raw implementation instance into the representation of
    /// `requested`.
    pub(crate) fn project(&self, requested: &ServiceKey, raw: AnyArc) -> DiResult<AnyArc> {
        let contract = requested.contract();
        if contract == &self.implementation {
            return Ok(raw);
        }
        match self.provides.iter().find(|c| &c.key == contract) {
            Some(Capability { cast: Some(cast), .. }) => cast(raw),
            Some(Capability { cast: None, .. }) => Ok(raw),
            None => Err(DiError::TypeMismatch(format!(
                "{} does not provide {}",
                self.implementation, contract
            ))),
        }
    }
}

/// Fluent builder for [`ServiceMetadata`].
pub struct MetadataBuilder<I> {
    metadata: ServiceMetadata,
    _impl: PhantomData<fn() -> I>,
}

impl<I: Send + Sync + 'static> MetadataBuilder<I> {
    /// Provides `I` itself.
    pub fn provides_self(mut self) -> Self {
        self.metadata.provides.push(Capability {
            key: key_of::<I>(),
            cast: None,
        });
        self
    }

    /// Provides contract `C`, usually a trait object, through `cast`.
    ///
    /// ```rust
    /// use keyed_di::ServiceMetadata;
    /// use std::sync::Arc;
    ///
    /// trait Clock: Send + Sync {}
    /// struct SystemClock;
    /// impl Clock for SystemClock {}
    ///
    /// let metadata = ServiceMetadata::builder::<SystemClock>()
    ///     .provides::<dyn Clock>(|this| this as Arc<dyn Clock>)
    ///     .build();
    /// assert_eq!(metadata.provides().count(), 1);
    /// ```
    pub fn provides<C>(mut self, cast: fn(Arc<I>) -> Arc<C>) -> Self
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let caster: Caster = Arc::new(move |raw: AnyArc| {
            let typed = downcast_instance::<I>(raw)?;
            Ok(Arc::new(cast(typed)) as AnyArc)
        });
        self.metadata.provides.push(Capability {
            key: key_of::<C>(),
            cast: Some(caster),
        });
        self
    }

    /// Provides an arbitrary key; resolutions return the raw `Arc<I>`.
    pub fn provides_key(mut self, key: ServiceKey) -> Self {
        self.metadata.provides.push(Capability { key, cast: None });
        self
    }

    /// Declares a dependency on `T` under `name`.
    pub fn inject<T: ?Sized + 'static>(self, name: &'static str) -> Self {
        self.inject_key(name, key_of::<T>())
    }

    /// Declares a dependency on an explicit key under `name`.
    pub fn inject_key(mut self, name: &'static str, key: ServiceKey) -> Self {
        self.metadata.inject.push((name, key));
        self
    }

    /// Declares a dependency on every registration of `T`.
    pub fn inject_all<T: ?Sized + 'static>(self, name: &'static str) -> Self {
        self.inject_key(name, ServiceKey::collection_of(&key_of::<T>()))
    }

    /// Declares the lifetime used by `from_provides`.
    pub fn lifetime(mut self, lifetime: Lifetime) -> Self {
        self.metadata.lifetime = Some(lifetime);
        self
    }

    pub fn build(self) -> ServiceMetadata {
        self.metadata
    }
}

/// Resolved constructor dependencies, looked up by declared name.
pub struct Dependencies {
    entries: Vec<(&'static str, AnyArc)>,
}

impl Dependencies {
    pub(crate) fn new(entries: Vec<(&'static str, AnyArc)>) -> Self {
        Self { entries }
    }

    fn entry(&self, name: &'static str) -> DiResult<AnyArc> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.clone())
            .ok_or(DiError::UndeclaredDependency(name))
    }

    /// Concrete dependency.
    pub fn get<T: Send + Sync + 'static>(&self, name: &'static str) -> DiResult<Arc<T>> {
        downcast_instance(self.entry(name)?)
    }

    /// Trait-object dependency.
    pub fn get_trait<T: ?Sized + Send + Sync + 'static>(&self, name: &'static str) -> DiResult<Arc<T>> {
        downcast_trait(self.entry(name)?)
    }

    /// Every concrete registration declared with `inject_all`.
    pub fn all<T: Send + Sync + 'static>(&self, name: &'static str) -> DiResult<Vec<Arc<T>>> {
        downcast_list(self.entry(name)?)?
            .into_iter()
            .map(downcast_instance)
            .collect()
    }

    /// Every trait-object registration declared with `inject_all`.
    pub fn all_trait<T: ?Sized + Send + Sync + 'static>(&self, name: &'static str) -> DiResult<Vec<Arc<T>>> {
        downcast_list(self.entry(name)?)?
            .into_iter()
            .map(downcast_trait)
            .collect()
    }

    /// Number of resolved dependencies.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
