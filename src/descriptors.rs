//! Service descriptors: one registration entry each.

use std::fmt;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::internal::cast::AnyArc;
use crate::key::{key_of, ServiceKey};
use crate::lifetime::Lifetime;
use crate::metadata::{Dependencies, Injectable, ServiceMetadata};
use crate::provider::ResolverContext;

/// Factory invoked with the resolver that is constructing the service.
pub type FactoryFn = Arc<dyn for<'a> Fn(&ResolverContext<'a>) -> DiResult<AnyArc> + Send + Sync>;

/// Builds an implementation from its resolved dependency bag.
pub type ConstructFn = Arc<dyn Fn(Dependencies) -> DiResult<AnyArc> + Send + Sync>;

/// How a descriptor produces its instance.
#[derive(Clone)]
pub enum Strategy {
    /// Construct an [`Injectable`] type from its resolved dependency bag.
    Type {
        metadata: ServiceMetadata,
        construct: ConstructFn,
    },
    /// Call a factory with the resolving context.
    Factory(FactoryFn),
    /// Hand out a fixed instance.
    Instance(AnyArc),
}

impl Strategy {
    fn name(&self) -> &'static str {
        match self {
            Strategy::Type { .. } => "type",
            Strategy::Factory(_) => "factory",
            Strategy::Instance(_) => "instance",
        }
    }
}

/// Identity of a cached instance.
///
/// Everything registered from one implementation type shares a slot, so a
/// singleton providing two contracts is built once. Factories and instances
/// are cached per registration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum CacheSlot {
    Implementation(ServiceKey),
    Descriptor(usize),
}

/// A single registration: the contract key, how to build it, and how long
/// the instance lives.
///
/// Descriptors are validated when they are created and are immutable
/// afterwards.
///
/// # Examples
///
/// ```rust
/// use keyed_di::{ServiceDescriptor, ServiceKey, Lifetime, Resolver};
///
/// let port = ServiceDescriptor::from_instance(ServiceKey::of::<u16>(), 8080u16).unwrap();
/// assert_eq!(port.lifetime(), Lifetime::Singleton);
///
/// let clock = ServiceDescriptor::from_factory(
///     ServiceKey::named("clock"),
///     Lifetime::Transient,
///     |_| Ok(std::time::Instant::now()),
/// ).unwrap();
/// assert!(clock.metadata().is_none());
///
/// let ambiguous = ServiceDescriptor::builder(ServiceKey::of::<u16>())
///     .instance(1u16)
///     .factory(|_| Ok(2u16))
///     .build();
/// assert!(ambiguous.is_err());
/// ```
#[derive(Clone)]
pub struct ServiceDescriptor {
    service_type: ServiceKey,
    strategy: Strategy,
    lifetime: Lifetime,
}

impl ServiceDescriptor {
    /// Registers `I` for `service_type`, constructed from its metadata.
    ///
    /// `service_type` must be `I` itself, one of the contracts `I`
    /// provides, or an implementation key of one of those.
    pub fn from_type<I: Injectable>(service_type: ServiceKey, lifetime: Lifetime) -> DiResult<Self> {
        Self::from_metadata::<I>(service_type, lifetime, I::metadata())
    }

    fn from_metadata<I: Injectable>(
        service_type: ServiceKey,
        lifetime: Lifetime,
        metadata: ServiceMetadata,
    ) -> DiResult<Self> {
        service_type.validate()?;
        metadata.validate()?;

        let implementation = metadata.implementation();
        let satisfies = |key: &ServiceKey| key == implementation || metadata.provides_key(key);
        let accepted = match &service_type {
            ServiceKey::Implementation(pair) => &pair.0 == implementation && satisfies(&pair.1),
            other => satisfies(other),
        };
        if !accepted {
            return Err(DiError::Registration(format!(
                "{} does not provide {}",
                implementation, service_type
            )));
        }

        let construct: ConstructFn =
            Arc::new(|deps: Dependencies| Ok(Arc::new(I::construct(deps)?) as AnyArc));
        Ok(Self {
            service_type,
            strategy: Strategy::Type { metadata, construct },
            lifetime,
        })
    }

    /// Expands `I` into one descriptor per provided contract.
    ///
    /// All descriptors share the lifetime declared in the metadata
    /// (transient when none is declared) and, for singletons and scoped
    /// services, a single cached instance.
    pub fn from_provides<I: Injectable>() -> DiResult<Vec<Self>> {
        let metadata = I::metadata();
        metadata.validate()?;
        let lifetime = metadata.lifetime().unwrap_or_default();
        metadata
            .provides()
            .map(|key| Self::from_metadata::<I>(key.clone(), lifetime, metadata.clone()))
            .collect()
    }

    /// Registers `I` as one of possibly many implementations of `contract`.
    pub fn implementation<I: Injectable>(contract: &ServiceKey, lifetime: Lifetime) -> DiResult<Self> {
        Self::from_type::<I>(ServiceKey::implementation(&key_of::<I>(), contract), lifetime)
    }

    /// Registers a fixed concrete instance as a singleton.
    pub fn from_instance<T: Send + Sync + 'static>(service_type: ServiceKey, value: T) -> DiResult<Self> {
        Self::from_any_instance(service_type, Arc::new(value))
    }

    /// Registers a fixed trait-object instance as a singleton.
    pub fn from_trait_instance<T: ?Sized + Send + Sync + 'static>(
        service_type: ServiceKey,
        value: Arc<T>,
    ) -> DiResult<Self> {
        Self::from_any_instance(service_type, Arc::new(value))
    }

    /// Registers an already type-erased singleton instance.
    pub fn from_any_instance(service_type: ServiceKey, instance: AnyArc) -> DiResult<Self> {
        service_type.validate()?;
        Ok(Self {
            service_type,
            strategy: Strategy::Instance(instance),
            lifetime: Lifetime::Singleton,
        })
    }

    /// Registers a fallible factory producing a concrete type.
    pub fn from_factory<T, F>(service_type: ServiceKey, lifetime: Lifetime, factory: F) -> DiResult<Self>
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext) -> DiResult<T> + Send + Sync + 'static,
    {
        Self::from_any_factory(service_type, lifetime, erase_factory(factory))
    }

    /// Registers a fallible factory producing a trait object.
    pub fn from_trait_factory<T, F>(service_type: ServiceKey, lifetime: Lifetime, factory: F) -> DiResult<Self>
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext) -> DiResult<Arc<T>> + Send + Sync + 'static,
    {
        Self::from_any_factory(service_type, lifetime, erase_trait_factory(factory))
    }

    /// Registers an already type-erased factory.
    pub fn from_any_factory(service_type: ServiceKey, lifetime: Lifetime, factory: FactoryFn) -> DiResult<Self> {
        service_type.validate()?;
        Ok(Self {
            service_type,
            strategy: Strategy::Factory(factory),
            lifetime,
        })
    }

    /// Starts a descriptor whose strategy is chosen explicitly.
    pub fn builder(service_type: ServiceKey) -> DescriptorBuilder {
        DescriptorBuilder {
            service_type,
            lifetime: Ok(None),
            strategies: Vec::new(),
        }
    }

    /// The contract key this descriptor is registered under.
    pub fn service_type(&self) -> &ServiceKey {
        &self.service_type
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    /// Metadata of the implementation type, for type-constructed descriptors.
    pub fn metadata(&self) -> Option<&ServiceMetadata> {
        match &self.strategy {
            Strategy::Type { metadata, .. } => Some(metadata),
            _ => None,
        }
    }

    /// True when this descriptor can answer a lookup for `key`.
    pub fn matches(&self, key: &ServiceKey) -> bool {
        &self.service_type == key || self.metadata().is_some_and(|m| m.provides_key(key))
    }

    /// True when this descriptor belongs to the collection of `contract`.
    pub fn contributes_to(&self, contract: &ServiceKey) -> bool {
        &self.service_type == contract || self.service_type.is_implementation_of(contract)
    }

    pub(crate) fn cache_slot(&self, index: usize) -> CacheSlot {
        match &self.strategy {
            Strategy::Type { metadata, .. } => CacheSlot::Implementation(metadata.implementation().clone()),
            _ => CacheSlot::Descriptor(index),
        }
    }

    /// Converts a raw instance into the representation expected for `requested`.
    pub(crate) fn project(&self, requested: &ServiceKey, raw: AnyArc) -> DiResult<AnyArc> {
        match &self.strategy {
            Strategy::Type { metadata, .. } => metadata.project(requested, raw),
            _ => Ok(raw),
        }
    }
}

impl fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("service_type", &self.service_type)
            .field("strategy", &self.strategy.name())
            .field("lifetime", &self.lifetime)
            .field("metadata", &self.metadata())
            .finish()
    }
}

/// Builder used when the strategy is selected at runtime.
///
/// Exactly one of [`implementation_type`](Self::implementation_type),
/// [`factory`](Self::factory) or [`instance`](Self::instance) must be set.
pub struct DescriptorBuilder {
    service_type: ServiceKey,
    lifetime: DiResult<Option<Lifetime>>,
    strategies: Vec<PendingStrategy>,
}

enum PendingStrategy {
    Type(Box<dyn FnOnce(ServiceKey, Lifetime) -> DiResult<ServiceDescriptor>>),
    Factory(FactoryFn),
    Instance(AnyArc),
}

impl DescriptorBuilder {
    pub fn lifetime(mut self, lifetime: Lifetime) -> Self {
        self.lifetime = Ok(Some(lifetime));
        self
    }

    /// Lifetime given by name, e.g. from configuration.
    pub fn lifetime_named(mut self, name: &str) -> Self {
        self.lifetime = name.parse::<Lifetime>().map(Some);
        self
    }

    pub fn implementation_type<I: Injectable>(mut self) -> Self {
        self.strategies.push(PendingStrategy::Type(Box::new(|key, lifetime| {
            ServiceDescriptor::from_type::<I>(key, lifetime)
        })));
        self
    }

    pub fn factory<T, F>(mut self, factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext) -> DiResult<T> + Send + Sync + 'static,
    {
        self.strategies.push(PendingStrategy::Factory(erase_factory(factory)));
        self
    }

    pub fn instance<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.strategies.push(PendingStrategy::Instance(Arc::new(value)));
        self
    }

    pub fn build(mut self) -> DiResult<ServiceDescriptor> {
        let explicit = self.lifetime?;
        if self.strategies.len() > 1 {
            return Err(DiError::Registration(format!(
                "ambiguous implementation strategy for {}: {} strategies given",
                self.service_type,
                self.strategies.len()
            )));
        }
        let strategy = self.strategies.pop().ok_or_else(|| {
            DiError::Registration(format!("no implementation strategy for {}", self.service_type))
        })?;

        match strategy {
            PendingStrategy::Type(build) => {
                let lifetime = explicit.unwrap_or_default();
                build(self.service_type, lifetime)
            }
            PendingStrategy::Factory(factory) => ServiceDescriptor::from_any_factory(
                self.service_type,
                explicit.unwrap_or_default(),
                factory,
            ),
            PendingStrategy::Instance(instance) => match explicit {
                None | Some(Lifetime::Singleton) => {
                    ServiceDescriptor::from_any_instance(self.service_type, instance)
                }
                Some(other) => Err(DiError::Registration(format!(
                    "instance registration for {} must be singleton, not {}",
                    self.service_type, other
                ))),
            },
        }
    }
}

pub(crate) fn erase_factory<T, F>(factory: F) -> FactoryFn
where
    T: Send + Sync + 'static,
    F: Fn(&ResolverContext) -> DiResult<T> + Send + Sync + 'static,
{
    Arc::new(move |r: &ResolverContext| -> DiResult<AnyArc> { Ok(Arc::new(factory(r)?)) })
}

pub(crate) fn erase_trait_factory<T, F>(factory: F) -> FactoryFn
where
    T: ?Sized + Send + Sync + 'static,
    F: Fn(&ResolverContext) -> DiResult<Arc<T>> + Send + Sync + 'static,
{
    // Trait objects are stored as Arc<Arc<dyn Trait>> inside the Any
    Arc::new(move |r: &ResolverContext| -> DiResult<AnyArc> { Ok(Arc::new(factory(r)?)) })
}
