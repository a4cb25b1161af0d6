//! Service key types for the dependency injection container.

use std::any::TypeId;
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::{DiError, DiResult};

/// Marker contract used to build "collection of T" keys.
///
/// Resolving `ServiceKey::collection_of(&t)` yields every registration that
/// satisfies `t`, in registration order.
pub struct Enumerable;

/// Key for service storage and lookup.
///
/// A key stands for a contract: a concrete type, a trait object, or a
/// string-named capability. Keys for families of related services are built
/// by composing two existing keys with [`ServiceKey::derive`], which is pure
/// and injective, so the same pair always produces the same key and
/// different pairs never collide.
///
/// # Examples
///
/// ```rust
/// use keyed_di::ServiceKey;
///
/// trait Logger: Send + Sync {}
/// struct Billing;
///
/// let logger = ServiceKey::of::<dyn Logger>();
/// let billing = ServiceKey::of::<Billing>();
///
/// // "logger of Billing"
/// let a = ServiceKey::derive(&logger, &billing);
/// let b = ServiceKey::derive(&logger, &billing);
/// assert_eq!(a, b);
/// assert_ne!(a, ServiceKey::derive(&billing, &logger));
/// ```
#[derive(Debug, Clone)]
pub enum ServiceKey {
    /// Concrete type or trait object, identified by `TypeId`.
    ///
    /// The name is kept for diagnostics only and never takes part in
    /// comparisons.
    Type(TypeId, &'static str),
    /// String-named contract.
    Named(Cow<'static, str>),
    /// Parametrized contract: `(generic, parameter)`.
    Derived(Arc<(ServiceKey, ServiceKey)>),
    /// "This implementation satisfies this contract": `(implementation, contract)`.
    ///
    /// Used for multi-binding registrations.
    Implementation(Arc<(ServiceKey, ServiceKey)>),
}

impl ServiceKey {
    /// Key for a type or trait object.
    #[inline(always)]
    pub fn of<T: ?Sized + 'static>() -> Self {
        ServiceKey::Type(TypeId::of::<T>(), std::any::type_name::<T>())
    }

    /// Key for a string-named contract.
    ///
    /// `&'static str` names can also be used in constants:
    /// `const CLOCK: ServiceKey = ServiceKey::Named(Cow::Borrowed("clock"));`
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        ServiceKey::Named(name.into())
    }

    /// Derives the key of `generic` specialized for `param`.
    pub fn derive(generic: &ServiceKey, param: &ServiceKey) -> Self {
        ServiceKey::Derived(Arc::new((generic.clone(), param.clone())))
    }

    /// Derives the key stating that `implementation` satisfies `contract`.
    pub fn implementation(implementation: &ServiceKey, contract: &ServiceKey) -> Self {
        ServiceKey::Implementation(Arc::new((implementation.clone(), contract.clone())))
    }

    /// Key resolving every registration of `contract`.
    pub fn collection_of(contract: &ServiceKey) -> Self {
        Self::derive(&Self::of::<Enumerable>(), contract)
    }

    /// Returns the element contract if this is a "collection of T" key.
    pub fn as_collection(&self) -> Option<&ServiceKey> {
        match self {
            ServiceKey::Derived(pair) if pair.0 == Self::of::<Enumerable>() => Some(&pair.1),
            _ => None,
        }
    }

    /// The contract this key resolves to.
    ///
    /// For implementation keys this is the contract half; every other key is
    /// its own contract.
    pub fn contract(&self) -> &ServiceKey {
        match self {
            ServiceKey::Implementation(pair) => &pair.1,
            other => other,
        }
    }

    /// True when this key is `implementation(_, contract)`.
    pub fn is_implementation_of(&self, contract: &ServiceKey) -> bool {
        matches!(self, ServiceKey::Implementation(pair) if &pair.1 == contract)
    }

    /// Checks that the key can be used for registration.
    pub fn validate(&self) -> DiResult<()> {
        match self {
            ServiceKey::Type(_, _) => Ok(()),
            ServiceKey::Named(name) if name.trim().is_empty() => Err(DiError::Registration(
                "service key names must not be empty".to_string(),
            )),
            ServiceKey::Named(_) => Ok(()),
            ServiceKey::Derived(pair) | ServiceKey::Implementation(pair) => {
                pair.0.validate()?;
                pair.1.validate()
            }
        }
    }

    /// Human readable name used in errors and traces.
    pub fn display_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceKey::Type(_, name) => f.write_str(name),
            ServiceKey::Named(name) => write!(f, "\"{}\"", name),
            ServiceKey::Derived(pair) => write!(f, "{}<{}>", pair.0, pair.1),
            ServiceKey::Implementation(pair) => write!(f, "{} as {}", pair.0, pair.1),
        }
    }
}

impl PartialEq for ServiceKey {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            // Hot path: TypeId comparison only
            (ServiceKey::Type(a, _), ServiceKey::Type(b, _)) => a == b,
            (ServiceKey::Named(a), ServiceKey::Named(b)) => a == b,
            (ServiceKey::Derived(a), ServiceKey::Derived(b)) => Arc::ptr_eq(a, b) || a == b,
            (ServiceKey::Implementation(a), ServiceKey::Implementation(b)) => {
                Arc::ptr_eq(a, b) || a == b
            }
            _ => false,
        }
    }
}

impl Eq for ServiceKey {}

impl Hash for ServiceKey {
    #[inline(always)]
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            ServiceKey::Type(id, _) => {
                0u8.hash(state);
                id.hash(state);
            }
            ServiceKey::Named(name) => {
                1u8.hash(state);
                name.hash(state);
            }
            ServiceKey::Derived(pair) => {
                2u8.hash(state);
                pair.0.hash(state);
                pair.1.hash(state);
            }
            ServiceKey::Implementation(pair) => {
                3u8.hash(state);
                pair.0.hash(state);
                pair.1.hash(state);
            }
        }
    }
}

/// Helper for creating type keys.
#[inline(always)]
pub fn key_of<T: ?Sized + 'static>() -> ServiceKey {
    ServiceKey::of::<T>()
}
