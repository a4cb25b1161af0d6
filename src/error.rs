//! Error types for the dependency injection container.

use std::fmt;

/// Dependency injection errors
///
/// Registration problems are reported when a descriptor is built or added;
/// resolution problems are reported by `get`. Errors raised while resolving a
/// nested dependency are returned unchanged, so they always name the contract
/// that was actually missing.
///
/// # Examples
///
/// ```rust
/// use keyed_di::{DiError, ServiceCollection, Resolver};
///
/// let provider = ServiceCollection::new().build();
/// match provider.get::<String>() {
///     Err(DiError::NotRegistered(name)) => assert_eq!(name, "alloc::string::String"),
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum DiError {
    /// Malformed descriptor or metadata, detected at registration time
    Registration(String),
    /// Mutation attempted after the collection was sealed
    SealedCollection,
    /// No descriptor satisfies the requested contract
    NotRegistered(String),
    /// Scoped service requested from the root provider
    ScopedOutsideScope(String),
    /// Lifetime name outside of singleton/scoped/transient
    UnknownLifetime(String),
    /// Resolved instance could not be viewed as the requested type
    TypeMismatch(String),
    /// A constructor asked its dependency bag for a name its metadata never declared
    UndeclaredDependency(&'static str),
    /// Circular dependency detected (includes path)
    Circular(Vec<String>),
    /// Maximum recursion depth exceeded
    DepthExceeded(usize),
    /// Configuration value missing or not convertible
    Configuration(String),
    /// Options validation rejected the materialized value
    OptionsValidation {
        /// Options type or name
        options: String,
        /// Validator message
        message: String,
    },
}

impl fmt::Display for DiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiError::Registration(msg) => write!(f, "Invalid registration: {}", msg),
            DiError::SealedCollection => {
                write!(f, "Service collection is sealed and can no longer be modified")
            }
            DiError::NotRegistered(name) => write!(f, "Service not registered: {}", name),
            DiError::ScopedOutsideScope(name) => write!(
                f,
                "Scoped service {} cannot be resolved from the root provider; create a scope first",
                name
            ),
            DiError::UnknownLifetime(value) => write!(f, "Unknown lifetime: {}", value),
            DiError::TypeMismatch(name) => write!(f, "Type mismatch for: {}", name),
            DiError::UndeclaredDependency(name) => {
                write!(f, "Dependency '{}' is not declared in the service metadata", name)
            }
            DiError::Circular(path) => write!(f, "Circular dependency: {}", path.join(" -> ")),
            DiError::DepthExceeded(depth) => write!(f, "Max depth {} exceeded", depth),
            DiError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            DiError::OptionsValidation { options, message } => {
                write!(f, "Options {} failed validation: {}", options, message)
            }
        }
    }
}

impl std::error::Error for DiError {}

/// Result type for DI operations
pub type DiResult<T> = Result<T, DiError>;
