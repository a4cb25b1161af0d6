//! # keyed-di
//!
//! Key-based dependency injection: services are registered against
//! [`ServiceKey`]s, constructed from declarative [`ServiceMetadata`] or from
//! factories, and resolved with singleton, scoped or transient lifetimes.
//!
//! ## Features
//!
//! - **Keyed contracts**: types, trait objects, string names and keys derived
//!   from other keys ("options of X", "collection of T")
//! - **Metadata-driven construction**: an implementation declares what it
//!   provides and which named dependencies it needs
//! - **Multi-binding**: one implementation can satisfy several contracts, and
//!   a contract can be resolved as the list of all its implementations
//! - **Scoped isolation** with disposal hooks on scope and provider
//! - **Circular dependency detection** with the full resolution path
//!
//! ## Quick Start
//!
//! ```rust
//! use keyed_di::{Dependencies, DiResult, Injectable, Lifetime, Resolver,
//!     ServiceCollection, ServiceMetadata};
//! use std::sync::Arc;
//!
//! struct ConfigService {
//!     env: String,
//! }
//!
//! struct Greeter {
//!     config: Arc<ConfigService>,
//! }
//!
//! impl Injectable for Greeter {
//!     fn metadata() -> ServiceMetadata {
//!         ServiceMetadata::builder::<Self>()
//!             .provides_self()
//!             .inject::<ConfigService>("config")
//!             .lifetime(Lifetime::Transient)
//!             .build()
//!     }
//!
//!     fn construct(deps: Dependencies) -> DiResult<Self> {
//!         Ok(Greeter { config: deps.get("config")? })
//!     }
//! }
//!
//! let mut services = ServiceCollection::new();
//! services.add_singleton(ConfigService { env: "prod".to_string() }).unwrap();
//! services.add_provides::<Greeter>().unwrap();
//!
//! let provider = services.build();
//! let first = provider.get_required::<Greeter>();
//! let second = provider.get_required::<Greeter>();
//!
//! assert_eq!(first.config.env, "prod");
//! assert!(!Arc::ptr_eq(&first, &second));
//! assert!(Arc::ptr_eq(&first.config, &second.config));
//! ```
//!
//! ## Service Lifetimes
//!
//! - **Singleton**: created once per provider and shared by every scope
//! - **Scoped**: created once per scope; resolving it from the root fails
//! - **Transient**: created fresh on every resolution
//!
//! ## Trait Resolution
//!
//! ```rust
//! use keyed_di::{ServiceCollection, Resolver};
//! use std::sync::Arc;
//!
//! trait Logger: Send + Sync {
//!     fn log(&self, message: &str);
//! }
//!
//! struct ConsoleLogger;
//! impl Logger for ConsoleLogger {
//!     fn log(&self, message: &str) {
//!         println!("[LOG] {}", message);
//!     }
//! }
//!
//! let mut services = ServiceCollection::new();
//! services.add_singleton_trait::<dyn Logger>(Arc::new(ConsoleLogger)).unwrap();
//!
//! let provider = services.build();
//! let logger = provider.get_required_trait::<dyn Logger>();
//! logger.log("Hello, World!");
//! ```
//!
//! ## Scoped Services
//!
//! ```rust
//! use keyed_di::{ServiceCollection, Resolver, DiError};
//! use std::sync::Arc;
//!
//! struct RequestId(u64);
//!
//! let mut services = ServiceCollection::new();
//! services.add_scoped_factory::<RequestId, _>(|_| RequestId(7)).unwrap();
//!
//! let provider = services.build();
//! assert!(matches!(provider.get::<RequestId>(), Err(DiError::ScopedOutsideScope(_))));
//!
//! let scope1 = provider.create_scope();
//! let scope2 = provider.create_scope();
//! let req1 = scope1.get_required::<RequestId>();
//! let req2 = scope2.get_required::<RequestId>();
//! assert!(!Arc::ptr_eq(&req1, &req2));
//! ```

pub mod collection;
pub mod configuration;
pub mod descriptors;
pub mod error;
pub mod hosting;
pub mod key;
pub mod lifetime;
pub mod metadata;
pub mod observer;
pub mod options;
pub mod provider;
pub mod traits;

mod internal;

pub use collection::{ServiceCollection, ServiceModule};
pub use configuration::{
    ConfigSource, Configuration, ConfigurationBuilder, EnvironmentSource, JsonSource, MemorySource,
};
pub use descriptors::{DescriptorBuilder, FactoryFn, ServiceDescriptor, Strategy};
pub use error::{DiError, DiResult};
pub use hosting::{Host, HostBuilder};
pub use internal::cast::AnyArc;
pub use internal::BoxFutureUnit;
pub use key::{key_of, Enumerable, ServiceKey};
pub use lifetime::Lifetime;
pub use metadata::{Capability, Dependencies, Injectable, MetadataBuilder, ServiceMetadata};
pub use observer::{DiObserver, TracingObserver};
pub use options::{Options, OptionsBuilder};
pub use provider::{ResolverContext, ServiceProvider, ServiceScope};
pub use traits::{AsyncDispose, Dispose, Resolver, ResolverCore};
