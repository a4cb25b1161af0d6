//! Application host: configuration, registration and startup in one place.
//!
//! ```
//! use keyed_di::{HostBuilder, MemorySource, Configuration, Resolver, ServiceCollection, DiResult};
//!
//! struct App {
//!     env: String,
//! }
//!
//! let host = HostBuilder::new()
//!     .add_config_source(MemorySource::new().set("env", "prod"))
//!     .configure_services(|services: &mut ServiceCollection| -> DiResult<()> {
//!         services.add_singleton_factory::<App, _>(|r| App {
//!             env: r.get_required::<Configuration>().get_as("env").unwrap_or_default(),
//!         })?;
//!         Ok(())
//!     })
//!     .unwrap()
//!     .build::<App>()
//!     .unwrap();
//!
//! assert_eq!(host.app().env, "prod");
//! ```

use std::sync::Arc;

use crate::collection::{ServiceCollection, ServiceModule};
use crate::configuration::{ConfigSource, Configuration, ConfigurationBuilder};
use crate::error::DiResult;
use crate::provider::{ServiceProvider, ServiceScope};
use crate::traits::Resolver;

/// Collects configuration sources and registrations, then starts the app.
#[derive(Default)]
pub struct HostBuilder {
    services: ServiceCollection,
    sources: ConfigurationBuilder,
    configuration: Option<Configuration>,
}

impl HostBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a configuration source; later sources win.
    pub fn add_config_source<S: ConfigSource + 'static>(mut self, source: S) -> Self {
        self.sources = self.sources.add_source(source);
        self
    }

    /// Uses an already built configuration instead of the collected sources.
    pub fn with_configuration(mut self, configuration: Configuration) -> Self {
        self.configuration = Some(configuration);
        self
    }

    /// Runs a registration step against the host's collection.
    pub fn configure_services<M: ServiceModule>(mut self, module: M) -> DiResult<Self> {
        self.services.add_module(module)?;
        Ok(self)
    }

    /// Registers the configuration, seals the collection and resolves `App`
    /// exactly once.
    pub fn build<App: Send + Sync + 'static>(self) -> DiResult<Host<App>> {
        let HostBuilder {
            mut services,
            sources,
            configuration,
        } = self;

        let configuration = match configuration {
            Some(configuration) => configuration,
            None => sources.build()?,
        };
        services.add_singleton(configuration)?;

        let provider = services.build();
        let app = provider.get::<App>()?;
        tracing::debug!(app = std::any::type_name::<App>(), "host started");
        Ok(Host { app, provider })
    }
}

/// A started application and the container it was resolved from.
pub struct Host<App> {
    app: Arc<App>,
    provider: ServiceProvider,
}

impl<App> Host<App> {
    /// The application object resolved at startup.
    pub fn app(&self) -> &Arc<App> {
        &self.app
    }

    /// The root provider.
    pub fn services(&self) -> &ServiceProvider {
        &self.provider
    }

    /// Starts a unit of work.
    pub fn create_scope(&self) -> ServiceScope {
        self.provider.create_scope()
    }

    /// Runs every disposal hook of the root provider.
    pub async fn shutdown(self) {
        tracing::debug!(app = std::any::type_name::<App>(), "host shutting down");
        self.provider.dispose_all().await;
    }
}
