//! Typed options materialized from configuration.
//!
//! Options for a type `T` are registered with
//! [`ServiceCollection::add_options`] and resolved as `Options<T>`. Named
//! options use a derived key, so several configurations of the same type can
//! coexist:
//!
//! ```
//! use keyed_di::{ServiceCollection, ConfigurationBuilder, MemorySource, Options, Resolver};
//! use serde::Deserialize;
//!
//! #[derive(Default, Deserialize)]
//! struct Database {
//!     url: String,
//! }
//!
//! let config = ConfigurationBuilder::new()
//!     .add_source(MemorySource::new()
//!         .set("db:primary:url", "postgres://primary")
//!         .set("db:replica:url", "postgres://replica"))
//!     .build()
//!     .unwrap();
//!
//! let mut services = ServiceCollection::new();
//! services.add_singleton(config).unwrap();
//! services.add_options::<Database>().named("primary").bind("db:primary").register().unwrap();
//! services.add_options::<Database>().named("replica").bind("db:replica").register().unwrap();
//!
//! let provider = services.build();
//! let replica = provider
//!     .get_by_key::<Options<Database>>(&Options::<Database>::named_key("replica"))
//!     .unwrap();
//! assert_eq!(replica.url, "postgres://replica");
//! ```

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::collection::ServiceCollection;
use crate::configuration::Configuration;
use crate::descriptors::ServiceDescriptor;
use crate::error::{DiError, DiResult};
use crate::key::{key_of, ServiceKey};
use crate::lifetime::Lifetime;
use crate::provider::ResolverContext;
use crate::traits::Resolver;

type Loader<T> = Arc<dyn Fn(&Configuration) -> DiResult<T> + Send + Sync>;
type Configure<T> = Arc<dyn Fn(&mut T) + Send + Sync>;
type Validator<T> = Arc<dyn Fn(&T) -> Result<(), String> + Send + Sync>;

/// A materialized options value.
pub struct Options<T> {
    value: T,
    name: Option<String>,
}

impl<T: Send + Sync + 'static> Options<T> {
    /// Key of the unnamed options of `T`.
    pub fn key() -> ServiceKey {
        key_of::<Options<T>>()
    }

    /// Key of the options of `T` registered under `name`.
    pub fn named_key(name: impl Into<String>) -> ServiceKey {
        ServiceKey::derive(&Self::key(), &ServiceKey::named(name.into()))
    }
}

impl<T> Options<T> {
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Name given at registration, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl<T> Deref for Options<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: fmt::Debug> fmt::Debug for Options<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("name", &self.name)
            .field("value", &self.value)
            .finish()
    }
}

/// Fluent registration of `Options<T>`.
///
/// The value starts from configuration when [`bind`](Self::bind) is used
/// and from `T::default()` otherwise, then every `configure` step runs in
/// order, then every validator. It is built once, on first resolution.
#[must_use = "options are only registered by calling register()"]
pub struct OptionsBuilder<'a, T> {
    services: &'a mut ServiceCollection,
    name: Option<String>,
    loader: Option<Loader<T>>,
    configure: Vec<Configure<T>>,
    validators: Vec<Validator<T>>,
}

impl<'a, T> OptionsBuilder<'a, T>
where
    T: Default + Send + Sync + 'static,
{
    /// Registers the options under `name` instead of the unnamed key.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Mutates the value after it is loaded.
    pub fn configure<F>(mut self, configure: F) -> Self
    where
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        self.configure.push(Arc::new(configure));
        self
    }

    /// Rejects values for which `validate` returns an error message.
    pub fn validate<F>(mut self, validate: F) -> Self
    where
        F: Fn(&T) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validators.push(Arc::new(validate));
        self
    }

    /// Adds the singleton `Options<T>` registration.
    pub fn register(self) -> DiResult<()> {
        let key = match &self.name {
            Some(name) => Options::<T>::named_key(name.clone()),
            None => Options::<T>::key(),
        };
        let label = match &self.name {
            Some(name) => format!("{} \"{}\"", std::any::type_name::<T>(), name),
            None => std::any::type_name::<T>().to_string(),
        };
        let name = self.name;
        let loader = self.loader;
        let configure = self.configure;
        let validators = self.validators;

        let descriptor = ServiceDescriptor::from_factory(
            key,
            Lifetime::Singleton,
            move |resolver: &ResolverContext| -> DiResult<Options<T>> {
                let mut value = match &loader {
                    Some(load) => load(&*resolver.get::<Configuration>()?)?,
                    None => T::default(),
                };
                for step in &configure {
                    step(&mut value);
                }
                for validator in &validators {
                    validator(&value).map_err(|message| DiError::OptionsValidation {
                        options: label.clone(),
                        message,
                    })?;
                }
                tracing::debug!(options = %label, "options materialized");
                Ok(Options {
                    value,
                    name: name.clone(),
                })
            },
        )?;
        self.services.add(descriptor)?;
        Ok(())
    }
}

impl<'a, T> OptionsBuilder<'a, T>
where
    T: Default + DeserializeOwned + Send + Sync + 'static,
{
    /// Loads the value from the configuration section at `path`.
    ///
    /// The [`Configuration`] is resolved from the container when the options
    /// are first requested.
    pub fn bind(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.loader = Some(Arc::new(move |config: &Configuration| config.bind::<T>(&path)));
        self
    }
}

impl ServiceCollection {
    /// Starts registering `Options<T>`.
    pub fn add_options<T>(&mut self) -> OptionsBuilder<'_, T>
    where
        T: Default + Send + Sync + 'static,
    {
        OptionsBuilder {
            services: self,
            name: None,
            loader: None,
            configure: Vec::new(),
            validators: Vec::new(),
        }
    }
}
