//! Diagnostic observers for resolution events.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{DiError, DiResult};
use crate::key::ServiceKey;

/// Hooks invoked around every resolution, including nested ones.
///
/// Calls are made synchronously on the resolving thread, so keep
/// implementations cheap.
///
/// # Examples
///
/// ```
/// use keyed_di::{DiObserver, DiError, ServiceCollection, ServiceKey, Resolver};
/// use std::sync::{Arc, Mutex};
/// use std::time::Duration;
///
/// #[derive(Default)]
/// struct Recorder(Mutex<Vec<String>>);
///
/// impl DiObserver for Recorder {
///     fn resolving(&self, key: &ServiceKey) {
///         self.0.lock().unwrap().push(format!("-> {}", key));
///     }
///     fn resolved(&self, key: &ServiceKey, _duration: Duration) {
///         self.0.lock().unwrap().push(format!("<- {}", key));
///     }
///     fn failed(&self, key: &ServiceKey, _error: &DiError) {
///         self.0.lock().unwrap().push(format!("!! {}", key));
///     }
/// }
///
/// let recorder = Arc::new(Recorder::default());
/// let mut services = ServiceCollection::new();
/// services.add_observer(recorder.clone()).unwrap();
/// services.add_singleton(7u8).unwrap();
///
/// let provider = services.build();
/// provider.get_required::<u8>();
/// assert!(provider.get::<u16>().is_err());
/// assert_eq!(*recorder.0.lock().unwrap(), ["-> u8", "<- u8", "-> u16", "!! u16"]);
/// ```
pub trait DiObserver: Send + Sync {
    /// Called before a key is resolved.
    fn resolving(&self, key: &ServiceKey);

    /// Called after a key resolved successfully.
    fn resolved(&self, key: &ServiceKey, duration: Duration);

    /// Called when resolving a key failed.
    fn failed(&self, key: &ServiceKey, error: &DiError);
}

/// Forwards resolution events to `tracing`.
///
/// Successful resolutions are emitted at `TRACE`, failures at `DEBUG`; the
/// caller still receives the error.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl TracingObserver {
    pub fn new() -> Self {
        Self
    }
}

impl DiObserver for TracingObserver {
    fn resolving(&self, key: &ServiceKey) {
        tracing::trace!(service = %key, "resolving");
    }

    fn resolved(&self, key: &ServiceKey, duration: Duration) {
        tracing::trace!(service = %key, elapsed_us = duration.as_micros() as u64, "resolved");
    }

    fn failed(&self, key: &ServiceKey, error: &DiError) {
        tracing::debug!(service = %key, %error, "resolution failed");
    }
}

/// Registered observers, shared by the provider and its scopes.
#[derive(Default, Clone)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn DiObserver>>,
}

impl Observers {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&mut self, observer: Arc<dyn DiObserver>) {
        self.observers.push(observer);
    }

    #[inline(always)]
    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.len()
    }

    /// Runs `resolve` bracketed by observer notifications.
    #[inline]
    pub(crate) fn observe<T, F>(&self, key: &ServiceKey, resolve: F) -> DiResult<T>
    where
        F: FnOnce() -> DiResult<T>,
    {
        if !self.has_observers() {
            return resolve();
        }

        let start = Instant::now();
        for observer in &self.observers {
            observer.resolving(key);
        }
        let result = resolve();
        match &result {
            Ok(_) => {
                let duration = start.elapsed();
                for observer in &self.observers {
                    observer.resolved(key, duration);
                }
            }
            Err(error) => {
                for observer in &self.observers {
                    observer.failed(key, error);
                }
            }
        }
        result
    }
}
