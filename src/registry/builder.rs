// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fmt;
use std::panic;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::Error;
use crate::SinkRegistry;
use crate::Trap;
use crate::registry::global;
use crate::registry::hook;
use crate::sink;
use crate::sink::ConsoleSink;
use crate::sink::FallbackSink;
use crate::sink::Sink;
use crate::trap::DefaultTrap;

/// A hook that discovers one externally provided sink.
///
/// Returning `Ok(None)` means nothing was found. Errors and panics are reported to the registry's
/// [`Trap`] and treated as nothing found.
pub type SinkProvider = Box<dyn FnOnce() -> Result<Option<Box<dyn Sink>>, Error> + Send>;

/// A builder for configuring a [`SinkRegistry`].
///
/// Sinks end up in this order:
///
/// 1. a [`ConsoleSink`], if [`force_console`](RegistryBuilder::force_console) is on (the default);
/// 2. the sink returned by the [`provider`](RegistryBuilder::provider), unless it is a
///    [`ConsoleSink`];
/// 3. every sink added with [`sink`](RegistryBuilder::sink), in order;
/// 4. a [`FallbackSink`], only if none of the above produced a sink.
///
/// # Examples
///
/// ```
/// use logsink::SinkRegistry;
/// use logsink::sink::FallbackSink;
///
/// let registry = SinkRegistry::builder()
///     .force_console(true)
///     .sink(FallbackSink::default())
///     .build();
/// assert_eq!(registry.len(), 2);
/// ```
#[must_use = "call `build` to construct a registry or `apply` to set the global registry"]
pub struct RegistryBuilder {
    force_console: bool,
    provider: Option<SinkProvider>,
    sinks: Vec<Box<dyn Sink>>,
    trap: Box<dyn Trap>,
    capture_panics: bool,
}

impl fmt::Debug for RegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryBuilder")
            .field("force_console", &self.force_console)
            .field("provider", &self.provider.is_some())
            .field("sinks", &self.sinks)
            .field("trap", &self.trap)
            .field("capture_panics", &self.capture_panics)
            .finish()
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryBuilder {
    /// Create a new [`RegistryBuilder`] that forces console output and captures no panics.
    pub fn new() -> Self {
        Self {
            force_console: true,
            provider: None,
            sinks: vec![],
            trap: Box::new(DefaultTrap::default()),
            capture_panics: false,
        }
    }

    /// Whether a [`ConsoleSink`] is always added first. Default to `true`.
    pub fn force_console(mut self, force_console: bool) -> Self {
        self.force_console = force_console;
        self
    }

    /// Set the hook that discovers an externally provided sink.
    ///
    /// # Examples
    ///
    /// ```
    /// use logsink::SinkRegistry;
    /// use logsink::sink::FallbackSink;
    /// use logsink::sink::Sink;
    ///
    /// let registry = SinkRegistry::builder()
    ///     .force_console(false)
    ///     .provider(|| Ok(Some(Box::new(FallbackSink::default()) as Box<dyn Sink>)))
    ///     .build();
    /// assert_eq!(registry.len(), 1);
    /// ```
    pub fn provider<F>(mut self, provider: F) -> Self
    where
        F: FnOnce() -> Result<Option<Box<dyn Sink>>, Error> + Send + 'static,
    {
        self.provider = Some(Box::new(provider));
        self
    }

    /// Register a sink explicitly.
    pub fn sink(mut self, sink: impl Into<Box<dyn Sink>>) -> Self {
        self.sinks.push(sink.into());
        self
    }

    /// Set the trap for discovery failures. Default to [`DefaultTrap`].
    pub fn trap(mut self, trap: impl Into<Box<dyn Trap>>) -> Self {
        self.trap = trap.into();
        self
    }

    /// Whether to log panics through the registry once it is installed as the global registry.
    ///
    /// Panics that are caught later are logged too, and each report pauses the panicking thread
    /// for 100 ms. See [`global`](crate::registry::global).
    ///
    /// Has no effect on registries that are only [built](RegistryBuilder::build).
    pub fn capture_panics(mut self, capture_panics: bool) -> Self {
        self.capture_panics = capture_panics;
        self
    }

    /// Build the [`SinkRegistry`].
    pub fn build(self) -> SinkRegistry {
        self.build_parts().0
    }

    pub(crate) fn build_parts(self) -> (SinkRegistry, bool) {
        let Self {
            force_console,
            provider,
            sinks: registered,
            trap,
            capture_panics,
        } = self;

        let mut sinks: Vec<Box<dyn Sink>> = vec![];
        if force_console {
            sinks.push(Box::new(ConsoleSink::default()));
        }

        if let Some(discovered) = provider.and_then(|provider| discover(provider, trap.as_ref())) {
            if !sink::is_console(discovered.as_ref()) {
                sinks.push(discovered);
            }
        }

        sinks.extend(registered);

        if sinks.is_empty() {
            sinks.push(Box::new(FallbackSink::default()));
        }

        (SinkRegistry::new(sinks), capture_panics)
    }

    /// Build the registry and install it as the global registry.
    ///
    /// # Errors
    ///
    /// Return an error if the global registry has already been initialized, either by an earlier
    /// call or lazily by the first emitted record.
    ///
    /// # Examples
    ///
    /// ```
    /// if let Err(err) = logsink::SinkRegistry::builder().try_apply() {
    ///     eprintln!("failed to set up the global registry: {err}");
    /// }
    /// ```
    pub fn try_apply(self) -> Result<(), Error> {
        let (registry, capture_panics) = self.build_parts();
        let registry = Arc::new(registry);
        global::install(registry.clone())?;
        if capture_panics {
            hook::install(registry);
        }
        Ok(())
    }

    /// Build the registry and install it as the global registry.
    ///
    /// # Panics
    ///
    /// Panic if the global registry has already been initialized.
    ///
    /// # Examples
    ///
    /// ```
    /// logsink::SinkRegistry::builder().apply();
    /// ```
    pub fn apply(self) {
        self.try_apply()
            .expect("RegistryBuilder::apply must be called before the global registry initialized");
    }
}

fn discover(provider: SinkProvider, trap: &dyn Trap) -> Option<Box<dyn Sink>> {
    match panic::catch_unwind(AssertUnwindSafe(provider)) {
        Ok(Ok(sink)) => sink,
        Ok(Err(err)) => {
            trap.trap(&Error::new("failed to discover sink").with_source(err));
            None
        }
        Err(payload) => {
            let err = Error::new("sink provider panicked")
                .with_context("panic", hook::panic_message(payload.as_ref()));
            trap.trap(&err);
            None
        }
    }
}
