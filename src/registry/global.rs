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

use std::mem;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::OnceLock;
use std::sync::PoisonError;

use crate::Error;
use crate::SinkRegistry;
use crate::Trap;
use crate::registry::RegistryBuilder;
use crate::registry::hook;
use crate::sink::Sink;
use crate::trap::DefaultTrap;

static REGISTRY: OnceLock<Arc<SinkRegistry>> = OnceLock::new();

static PENDING: Mutex<Pending> = Mutex::new(Pending::Empty);

#[derive(Debug)]
enum Pending {
    Empty,
    Configured(RegistryBuilder),
    Built,
}

impl Pending {
    fn take_builder(&mut self) -> RegistryBuilder {
        match mem::replace(self, Pending::Built) {
            Pending::Configured(builder) => builder,
            Pending::Empty | Pending::Built => RegistryBuilder::new(),
        }
    }
}

/// Return the process-wide registry, building it on first use.
///
/// The first call consumes the configuration given to [`set_force_console`], [`register_sink`]
/// and [`set_sink_provider`], builds the registry exactly once even when racing with other
/// threads, and installs a panic hook that logs unhandled panics through it.
///
/// The hook runs for every panic, including panics later caught with
/// [`catch_unwind`](std::panic::catch_unwind), such as a panicking sink provider in a later
/// [`RegistryBuilder::build`] or a wrapped sink of an `AsyncSink`. Each one is logged as an
/// unhandled panic and flushed, then the panicking thread pauses for 100 ms before the previous
/// hook runs.
///
/// A sink provider must not log through the global registry; it runs while the registry is
/// being built.
pub fn global() -> &'static Arc<SinkRegistry> {
    REGISTRY.get_or_init(|| {
        let builder = pending().take_builder();
        let (registry, capture_panics) = builder.capture_panics(true).build_parts();
        let registry = Arc::new(registry);
        if capture_panics {
            hook::install(registry.clone());
        }
        registry
    })
}

/// Whether the global registry always includes a console sink. Default to `true`.
///
/// Has no effect once the global registry has been built.
pub fn set_force_console(force_console: bool) {
    configure("set_force_console", |builder| {
        builder.force_console(force_console)
    });
}

/// Add a sink to the global registry, after the console and discovered sinks.
///
/// Has no effect once the global registry has been built.
pub fn register_sink(sink: impl Into<Box<dyn Sink>>) {
    let sink = sink.into();
    configure("register_sink", |builder| builder.sink(sink));
}

/// Set the hook that discovers an externally provided sink for the global registry.
///
/// Has no effect once the global registry has been built.
pub fn set_sink_provider<F>(provider: F)
where
    F: FnOnce() -> Result<Option<Box<dyn Sink>>, Error> + Send + 'static,
{
    configure("set_sink_provider", |builder| builder.provider(provider));
}

pub(crate) fn install(registry: Arc<SinkRegistry>) -> Result<(), Error> {
    REGISTRY
        .set(registry)
        .map_err(|_| Error::new("global sink registry is already initialized"))?;
    *pending() = Pending::Built;
    Ok(())
}

fn configure(operation: &'static str, f: impl FnOnce(RegistryBuilder) -> RegistryBuilder) {
    let mut pending = pending();
    if matches!(*pending, Pending::Built) {
        let err = Error::new("global sink registry is already initialized; change is ignored")
            .with_context("operation", operation);
        DefaultTrap::default().trap(&err);
        return;
    }
    let builder = pending.take_builder();
    *pending = Pending::Configured(f(builder));
}

fn pending() -> MutexGuard<'static, Pending> {
    PENDING.lock().unwrap_or_else(PoisonError::into_inner)
}
