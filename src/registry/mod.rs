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

//! The fan-out table of active sinks.
//!
//! A [`SinkRegistry`] is built once and never changes afterwards. Loggers either carry an explicit
//! registry or share the process-wide one returned by [`global`], which is built lazily from the
//! configuration given to [`set_force_console`], [`register_sink`] and [`set_sink_provider`] the
//! first time a record is emitted.

use crate::Error;
use crate::record::LogRecord;
use crate::sink::Sink;

mod builder;
mod global;
mod hook;

pub use self::builder::RegistryBuilder;
pub use self::builder::SinkProvider;
pub use self::global::global;
pub use self::global::register_sink;
pub use self::global::set_force_console;
pub use self::global::set_sink_provider;
#[cfg(feature = "append-async")]
pub(crate) use self::hook::panic_message;

/// An immutable, ordered list of sinks that every record is dispatched to.
///
/// A registry always holds at least one sink.
///
/// # Examples
///
/// ```
/// use logsink::SinkRegistry;
///
/// let registry = SinkRegistry::builder().force_console(false).build();
/// assert_eq!(registry.len(), 1); // the fallback sink
/// ```
#[derive(Debug)]
pub struct SinkRegistry {
    sinks: Vec<Box<dyn Sink>>,
}

impl SinkRegistry {
    /// Create a new [`RegistryBuilder`].
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub(crate) fn new(sinks: Vec<Box<dyn Sink>>) -> Self {
        debug_assert!(!sinks.is_empty(), "a registry must hold at least one sink");
        Self { sinks }
    }

    /// Hand `record` to every sink, in order.
    ///
    /// # Errors
    ///
    /// Return the first error raised by a sink. Sinks after the failing one do not see the record.
    pub fn dispatch(&self, record: &LogRecord) -> Result<(), Error> {
        for sink in &self.sinks {
            sink.consume(record)?;
        }
        Ok(())
    }

    /// Flush every sink, in order.
    ///
    /// # Errors
    ///
    /// Return the first error raised by a sink.
    pub fn flush(&self) -> Result<(), Error> {
        for sink in &self.sinks {
            sink.flush()?;
        }
        Ok(())
    }

    /// The number of sinks.
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Always `false`: a registry holds at least one sink.
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Iterate over the sinks in dispatch order.
    pub fn sinks(&self) -> impl ExactSizeIterator<Item = &dyn Sink> {
        self.sinks.iter().map(|sink| sink.as_ref())
    }
}
