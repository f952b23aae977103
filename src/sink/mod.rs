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

//! Destinations that consume log records.

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use crate::Error;
use crate::record::LogRecord;

#[cfg(feature = "append-async")]
mod asynchronous;
mod console;
mod fallback;

#[cfg(feature = "append-async")]
pub use self::asynchronous::AsyncBuilder;
#[cfg(feature = "append-async")]
pub use self::asynchronous::AsyncSink;
pub use self::console::ConsoleSink;
pub use self::fallback::FallbackSink;

/// A destination that renders or forwards log records.
///
/// A sink is expected not to block indefinitely. Errors returned from [`Sink::consume`] propagate
/// to the caller of the logging call; a sink that must never fail the caller has to contain its own
/// errors.
pub trait Sink: fmt::Debug + Send + Sync + 'static {
    /// Consume a log record.
    fn consume(&self, record: &LogRecord) -> Result<(), Error>;

    /// Flush any buffered records.
    ///
    /// Default to a no-op.
    fn flush(&self) -> Result<(), Error> {
        Ok(())
    }

    /// The concrete type behind this sink, looking through wrappers such as `Arc`.
    #[doc(hidden)]
    fn concrete_type(&self) -> TypeId {
        TypeId::of::<Self>()
    }
}

impl<T: Sink> From<T> for Box<dyn Sink> {
    fn from(value: T) -> Self {
        Box::new(value)
    }
}

impl<T: Sink> Sink for Arc<T> {
    fn consume(&self, record: &LogRecord) -> Result<(), Error> {
        (**self).consume(record)
    }

    fn flush(&self) -> Result<(), Error> {
        (**self).flush()
    }

    fn concrete_type(&self) -> TypeId {
        (**self).concrete_type()
    }
}

/// Return whether `sink` is a [`ConsoleSink`].
pub(crate) fn is_console(sink: &dyn Sink) -> bool {
    sink.concrete_type() == TypeId::of::<ConsoleSink>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Nothing;

    impl Sink for Nothing {
        fn consume(&self, _: &LogRecord) -> Result<(), Error> {
            Ok(())
        }
    }

    #[test]
    fn test_console_detection_looks_through_arc() {
        let console: Box<dyn Sink> = Box::new(ConsoleSink::default());
        let shared: Box<dyn Sink> = Box::new(Arc::new(ConsoleSink::default()));
        let other: Box<dyn Sink> = Box::new(Nothing);
        let fallback: Box<dyn Sink> = Box::new(FallbackSink::default());

        assert!(is_console(console.as_ref()));
        assert!(is_console(shared.as_ref()));
        assert!(!is_console(other.as_ref()));
        assert!(!is_console(fallback.as_ref()));
    }
}
