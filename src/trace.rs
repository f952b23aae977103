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

//! Scoped tracing of method entry and exit.

use std::cell::Cell;
use std::fmt::Display;

use crate::Logger;
use crate::Trap;
use crate::logger::NULL_ARGUMENT;
use crate::record::Severity;
use crate::template;
use crate::trap::DefaultTrap;

const INDENT_STEP: usize = 2;

thread_local! {
    static DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// A guard that logs entering a method when created and leaving it when dropped.
///
/// Both records are [`Severity::Verbose`] and indented by the calling thread's nesting depth, which
/// grows by two for every live guard on that thread. Guards on other threads do not affect it.
///
/// Failures of the sinks cannot be returned from `Drop`, so they go to the [`DefaultTrap`].
///
/// # Examples
///
/// ```
/// use logsink::CallTracer;
/// use logsink::Logger;
///
/// let logger = Logger::new("Billing", "App.Payments");
/// {
///     let _trace = CallTracer::enter_with_args(&logger, "charge", &[&"alice", &42]);
///     // logs "> charge(alice, 42)" ... "< charge()"
/// }
/// ```
#[derive(Debug)]
#[must_use = "the exit record is logged when the tracer is dropped"]
pub struct CallTracer<'a> {
    logger: &'a Logger,
    method: String,
}

impl<'a> CallTracer<'a> {
    /// Log entering `method` without arguments.
    pub fn enter(logger: &'a Logger, method: impl Into<String>) -> Self {
        Self::enter_with_args(logger, method, &[])
    }

    /// Log entering `method` with the given argument values.
    pub fn enter_with_args(
        logger: &'a Logger,
        method: impl Into<String>,
        args: &[&dyn Display],
    ) -> Self {
        let method = method.into();
        let args = args
            .iter()
            .map(|arg| template::display(*arg).unwrap_or_else(|_| NULL_ARGUMENT.to_string()))
            .collect::<Vec<_>>()
            .join(", ");

        let depth = DEPTH.get();
        trace(logger, format!("{:depth$}> {method}({args})", ""));
        DEPTH.set(depth + INDENT_STEP);

        Self { logger, method }
    }

    /// The nesting depth of the calling thread, in spaces.
    pub fn depth() -> usize {
        DEPTH.get()
    }
}

impl Drop for CallTracer<'_> {
    fn drop(&mut self) {
        let depth = DEPTH.get().saturating_sub(INDENT_STEP);
        DEPTH.set(depth);
        trace(self.logger, format!("{:depth$}< {}()", "", self.method));
    }
}

fn trace(logger: &Logger, message: String) {
    if let Err(err) = logger.emit(Severity::Verbose, message) {
        DefaultTrap::default().trap(&err);
    }
}

/// Create a [`CallTracer`] for the enclosing scope.
///
/// # Examples
///
/// ```
/// use logsink::Logger;
///
/// let logger = Logger::new("Billing", "App.Payments");
/// let _trace = logsink::trace_call!(logger, "refund", "order-17", 3);
/// ```
#[macro_export]
macro_rules! trace_call {
    ($logger:expr, $method:expr $(,)?) => {
        $crate::CallTracer::enter(&$logger, $method)
    };
    ($logger:expr, $method:expr, $($arg:expr),+ $(,)?) => {
        $crate::CallTracer::enter_with_args(
            &$logger,
            $method,
            &[$(&$arg as &dyn ::std::fmt::Display),+],
        )
    };
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex;

    use super::*;
    use crate::Error;
    use crate::SinkRegistry;
    use crate::record::LogRecord;
    use crate::sink::Sink;

    #[derive(Debug, Default)]
    struct Capture(Mutex<Vec<String>>);

    impl Sink for Capture {
        fn consume(&self, record: &LogRecord) -> Result<(), Error> {
            assert_eq!(record.severity(), Severity::Verbose);
            self.0.lock().unwrap().push(record.message().to_string());
            Ok(())
        }
    }

    fn logger(capture: &Arc<Capture>) -> Logger {
        let registry = SinkRegistry::builder()
            .force_console(false)
            .sink(capture.clone())
            .build();
        Logger::new("Tracer", "App").with_registry(Arc::new(registry))
    }

    fn outer(logger: &Logger) {
        let _trace = CallTracer::enter_with_args(logger, "outer", &[&1, &"two"]);
        middle(logger);
    }

    fn middle(logger: &Logger) {
        let _trace = trace_call!(logger, "middle");
        inner(logger);
    }

    fn inner(logger: &Logger) {
        let _trace = trace_call!(logger, "inner", 3.5);
        assert_eq!(CallTracer::depth(), 6);
    }

    #[test]
    fn test_nesting_indents_enter_and_exit() {
        let capture = Arc::new(Capture::default());
        outer(&logger(&capture));

        assert_eq!(
            *capture.0.lock().unwrap(),
            vec![
                "> outer(1, two)",
                "  > middle()",
                "    > inner(3.5)",
                "    < inner()",
                "  < middle()",
                "< outer()",
            ]
        );
        assert_eq!(CallTracer::depth(), 0);
    }

    #[test]
    fn test_depth_is_per_thread() {
        let capture = Arc::new(Capture::default());
        let logger = logger(&capture);

        let _trace = CallTracer::enter(&logger, "main");
        assert_eq!(CallTracer::depth(), 2);

        std::thread::scope(|s| {
            s.spawn(|| {
                assert_eq!(CallTracer::depth(), 0);
                let _trace = CallTracer::enter(&logger, "worker");
                assert_eq!(CallTracer::depth(), 2);
            });
        });

        assert_eq!(CallTracer::depth(), 2);
    }

    #[test]
    fn test_depth_unwinds_on_panic() {
        let capture = Arc::new(Capture::default());
        let logger = logger(&capture);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _trace = CallTracer::enter(&logger, "explode");
            panic!("boom");
        }));
        assert!(result.is_err());
        assert_eq!(CallTracer::depth(), 0);

        let messages = capture.0.lock().unwrap();
        assert_eq!(*messages, vec!["> explode()", "< explode()"]);
    }
}
