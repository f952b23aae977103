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

use std::error::Error as StdError;
use std::fmt::Display;
use std::sync::Arc;

use crate::Error;
use crate::SinkRegistry;
use crate::fault;
use crate::record::LogRecord;
use crate::record::Severity;
use crate::registry;
use crate::template;

/// The module name of records the library emits about its own failures.
pub(crate) const INTERNAL_MODULE: &str = "Logger";
pub(crate) const INTERNAL_NAMESPACE: &str = "logsink";

/// How an argument that cannot display itself is rendered.
pub(crate) const NULL_ARGUMENT: &str = "(null)";

/// A named entry point for emitting log records.
///
/// A logger is a cheap value holding a module name and an optional namespace. Every record it
/// emits is dispatched synchronously to all sinks of its registry: the lazily built
/// [global](registry::global) registry unless one was injected with [`Logger::with_registry`].
///
/// Formatting never fails the call. When `args` do not fit the message template, the failure is
/// logged as an internal [`Severity::Error`] record under the module `Logger`, and the message is
/// emitted unformatted with every argument appended as ` [Argument: <value>]`. Failures of the
/// sinks themselves are returned to the caller.
///
/// # Examples
///
/// ```
/// use logsink::Logger;
///
/// let logger = Logger::new("Auth", "App.Security");
/// logger.info("User {0} signed in", &[&"alice"]).unwrap();
/// ```
#[derive(Clone, Debug)]
pub struct Logger {
    module_name: String,
    namespace: Option<String>,
    registry: Option<Arc<SinkRegistry>>,
}

impl Logger {
    /// Create a logger for `module_name` within `namespace`.
    pub fn new(module_name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            namespace: Some(namespace.into()),
            registry: None,
        }
    }

    /// Create a logger named after the type `T`.
    ///
    /// The module name is the type's own name and the namespace is the path it lives in. Generic
    /// parameters are dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use logsink::Logger;
    ///
    /// struct Service;
    ///
    /// let logger = Logger::of::<Service>();
    /// assert_eq!(logger.module_name(), "Service");
    /// ```
    pub fn of<T: ?Sized>() -> Self {
        let path = std::any::type_name::<T>();
        let path = match path.split_once('<') {
            Some((path, _)) => path,
            None => path,
        };

        let (namespace, module_name) = match path.rsplit_once("::") {
            Some((namespace, module_name)) => (Some(namespace.to_string()), module_name),
            None => (None, path),
        };

        Self {
            module_name: module_name.to_string(),
            namespace,
            registry: None,
        }
    }

    /// Dispatch through `registry` instead of the global registry.
    pub fn with_registry(mut self, registry: Arc<SinkRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// The module name attached to every record.
    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    /// The namespace attached to every record, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// The registry this logger dispatches to.
    pub fn registry(&self) -> &SinkRegistry {
        match &self.registry {
            Some(registry) => registry,
            None => registry::global(),
        }
    }

    /// Emit a record, substituting `args` into `message` when there are any.
    ///
    /// # Errors
    ///
    /// Return the first error raised by a sink.
    pub fn log(
        &self,
        severity: Severity,
        message: &str,
        exception: Option<&(dyn StdError + 'static)>,
        args: &[&dyn Display],
    ) -> Result<(), Error> {
        let registry = self.registry();
        let message = compose(registry, message, args)?;
        let record = LogRecord::builder()
            .module_name(Some(&self.module_name))
            .namespace(self.namespace.as_deref())
            .message(message)
            .severity(severity)
            .exception(exception.map(fault::serialize).unwrap_or_default())
            .build();
        registry.dispatch(&record)
    }

    /// Emit a [`Severity::Verbose`] record.
    ///
    /// # Errors
    ///
    /// Return the first error raised by a sink.
    pub fn verbose(&self, message: &str, args: &[&dyn Display]) -> Result<(), Error> {
        self.log(Severity::Verbose, message, None, args)
    }

    /// Emit a [`Severity::Verbose`] record describing `exception`.
    ///
    /// # Errors
    ///
    /// Return the first error raised by a sink.
    pub fn verbose_with(
        &self,
        exception: &(dyn StdError + 'static),
        message: &str,
        args: &[&dyn Display],
    ) -> Result<(), Error> {
        self.log(Severity::Verbose, message, Some(exception), args)
    }

    /// Emit a [`Severity::Info`] record.
    ///
    /// # Errors
    ///
    /// Return the first error raised by a sink.
    pub fn info(&self, message: &str, args: &[&dyn Display]) -> Result<(), Error> {
        self.log(Severity::Info, message, None, args)
    }

    /// Emit a [`Severity::Info`] record describing `exception`.
    ///
    /// # Errors
    ///
    /// Return the first error raised by a sink.
    pub fn info_with(
        &self,
        exception: &(dyn StdError + 'static),
        message: &str,
        args: &[&dyn Display],
    ) -> Result<(), Error> {
        self.log(Severity::Info, message, Some(exception), args)
    }

    /// Emit a [`Severity::Warning`] record.
    ///
    /// # Errors
    ///
    /// Return the first error raised by a sink.
    pub fn warning(&self, message: &str, args: &[&dyn Display]) -> Result<(), Error> {
        self.log(Severity::Warning, message, None, args)
    }

    /// Emit a [`Severity::Warning`] record describing `exception`.
    ///
    /// # Errors
    ///
    /// Return the first error raised by a sink.
    pub fn warning_with(
        &self,
        exception: &(dyn StdError + 'static),
        message: &str,
        args: &[&dyn Display],
    ) -> Result<(), Error> {
        self.log(Severity::Warning, message, Some(exception), args)
    }

    /// Emit a [`Severity::Error`] record.
    ///
    /// # Errors
    ///
    /// Return the first error raised by a sink.
    pub fn error(&self, message: &str, args: &[&dyn Display]) -> Result<(), Error> {
        self.log(Severity::Error, message, None, args)
    }

    /// Emit a [`Severity::Error`] record describing `exception`.
    ///
    /// # Errors
    ///
    /// Return the first error raised by a sink.
    pub fn error_with(
        &self,
        exception: &(dyn StdError + 'static),
        message: &str,
        args: &[&dyn Display],
    ) -> Result<(), Error> {
        self.log(Severity::Error, message, Some(exception), args)
    }

    /// Flush every sink of this logger's registry.
    ///
    /// # Errors
    ///
    /// Return the first error raised by a sink.
    pub fn flush(&self) -> Result<(), Error> {
        self.registry().flush()
    }

    // emit an already composed message
    pub(crate) fn emit(&self, severity: Severity, message: String) -> Result<(), Error> {
        let record = LogRecord::builder()
            .module_name(Some(&self.module_name))
            .namespace(self.namespace.as_deref())
            .message(message)
            .severity(severity)
            .build();
        self.registry().dispatch(&record)
    }
}

/// Emit a record for `module_name` through the global registry, without a namespace.
///
/// # Errors
///
/// Return the first error raised by a sink.
///
/// # Examples
///
/// ```
/// use logsink::Severity;
///
/// logsink::log("Startup", "configuration loaded", Severity::Info, None).unwrap();
/// ```
pub fn log(
    module_name: &str,
    message: &str,
    severity: Severity,
    exception: Option<&(dyn StdError + 'static)>,
) -> Result<(), Error> {
    let record = LogRecord::builder()
        .module_name(Some(module_name))
        .message(message)
        .severity(severity)
        .exception(exception.map(fault::serialize).unwrap_or_default())
        .build();
    registry::global().dispatch(&record)
}

/// A record about a failure inside the library itself.
pub(crate) fn internal_record(
    message: impl Into<String>,
    severity: Severity,
    exception: &(dyn StdError + 'static),
) -> LogRecord {
    LogRecord::builder()
        .module_name(Some(INTERNAL_MODULE))
        .namespace(Some(INTERNAL_NAMESPACE))
        .message(message)
        .severity(severity)
        .exception(fault::serialize(exception))
        .build()
}

fn compose(registry: &SinkRegistry, message: &str, args: &[&dyn Display]) -> Result<String, Error> {
    if args.is_empty() {
        return Ok(message.to_string());
    }

    let err = match template::format(message, args) {
        Ok(formatted) => return Ok(formatted),
        Err(err) => err,
    };

    let failure = Error::new("failed to format log message")
        .with_context("template", message)
        .with_context("arguments", args.len())
        .with_source(err);
    let record = internal_record(
        format!("Error in logger component: {}", failure.message()),
        Severity::Error,
        &failure,
    );
    registry.dispatch(&record)?;

    let mut composed = message.to_string();
    for (index, arg) in args.iter().enumerate() {
        let value = match template::display(*arg) {
            Ok(value) => value,
            Err(err) => {
                let failure = Error::new("failed to get string representation of argument")
                    .with_context("index", index)
                    .with_source(Error::from_fmt_error(err));
                let record = internal_record(
                    format!("Error in logger component: {}", failure.message()),
                    Severity::Error,
                    &failure,
                );
                registry.dispatch(&record)?;
                NULL_ARGUMENT.to_string()
            }
        };
        composed.push_str(" [Argument: ");
        composed.push_str(&value);
        composed.push(']');
    }
    Ok(composed)
}
