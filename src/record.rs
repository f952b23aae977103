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

//! Log record and severity.

use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

use crate::Error;
use crate::identity;
use crate::identity::ProcessIdentity;

/// How much an event affects the system.
///
/// Severities are totally ordered from [`Severity::None`] to [`Severity::Fatal`]. Records are never
/// filtered by severity; sinks use it for presentation only.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Severity {
    /// No severity set.
    #[default]
    None = 0,
    /// Lower priority, debugging output.
    Verbose = 1,
    /// Informational.
    Info = 2,
    /// Something suspicious happened.
    Warning = 3,
    /// An operation failed.
    Error = 4,
    /// The system cannot continue.
    Fatal = 5,
}

impl Severity {
    /// All severities, from the least to the most important.
    pub const ALL: [Severity; 6] = [
        Severity::None,
        Severity::Verbose,
        Severity::Info,
        Severity::Warning,
        Severity::Error,
        Severity::Fatal,
    ];

    /// The upper-case name of the severity.
    pub fn name(&self) -> &'static str {
        match self {
            Severity::None => "NONE",
            Severity::Verbose => "VERBOSE",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for Severity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::ALL
            .into_iter()
            .find(|severity| severity.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::new("malformed severity").with_context("input", s))
    }
}

/// One log event.
///
/// Records are created fresh for every logging call and are not modified afterwards. The process
/// identity fields are shared with every other record of the process.
#[derive(Clone, Debug)]
pub struct LogRecord {
    time: SystemTime,
    module_name: Option<String>,
    namespace: Option<String>,
    message: String,
    severity: Severity,
    exception: String,
    thread_id: u64,
    thread_name: Option<String>,
    identity: &'static ProcessIdentity,
}

impl LogRecord {
    /// Returns a new builder.
    pub fn builder() -> RecordBuilder {
        RecordBuilder::default()
    }

    /// The time the record was captured.
    pub fn time(&self) -> SystemTime {
        self.time
    }

    /// The logical module that emitted the record.
    pub fn module_name(&self) -> Option<&str> {
        self.module_name.as_deref()
    }

    /// The namespace of the emitting module.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// The module name, or the namespace when no module name is set.
    pub fn source_name(&self) -> &str {
        self.module_name
            .as_deref()
            .or(self.namespace.as_deref())
            .unwrap_or_default()
    }

    /// The message, after format arguments have been substituted.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The severity of the record.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// The serialized fault chain, empty when no fault was attached.
    ///
    /// Lines are joined with [`FAULT_LINE_SEPARATOR`](crate::fault::FAULT_LINE_SEPARATOR).
    pub fn exception(&self) -> &str {
        &self.exception
    }

    /// The id of the thread that emitted the record.
    pub fn thread_id(&self) -> u64 {
        self.thread_id
    }

    /// The name of the thread that emitted the record.
    pub fn thread_name(&self) -> Option<&str> {
        self.thread_name.as_deref()
    }

    /// The process identity this record was stamped with.
    pub fn identity(&self) -> &'static ProcessIdentity {
        self.identity
    }

    /// The process name.
    pub fn process_name(&self) -> &str {
        self.identity.process_name()
    }

    /// The process id.
    pub fn process_id(&self) -> u32 {
        self.identity.process_id()
    }

    /// The machine name.
    pub fn machine_name(&self) -> &str {
        self.identity.machine_name()
    }

    /// The user identity.
    pub fn user_name(&self) -> &str {
        self.identity.user_name()
    }
}

/// Builder for [`LogRecord`].
///
/// The time and the thread fields default to the moment and the thread the builder was created
/// on; the identity defaults to [`process_identity`](identity::process_identity).
#[derive(Debug)]
pub struct RecordBuilder {
    record: LogRecord,
}

impl Default for RecordBuilder {
    fn default() -> Self {
        RecordBuilder {
            record: LogRecord {
                time: SystemTime::now(),
                module_name: None,
                namespace: None,
                message: String::new(),
                severity: Severity::None,
                exception: String::new(),
                thread_id: identity::current_thread_id(),
                thread_name: identity::current_thread_name(),
                identity: identity::process_identity(),
            },
        }
    }
}

impl RecordBuilder {
    /// Set [`time`](LogRecord::time).
    pub fn time(mut self, time: SystemTime) -> Self {
        self.record.time = time;
        self
    }

    /// Set [`module_name`](LogRecord::module_name).
    pub fn module_name(mut self, module_name: Option<impl Into<String>>) -> Self {
        self.record.module_name = module_name.map(Into::into);
        self
    }

    /// Set [`namespace`](LogRecord::namespace).
    pub fn namespace(mut self, namespace: Option<impl Into<String>>) -> Self {
        self.record.namespace = namespace.map(Into::into);
        self
    }

    /// Set [`message`](LogRecord::message).
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.record.message = message.into();
        self
    }

    /// Set [`severity`](LogRecord::severity).
    pub fn severity(mut self, severity: Severity) -> Self {
        self.record.severity = severity;
        self
    }

    /// Set [`exception`](LogRecord::exception).
    pub fn exception(mut self, exception: impl Into<String>) -> Self {
        self.record.exception = exception.into();
        self
    }

    /// Set [`thread_id`](LogRecord::thread_id).
    pub fn thread_id(mut self, thread_id: u64) -> Self {
        self.record.thread_id = thread_id;
        self
    }

    /// Set [`thread_name`](LogRecord::thread_name).
    pub fn thread_name(mut self, thread_name: Option<impl Into<String>>) -> Self {
        self.record.thread_name = thread_name.map(Into::into);
        self
    }

    /// Set [`identity`](LogRecord::identity).
    pub fn identity(mut self, identity: &'static ProcessIdentity) -> Self {
        self.record.identity = identity;
        self
    }

    /// Invoke the builder and return a [`LogRecord`].
    pub fn build(self) -> LogRecord {
        self.record
    }
}
