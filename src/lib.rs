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

//! Logsink is a process-wide logging facade: loggers named after a module and a namespace emit
//! severity-tagged records, and every record fans out to all sinks of a registry.
//!
//! # Overview
//!
//! The registry is built once, on first use, from a console sink (on by default), an optionally
//! discovered sink, and any explicitly registered sinks. When nothing else is configured, records
//! go to a fallback sink on stderr. Once built, the registry never changes.
//!
//! # Examples
//!
//! Log through the global registry:
//!
//! ```
//! use logsink::Logger;
//!
//! let logger = Logger::new("Auth", "App.Security");
//! logger.info("User {0} signed in", &[&"alice"]).unwrap();
//! ```
//!
//! Build a registry explicitly and inject it:
//!
//! ```
//! use std::sync::Arc;
//!
//! use logsink::Logger;
//! use logsink::SinkRegistry;
//! use logsink::sink::FallbackSink;
//!
//! let registry = SinkRegistry::builder()
//!     .force_console(false)
//!     .sink(FallbackSink::default())
//!     .build();
//!
//! let logger = Logger::new("Billing", "App.Payments").with_registry(Arc::new(registry));
//! let err = "x".parse::<i32>().unwrap_err();
//! logger
//!     .error_with(&err, "Charge {0} failed", &[&42])
//!     .unwrap();
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod fault;
pub mod identity;
pub mod layout;
pub mod record;
pub mod registry;
pub mod sink;
pub mod template;
pub mod trace;
pub mod trap;

#[cfg(feature = "bridge-log")]
pub mod bridge;

mod error;
mod logger;

pub use self::error::Error;
pub use self::layout::Layout;
pub use self::logger::Logger;
pub use self::logger::log;
pub use self::record::LogRecord;
pub use self::record::Severity;
pub use self::registry::RegistryBuilder;
pub use self::registry::SinkRegistry;
pub use self::sink::Sink;
pub use self::trace::CallTracer;
pub use self::trap::Trap;
