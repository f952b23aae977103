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

use crate::Error;
use crate::Trap;
use crate::logger::NULL_ARGUMENT;
use crate::record::LogRecord;
use crate::record::Severity;
use crate::registry;
use crate::template;
use crate::trap::DefaultTrap;

struct LogCrateLogger(());

impl log::Log for LogCrateLogger {
    fn enabled(&self, _: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        let target = record.target();
        let module_name = target.rsplit("::").next().unwrap_or(target);
        let message = match template::display(record.args()) {
            Ok(message) => message,
            Err(err) => {
                DefaultTrap::default().trap(&Error::from_fmt_error(err));
                NULL_ARGUMENT.to_string()
            }
        };

        let record = LogRecord::builder()
            .module_name(Some(module_name))
            .namespace(record.module_path())
            .message(message)
            .severity(record.level().into())
            .build();

        if let Err(err) = registry::global().dispatch(&record) {
            DefaultTrap::default().trap(&err);
        }
    }

    fn flush(&self) {
        if let Err(err) = registry::global().flush() {
            DefaultTrap::default().trap(&err);
        }
    }
}

impl From<log::Level> for Severity {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Severity::Error,
            log::Level::Warn => Severity::Warning,
            log::Level::Info => Severity::Info,
            log::Level::Debug | log::Level::Trace => Severity::Verbose,
        }
    }
}

/// Set up the log crate global logger.
///
/// This function calls [`log::set_logger`] to install a logger that forwards every record from the
/// log crate to the [global](crate::registry::global) sink registry. The last segment of the
/// record's target becomes the module name and its module path becomes the namespace.
///
/// This function will set the global maximum log level to `Trace`. To override this, call
/// [`log::set_max_level`] after this function.
///
/// # Errors
///
/// Return an error if the log crate global logger has already been set.
///
/// # Examples
///
/// ```
/// if let Err(err) = logsink::bridge::try_setup_log_crate() {
///     eprintln!("failed to set up the log bridge: {err}");
/// }
/// log::info!("forwarded to every sink");
/// ```
pub fn try_setup_log_crate() -> Result<(), log::SetLoggerError> {
    static LOGGER: LogCrateLogger = LogCrateLogger(());
    log::set_logger(&LOGGER)?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}

/// Set up the log crate global logger.
///
/// This function calls [`log::set_logger`] to install a logger that forwards every record from the
/// log crate to the [global](crate::registry::global) sink registry.
///
/// # Panics
///
/// Panic if the log crate global logger has already been set.
///
/// # Examples
///
/// ```
/// logsink::bridge::setup_log_crate();
/// log::warn!("forwarded to every sink");
/// ```
pub fn setup_log_crate() {
    try_setup_log_crate().expect(
        "logsink::bridge::setup_log_crate must be called before the log crate global logger initialized",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_mapping() {
        assert_eq!(Severity::from(log::Level::Error), Severity::Error);
        assert_eq!(Severity::from(log::Level::Warn), Severity::Warning);
        assert_eq!(Severity::from(log::Level::Info), Severity::Info);
        assert_eq!(Severity::from(log::Level::Debug), Severity::Verbose);
        assert_eq!(Severity::from(log::Level::Trace), Severity::Verbose);
    }
}
