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

use jiff::Timestamp;
use jiff::tz::TimeZone;

use crate::Error;
use crate::fault;
use crate::layout::Layout;
use crate::record::LogRecord;

/// A layout that formats a log record as one human readable line.
///
/// Output format:
///
/// ```text
/// 2024-08-11 22:44:57.172 Auth (4242, 1): User alice failed with code 42 [AuthFailure] bad password
/// 2024-08-11 22:44:57.173 Billing (4242, 7): invoice sent
/// ```
///
/// The source is the record's module name, or its namespace when no module name is set. Line
/// breaks encoded in the exception text are turned back into real line breaks.
///
/// The timestamp is rendered in the system timezone unless another [`TimeZone`] is set.
///
/// # Examples
///
/// ```
/// use logsink::layout::LineLayout;
///
/// let layout = LineLayout::default();
/// ```
#[derive(Debug, Clone)]
pub struct LineLayout {
    timezone: TimeZone,
}

impl Default for LineLayout {
    fn default() -> Self {
        Self {
            timezone: TimeZone::system(),
        }
    }
}

impl LineLayout {
    /// Set the timezone for timestamps.
    ///
    /// Defaults to the system timezone if not set.
    ///
    /// # Examples
    ///
    /// ```
    /// use jiff::tz::TimeZone;
    /// use logsink::layout::LineLayout;
    ///
    /// let layout = LineLayout::default().timezone(TimeZone::UTC);
    /// ```
    pub fn timezone(mut self, tz: TimeZone) -> Self {
        self.timezone = tz;
        self
    }
}

impl Layout for LineLayout {
    fn format(&self, record: &LogRecord) -> Result<String, Error> {
        let ts = Timestamp::try_from(record.time()).map_err(|err| {
            Error::new("record time is out of range").with_source(err)
        })?;
        let time = ts
            .to_zoned(self.timezone.clone())
            .strftime("%Y-%m-%d %H:%M:%S.%3f");

        Ok(format!(
            "{time} {source} ({pid}, {tid}): {message} {exception}",
            source = record.source_name(),
            pid = record.process_id(),
            tid = record.thread_id(),
            message = record.message(),
            exception = fault::expand_lines(record.exception()),
        ))
    }
}
