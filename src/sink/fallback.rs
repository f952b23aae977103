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

use std::io;
use std::io::Write;

use crate::Error;
use crate::Layout;
use crate::layout::LineLayout;
use crate::record::LogRecord;
use crate::sink::Sink;

/// A sink that prints uncoloured log records to stderr.
///
/// The registry falls back to this sink when no other sink was configured, registered or
/// discovered, so that records are never silently dropped.
///
/// # Examples
///
/// ```
/// use logsink::sink::FallbackSink;
///
/// let fallback = FallbackSink::default();
/// ```
#[derive(Debug)]
pub struct FallbackSink {
    layout: Box<dyn Layout>,
}

impl Default for FallbackSink {
    fn default() -> Self {
        Self {
            layout: Box::new(LineLayout::default()),
        }
    }
}

impl FallbackSink {
    /// Set the layout for the [`FallbackSink`].
    ///
    /// Default to [`LineLayout`].
    pub fn with_layout(mut self, layout: impl Into<Box<dyn Layout>>) -> Self {
        self.layout = layout.into();
        self
    }
}

impl Sink for FallbackSink {
    fn consume(&self, record: &LogRecord) -> Result<(), Error> {
        let mut line = self.layout.format(record)?;
        line.push('\n');
        io::stderr()
            .write_all(line.as_bytes())
            .map_err(Error::from_io_error)
    }

    fn flush(&self) -> Result<(), Error> {
        io::stderr().flush().map_err(Error::from_io_error)
    }
}
