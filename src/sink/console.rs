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
use std::sync::Mutex;
use std::sync::PoisonError;

use colored::Color;
use colored::Colorize;

use crate::Error;
use crate::Layout;
use crate::layout::LineLayout;
use crate::record::LogRecord;
use crate::record::Severity;
use crate::sink::Sink;

// held for the whole coloured write of one record
static CONSOLE_LOCK: Mutex<()> = Mutex::new(());

/// A sink that prints log records to stdout, coloured by severity.
///
/// Default colours are bright black for [`Severity::Verbose`], bright yellow for
/// [`Severity::Warning`], bright red for [`Severity::Error`] and red for [`Severity::Fatal`].
/// [`Severity::Info`] and [`Severity::None`] keep the terminal's default colour.
///
/// # Examples
///
/// ```
/// use logsink::sink::ConsoleSink;
///
/// let console = ConsoleSink::default();
/// ```
#[derive(Debug)]
pub struct ConsoleSink {
    layout: Box<dyn Layout>,
    colors: SeverityColor,
    no_color: bool,
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self {
            layout: Box::new(LineLayout::default()),
            colors: SeverityColor::default(),
            no_color: false,
        }
    }
}

impl ConsoleSink {
    /// Set the layout for the [`ConsoleSink`].
    ///
    /// Default to [`LineLayout`].
    pub fn with_layout(mut self, layout: impl Into<Box<dyn Layout>>) -> Self {
        self.layout = layout.into();
        self
    }

    /// Customize the colour of verbose records.
    pub fn verbose_color(mut self, color: Color) -> Self {
        self.colors.verbose = Some(color);
        self
    }

    /// Customize the colour of info records. Default to the terminal's colour.
    pub fn info_color(mut self, color: Color) -> Self {
        self.colors.info = Some(color);
        self
    }

    /// Customize the colour of warning records.
    pub fn warning_color(mut self, color: Color) -> Self {
        self.colors.warning = Some(color);
        self
    }

    /// Customize the colour of error records.
    pub fn error_color(mut self, color: Color) -> Self {
        self.colors.error = Some(color);
        self
    }

    /// Customize the colour of fatal records.
    pub fn fatal_color(mut self, color: Color) -> Self {
        self.colors.fatal = Some(color);
        self
    }

    /// Disable coloured output.
    pub fn no_color(mut self) -> Self {
        self.no_color = true;
        self
    }

    /// The colour a record of `severity` is printed in, `None` for the terminal's default.
    pub fn color_for(&self, severity: Severity) -> Option<Color> {
        if self.no_color {
            return None;
        }
        self.colors.color_for(severity)
    }
}

impl Sink for ConsoleSink {
    fn consume(&self, record: &LogRecord) -> Result<(), Error> {
        let line = self.layout.format(record)?;
        let line = match self.color_for(record.severity()) {
            Some(color) => line.as_str().color(color).to_string(),
            None => line,
        };

        let _guard = CONSOLE_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{line}").map_err(Error::from_io_error)?;
        Ok(())
    }

    fn flush(&self) -> Result<(), Error> {
        io::stdout().flush().map_err(Error::from_io_error)
    }
}

/// Colours for each severity; `None` keeps the terminal's default.
#[derive(Debug, Clone)]
struct SeverityColor {
    verbose: Option<Color>,
    info: Option<Color>,
    warning: Option<Color>,
    error: Option<Color>,
    fatal: Option<Color>,
}

impl Default for SeverityColor {
    fn default() -> Self {
        Self {
            verbose: Some(Color::BrightBlack),
            info: None,
            warning: Some(Color::BrightYellow),
            error: Some(Color::BrightRed),
            fatal: Some(Color::Red),
        }
    }
}

impl SeverityColor {
    fn color_for(&self, severity: Severity) -> Option<Color> {
        match severity {
            Severity::None => None,
            Severity::Verbose => self.verbose,
            Severity::Info => self.info,
            Severity::Warning => self.warning,
            Severity::Error => self.error,
            Severity::Fatal => self.fatal,
        }
    }
}
