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

//! Serialize an error and its causes into the exception text of a record.
//!
//! Every level of the chain is written as `[<type>] <message>`, followed by its backtrace when one
//! was captured. Levels are separated by an [`INNER_MARKER`] line. A [`logsink::Error`](Error)
//! that carries sources is an aggregate: each source chain is expanded in order and the walk of
//! the outer chain stops there.
//!
//! The text is kept on a single line: line breaks are encoded as [`FAULT_LINE_SEPARATOR`], which
//! sinks that render for humans turn back into real line breaks.

use std::backtrace::Backtrace;
use std::backtrace::BacktraceStatus;
use std::error::Error as StdError;
use std::io;

use crate::Error;
use crate::template::TemplateError;

/// The character that stands for a line break inside serialized fault text.
pub const FAULT_LINE_SEPARATOR: char = '\u{bb}';

/// The line separating one level of a fault chain from the next.
pub const INNER_MARKER: &str = "Inner Exception:";

/// Serialize `err` and its causes.
///
/// # Examples
///
/// ```
/// use logsink::fault;
///
/// let err = std::io::Error::other("disk full");
/// let text = fault::serialize(&err);
/// assert!(text.starts_with("[std::io::Error] disk full"));
/// ```
pub fn serialize(err: &(dyn StdError + 'static)) -> String {
    let mut lines = vec![];
    write_chain(err, None, &mut lines);
    lines.join(&FAULT_LINE_SEPARATOR.to_string())
}

/// Turn serialized fault text back into multi-line text.
pub fn expand_lines(text: &str) -> String {
    text.replace(FAULT_LINE_SEPARATOR, "\n")
}

fn write_chain(
    mut err: &(dyn StdError + 'static),
    mut trace: Option<&Backtrace>,
    lines: &mut Vec<String>,
) {
    loop {
        write_level(err, trace, lines);

        if let Some(aggregate) = err.downcast_ref::<Error>() {
            if aggregate.sources().len() > 0 {
                for source in aggregate.sources() {
                    lines.push(INNER_MARKER.to_string());
                    write_chain(&**source, Some(source.backtrace()), lines);
                }
                return;
            }
        }

        match err.source() {
            Some(next) => {
                lines.push(INNER_MARKER.to_string());
                err = next;
                trace = None;
            }
            None => return,
        }
    }
}

fn write_level(
    err: &(dyn StdError + 'static),
    fallback_trace: Option<&Backtrace>,
    lines: &mut Vec<String>,
) {
    let (message, trace) = match err.downcast_ref::<Error>() {
        Some(err) => (describe(err), Some(err.backtrace())),
        None => (err.to_string(), fallback_trace),
    };

    let mut message = message.lines();
    let first = message.next().unwrap_or_default();
    lines.push(format!("[{}] {first}", type_label(err)));
    lines.extend(message.map(str::to_string));

    if let Some(trace) = trace {
        if trace.status() == BacktraceStatus::Captured {
            lines.extend(trace.to_string().lines().map(str::to_string));
        }
    }
}

// message and context only, sources are written as levels of their own
fn describe(err: &Error) -> String {
    if err.context().is_empty() {
        return err.message().to_string();
    }

    let context = err
        .context()
        .iter()
        .map(|(k, v)| format!("{k}: {v}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{}, context: {{ {context} }}", err.message())
}

fn type_label(err: &(dyn StdError + 'static)) -> String {
    if err.is::<Error>() {
        return "logsink::Error".to_string();
    }
    if err.is::<io::Error>() {
        return "std::io::Error".to_string();
    }
    if err.is::<TemplateError>() {
        return "logsink::template::TemplateError".to_string();
    }

    // the leading identifier of the debug representation names the type for derived impls
    let debug = format!("{err:?}");
    let label = debug
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == ':')
        .collect::<String>();
    let label = label.trim_end_matches(':');
    if label.is_empty() {
        "error".to_string()
    } else {
        label.to_string()
    }
}
