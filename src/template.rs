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

//! Substitute format arguments into message templates.
//!
//! A template is literal text with holes:
//!
//! * `{0}`, `{1}`, ... refer to arguments by position;
//! * `{name}` refers to arguments by name, the n-th distinct name binding to the n-th argument;
//! * `{0,8}` right-aligns the argument in 8 columns, `{0,-8}` left-aligns it;
//! * `{0:x2}` carries a format component, which is accepted and ignored;
//! * `{{` and `}}` are literal braces.
//!
//! ```
//! use logsink::template;
//!
//! let text = template::format("User {0} failed with code {1}", &[&"alice", &42]).unwrap();
//! assert_eq!(text, "User alice failed with code 42");
//!
//! let text = template::format("{user} logged in from {host}", &[&"bob", &"10.0.0.1"]).unwrap();
//! assert_eq!(text, "bob logged in from 10.0.0.1");
//! ```

use std::fmt;
use std::fmt::Display;
use std::fmt::Write;

/// The widest alignment a hole may request, in either direction.
pub const MAX_ALIGNMENT: u64 = 1_000_000;

/// An error substituting arguments into a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// The template text itself is malformed.
    Malformed {
        /// Byte offset of the offending character.
        position: usize,
        /// What is wrong.
        reason: &'static str,
    },
    /// A hole refers to an argument that was not supplied.
    MissingArgument {
        /// The requested argument index.
        index: usize,
        /// The number of supplied arguments.
        count: usize,
    },
    /// The argument's `Display` implementation failed.
    Argument {
        /// The argument index.
        index: usize,
    },
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateError::Malformed { position, reason } => {
                write!(f, "malformed template at {position}: {reason}")
            }
            TemplateError::MissingArgument { index, count } => {
                write!(
                    f,
                    "template refers to argument {index} but only {count} were supplied"
                )
            }
            TemplateError::Argument { index } => {
                write!(f, "failed to display argument {index}")
            }
        }
    }
}

impl std::error::Error for TemplateError {}

/// Substitute `args` into `template`.
///
/// # Errors
///
/// Return an error if the template is malformed, if a hole refers to an argument past the end of
/// `args`, or if an argument fails to display itself. Unused arguments are not an error.
pub fn format(template: &str, args: &[&dyn Display]) -> Result<String, TemplateError> {
    let mut output = String::with_capacity(template.len());
    let mut names: Vec<&str> = vec![];
    let mut chars = template.char_indices().peekable();

    while let Some((position, c)) = chars.next() {
        match c {
            '{' => {
                if chars.next_if(|(_, c)| *c == '{').is_some() {
                    output.push('{');
                    continue;
                }

                let start = position + 1;
                let mut end = None;
                for (i, c) in chars.by_ref() {
                    match c {
                        '}' => {
                            end = Some(i);
                            break;
                        }
                        '{' => {
                            return Err(TemplateError::Malformed {
                                position: i,
                                reason: "nested opening brace in hole",
                            });
                        }
                        _ => {}
                    }
                }
                let Some(end) = end else {
                    return Err(TemplateError::Malformed {
                        position,
                        reason: "hole is not closed",
                    });
                };

                let hole = parse_hole(&template[start..end], position, &mut names)?;
                write_hole(&mut output, &hole, args)?;
            }
            '}' => {
                if chars.next_if(|(_, c)| *c == '}').is_none() {
                    return Err(TemplateError::Malformed {
                        position,
                        reason: "unescaped closing brace",
                    });
                }
                output.push('}');
            }
            c => output.push(c),
        }
    }

    Ok(output)
}

/// Display a single argument, reporting a failing `Display` implementation as an error.
pub(crate) fn display(arg: &dyn Display) -> Result<String, fmt::Error> {
    let mut text = String::new();
    write!(&mut text, "{arg}")?;
    Ok(text)
}

struct Hole {
    index: usize,
    alignment: i64,
}

fn parse_hole<'a>(
    hole: &'a str,
    position: usize,
    names: &mut Vec<&'a str>,
) -> Result<Hole, TemplateError> {
    // the format component is accepted and ignored
    let head = match hole.split_once(':') {
        Some((head, _)) => head,
        None => hole,
    };
    let (name, alignment) = match head.split_once(',') {
        Some((name, alignment)) => (name.trim(), Some(alignment.trim())),
        None => (head.trim(), None),
    };

    let index = if name.is_empty() {
        return Err(TemplateError::Malformed {
            position,
            reason: "empty hole",
        });
    } else if name.bytes().all(|b| b.is_ascii_digit()) {
        name.parse::<usize>().map_err(|_| TemplateError::Malformed {
            position,
            reason: "argument index out of range",
        })?
    } else if is_identifier(name) {
        match names.iter().position(|n| *n == name) {
            Some(index) => index,
            None => {
                names.push(name);
                names.len() - 1
            }
        }
    } else {
        return Err(TemplateError::Malformed {
            position,
            reason: "hole is neither an index nor a name",
        });
    };

    let alignment = match alignment {
        Some(alignment) => alignment
            .parse::<i64>()
            .map_err(|_| TemplateError::Malformed {
                position,
                reason: "invalid alignment",
            })?,
        None => 0,
    };
    if alignment.unsigned_abs() > MAX_ALIGNMENT {
        return Err(TemplateError::Malformed {
            position,
            reason: "alignment out of range",
        });
    }

    Ok(Hole { index, alignment })
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

fn write_hole(output: &mut String, hole: &Hole, args: &[&dyn Display]) -> Result<(), TemplateError> {
    let arg = args
        .get(hole.index)
        .ok_or(TemplateError::MissingArgument {
            index: hole.index,
            count: args.len(),
        })?;
    let text = display(*arg).map_err(|_| TemplateError::Argument { index: hole.index })?;

    let width = usize::try_from(hole.alignment.unsigned_abs()).unwrap_or(usize::MAX);
    let padding = width.saturating_sub(text.chars().count());
    if hole.alignment < 0 {
        output.push_str(&text);
        output.extend(std::iter::repeat_n(' ', padding));
    } else {
        output.extend(std::iter::repeat_n(' ', padding));
        output.push_str(&text);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Broken;

    impl Display for Broken {
        fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
            Err(fmt::Error)
        }
    }

    #[test]
    fn test_positional_holes() {
        let text = format("{1} before {0}, {0} again", &[&"a", &"b"]).unwrap();
        assert_eq!(text, "b before a, a again");
    }

    #[test]
    fn test_named_holes_bind_in_order_of_appearance() {
        let text = format("{user}/{id}/{user}", &[&"alice", &7]).unwrap();
        assert_eq!(text, "alice/7/alice");
    }

    #[test]
    fn test_alignment_and_ignored_format_component() {
        assert_eq!(format("[{0,5}]", &[&42]).unwrap(), "[   42]");
        assert_eq!(format("[{0,-5}]", &[&42]).unwrap(), "[42   ]");
        assert_eq!(format("[{0:X}]", &[&255]).unwrap(), "[255]");
    }

    #[test]
    fn test_escaped_braces() {
        assert_eq!(format("{{{0}}}", &[&1]).unwrap(), "{1}");
        assert_eq!(format("no holes {{}}", &[&1]).unwrap(), "no holes {}");
    }

    #[test]
    fn test_missing_argument() {
        let err = format("{0} and {1}", &[&"only"]).unwrap_err();
        assert_eq!(err, TemplateError::MissingArgument { index: 1, count: 1 });
    }

    #[test]
    fn test_malformed_templates() {
        for template in ["{", "{0", "}", "{}", "{ }", "{0,x}", "{0{1}}", "{-1}", "{a b}"] {
            assert!(
                matches!(
                    format(template, &[&1, &2]),
                    Err(TemplateError::Malformed { .. })
                ),
                "{template} should be malformed"
            );
        }
    }

    #[test]
    fn test_alignment_is_bounded() {
        let widest = format("{0,1000000}", &[&1]).unwrap();
        assert_eq!(widest.len(), 1_000_000);
        assert!(widest.ends_with(" 1"));

        for template in [
            "{0,1000001}",
            "{0,-1000001}",
            "{0,2000000000}",
            "{0,9223372036854775807}",
            "{0,-9223372036854775808}",
        ] {
            assert_eq!(
                format(template, &[&1]),
                Err(TemplateError::Malformed {
                    position: 0,
                    reason: "alignment out of range",
                }),
                "{template} should be rejected"
            );
        }
    }

    #[test]
    fn test_failing_argument() {
        let err = format("value: {0}", &[&Broken]).unwrap_err();
        assert_eq!(err, TemplateError::Argument { index: 0 });
        assert!(display(&Broken).is_err());
        assert_eq!(display(&3.5).unwrap(), "3.5");
    }
}
