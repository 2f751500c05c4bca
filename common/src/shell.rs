// POSIX shell quoting and argument splitting

use crate::errors::ValidationError;
use std::fmt::Display;

/// Quote a value so that a POSIX shell parses it back as exactly one word.
///
/// The result is always wrapped in single quotes; an embedded `'` closes the
/// quoted run, emits `"'"` and reopens it. Never apply this to a string that
/// is already a composed command line unless the intent is to pass that whole
/// line as a single argument (e.g. to `bash -lc`).
pub fn quote(value: impl Display) -> String {
    let value = value.to_string();
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        if c == '\'' {
            out.push_str("'\"'\"'");
        } else {
            out.push(c);
        }
    }
    out.push('\'');
    out
}

/// Like [`quote`], but leaves plain tokens bare.
///
/// Used for operator-configured paths in command position where a bare token
/// keeps the generated script readable.
pub fn quote_minimal(value: impl Display) -> String {
    let value = value.to_string();
    let is_plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_./:=@%+-".contains(c));
    if is_plain {
        value
    } else {
        quote(value)
    }
}

/// Quote every value and join them with single spaces
pub fn join<I, T>(values: I) -> String
where
    I: IntoIterator<Item = T>,
    T: Display,
{
    values.into_iter().map(quote).collect::<Vec<_>>().join(" ")
}

#[derive(Clone, Copy, PartialEq)]
enum SplitState {
    Unquoted,
    Single,
    Double,
}

/// Split a free-text argument line into words the way a POSIX shell would,
/// without performing any expansion.
pub fn split_arguments(text: &str) -> Result<Vec<String>, ValidationError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut state = SplitState::Unquoted;
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        match state {
            SplitState::Unquoted => match c {
                ' ' | '\t' | '\r' | '\n' => {
                    if in_word {
                        words.push(std::mem::take(&mut current));
                        in_word = false;
                    }
                }
                '\'' => {
                    state = SplitState::Single;
                    in_word = true;
                }
                '"' => {
                    state = SplitState::Double;
                    in_word = true;
                }
                '\\' => match chars.next() {
                    // Backslash-newline is a line continuation
                    Some('\n') => {}
                    Some(next) => {
                        current.push(next);
                        in_word = true;
                    }
                    None => {
                        return Err(ValidationError::InvalidArguments(
                            "trailing backslash".to_string(),
                        ))
                    }
                },
                _ => {
                    current.push(c);
                    in_word = true;
                }
            },
            SplitState::Single => {
                if c == '\'' {
                    state = SplitState::Unquoted;
                } else {
                    current.push(c);
                }
            }
            SplitState::Double => match c {
                '"' => state = SplitState::Unquoted,
                '\\' => match chars.next() {
                    Some(next @ ('"' | '\\' | '$' | '`')) => current.push(next),
                    Some('\n') => {}
                    Some(next) => {
                        current.push('\\');
                        current.push(next);
                    }
                    None => {
                        return Err(ValidationError::InvalidArguments(
                            "unterminated double quote".to_string(),
                        ))
                    }
                },
                _ => current.push(c),
            },
        }
    }

    match state {
        SplitState::Single => Err(ValidationError::InvalidArguments(
            "unterminated single quote".to_string(),
        )),
        SplitState::Double => Err(ValidationError::InvalidArguments(
            "unterminated double quote".to_string(),
        )),
        SplitState::Unquoted => {
            if in_word {
                words.push(current);
            }
            Ok(words)
        }
    }
}
