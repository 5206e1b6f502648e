//! IRC text styling.
//!
//! The host framework consumes text decoration as a capability; this module
//! provides the IRC flavor of it. Named styles become mIRC control codes on
//! the way out, and [`strip_styles`] removes every formatting code from
//! inbound text, including multi-digit color sequences.

use std::borrow::Cow;

const BOLD: char = '\x02';
const COLOR: char = '\x03';
const RESET: char = '\x0F';
const REVERSE: char = '\x16';
const UNDERLINE: char = '\x1F';

const FORMAT_CHARS: &[char] = &[BOLD, COLOR, RESET, REVERSE, UNDERLINE];

/// Text decoration capability as the host framework expects it.
pub trait TextDecorator: Send + Sync {
    /// Apply the named styles to `text`. Unknown style names are ignored.
    fn apply_style(&self, text: &str, styles: &[&str]) -> String;

    /// Remove every formatting code from `text`.
    fn remove_all_styles<'a>(&self, text: &'a str) -> Cow<'a, str>;
}

/// IRC implementation of the decorator capability.
#[derive(Debug, Default, Clone, Copy)]
pub struct IrcStyler;

impl TextDecorator for IrcStyler {
    fn apply_style(&self, text: &str, styles: &[&str]) -> String {
        let mut out = text.to_string();
        for group in styles {
            // A single argument may carry several space-separated names.
            for name in group.split_whitespace() {
                out = match name {
                    "bold" => wrap(&out, BOLD),
                    "underline" => wrap(&out, UNDERLINE),
                    "reverse" => wrap(&out, REVERSE),
                    _ => match color_code(name) {
                        Some(code) => format!("{COLOR}{code:02}{out}{COLOR}"),
                        None => out,
                    },
                };
            }
        }
        out
    }

    fn remove_all_styles<'a>(&self, text: &'a str) -> Cow<'a, str> {
        strip_styles(text)
    }
}

fn wrap(text: &str, code: char) -> String {
    format!("{code}{text}{code}")
}

fn color_code(name: &str) -> Option<u8> {
    let code = match name {
        "white" => 0,
        "black" => 1,
        "navy" | "blue" => 2,
        "green" => 3,
        "red" => 4,
        "brown" | "maroon" => 5,
        "purple" | "violet" => 6,
        "olive" | "orange" => 7,
        "yellow" => 8,
        "lightgreen" | "lime" => 9,
        "teal" => 10,
        "cyan" | "aqua" => 11,
        "lightblue" | "royal" => 12,
        "pink" | "fuchsia" => 13,
        "gray" | "grey" => 14,
        "lightgray" | "lightgrey" | "silver" => 15,
        _ => return None,
    };
    Some(code)
}

/// Strip all mIRC formatting codes from a string.
///
/// Returns `Cow::Borrowed` when no formatting is present. A color code
/// swallows up to two foreground digits and, after a comma, up to two
/// background digits.
pub fn strip_styles(text: &str) -> Cow<'_, str> {
    if !text.contains(FORMAT_CHARS) {
        return Cow::Borrowed(text);
    }

    enum State {
        Text,
        /// Inside a color sequence; counts foreground digits seen.
        Fg(u8),
        /// Saw the comma; counts background digits seen.
        Bg(u8),
    }

    let mut out = String::with_capacity(text.len());
    let mut state = State::Text;
    for c in text.chars() {
        state = match state {
            State::Text if c == COLOR => State::Fg(0),
            State::Text => {
                if !FORMAT_CHARS.contains(&c) {
                    out.push(c);
                }
                State::Text
            }
            State::Fg(n) if n < 2 && c.is_ascii_digit() => State::Fg(n + 1),
            State::Fg(n) if n > 0 && c == ',' => State::Bg(0),
            State::Bg(n) if n < 2 && c.is_ascii_digit() => State::Bg(n + 1),
            State::Fg(_) | State::Bg(_) => {
                // Sequence over; reprocess this char as normal text.
                if c == COLOR {
                    State::Fg(0)
                } else {
                    if !FORMAT_CHARS.contains(&c) {
                        out.push(c);
                    }
                    State::Text
                }
            }
        };
    }
    Cow::Owned(out)
}
