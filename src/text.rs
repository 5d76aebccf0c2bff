//! Text heuristics shared by the parsers and by bulk text editing.
//!
//! Every function here is total: input that does not match a pattern comes
//! back unchanged (or as `None`), never as an error.

use crate::model::{Direction, Ingredient};
use regex::Regex;
use std::sync::OnceLock;

/// Unit suffixes stripped before a nutrition value is parsed.
///
/// Longer suffixes come first so `mg` is not mistaken for `g`. The `Â`
/// variants are UTF-8 micro/degree signs that were decoded as Latin-1
/// somewhere upstream.
const MEASUREMENT_SUFFIXES: &[&str] = &[
    "kcal", "calories", "calorie", "cal", "mcg", "Âµg", "µg", "μg", "Â°g", "°g", "mg", "g",
];

/// Bullet glyphs removed from the start of pasted list lines.
const BULLETS: &[char] = &[
    '*', '-', '•', '◦', '▪', '▫', '‣', '⁃', '●', '○', '·', '–', '—',
];

fn iso_duration_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^PT(?:(\d+)H)?(?:(\d+)M)?$").expect("valid duration regex"))
}

fn numbered_prefix_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+[.)]\s*").expect("valid list prefix regex"))
}

/// Renders hours and minutes as `"1 hr 30 min"`, leaving out zero parts.
pub fn humanize_duration(hours: u64, minutes: u64) -> String {
    match (hours, minutes) {
        (0, 0) => "0 min".to_string(),
        (0, m) => format!("{m} min"),
        (h, 0) => format!("{h} hr"),
        (h, m) => format!("{h} hr {m} min"),
    }
}

/// Converts `PT<n>H<n>M` into `"1 hr 30 min"`; anything else is returned as is.
pub fn format_duration(raw: &str) -> String {
    let Some(captures) = iso_duration_regex().captures(raw.trim()) else {
        return raw.to_string();
    };

    let hours = captures.get(1).map(|m| m.as_str().parse::<u64>());
    let minutes = captures.get(2).map(|m| m.as_str().parse::<u64>());

    match (hours, minutes) {
        (None, None) => raw.to_string(),
        (Some(Err(_)), _) | (_, Some(Err(_))) => raw.to_string(),
        (h, m) => humanize_duration(
            h.and_then(Result::ok).unwrap_or(0),
            m.and_then(Result::ok).unwrap_or(0),
        ),
    }
}

fn strip_suffix_ignore_case<'a>(value: &'a str, suffix: &str) -> Option<&'a str> {
    let start = value.len().checked_sub(suffix.len())?;
    if !value.is_char_boundary(start) {
        return None;
    }
    value[start..]
        .eq_ignore_ascii_case(suffix)
        .then(|| &value[..start])
}

/// Parses nutrition strings like `"240 calories"` or `"9g"` into a number.
pub fn parse_numeric_measurement(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let without_unit = MEASUREMENT_SUFFIXES
        .iter()
        .find_map(|suffix| strip_suffix_ignore_case(trimmed, suffix))
        .unwrap_or(trimmed);

    let compact: String = without_unit.split_whitespace().collect();
    compact.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// First run of digits in the string, e.g. `6` for `"Serves 6"`.
pub fn first_integer(raw: &str) -> Option<u32> {
    raw.split(|c: char| !c.is_ascii_digit())
        .find(|token| !token.is_empty())
        .and_then(|token| token.parse().ok())
}

/// How headings are recognised in free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingMode {
    /// A line right after a blank line is a heading (ingredient lists).
    SingleBlankLine,
    /// Two blank lines or a trailing colon mark a heading, and wrapped body
    /// lines are joined into one entry (direction lists).
    DoubleBlankOrColon,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedLine {
    pub text: String,
    pub is_heading: bool,
}

/// Splits free text lines into headings and body entries. Blank lines act
/// only as separators and never appear in the output.
pub fn detect_heading_lines<S: AsRef<str>>(lines: &[S], mode: HeadingMode) -> Vec<DetectedLine> {
    let mut output: Vec<DetectedLine> = Vec::new();
    let mut blank_run = 0usize;
    // An open entry can still absorb continuation lines.
    let mut open_entry = false;

    for line in lines {
        let text = line.as_ref().trim();
        if text.is_empty() {
            blank_run += 1;
            open_entry = false;
            continue;
        }

        match mode {
            HeadingMode::SingleBlankLine => {
                output.push(DetectedLine {
                    text: text.to_string(),
                    is_heading: blank_run >= 1,
                });
            }
            HeadingMode::DoubleBlankOrColon => {
                let colon_terminated = text.ends_with(':');
                if blank_run >= 2 || colon_terminated {
                    let label = text.strip_suffix(':').unwrap_or(text).trim_end();
                    // a lone ':' closes the entry above but names nothing
                    if !label.is_empty() {
                        output.push(DetectedLine {
                            text: label.to_string(),
                            is_heading: true,
                        });
                    }
                    open_entry = false;
                } else if open_entry {
                    if let Some(last) = output.last_mut() {
                        last.text.push(' ');
                        last.text.push_str(text);
                    }
                } else {
                    output.push(DetectedLine {
                        text: text.to_string(),
                        is_heading: false,
                    });
                    open_entry = true;
                }
            }
        }

        blank_run = 0;
    }

    output
}

/// Which kind of list a pasted line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Ingredients,
    Directions,
}

/// Removes one leading bullet and, for directions, a `1.` / `2)` prefix.
pub fn strip_list_markers(line: &str, kind: ListKind) -> String {
    let mut rest = line.trim_start();
    if let Some(stripped) = rest.strip_prefix(BULLETS) {
        rest = stripped.trim_start();
    }
    if kind == ListKind::Directions {
        if let Some(found) = numbered_prefix_regex().find(rest) {
            rest = &rest[found.end()..];
        }
    }
    rest.trim().to_string()
}

/// Turns pasted ingredient text into an ordered ingredient list.
pub fn ingredients_from_text(text: &str) -> Vec<Ingredient> {
    let lines: Vec<String> = text
        .lines()
        .map(|line| strip_list_markers(line, ListKind::Ingredients))
        .collect();

    detect_heading_lines(&lines, HeadingMode::SingleBlankLine)
        .into_iter()
        .map(|line| Ingredient {
            text: line.text,
            is_heading: line.is_heading,
            is_main: false,
        })
        .collect()
}

/// Turns pasted direction text into an ordered direction list.
pub fn directions_from_text(text: &str) -> Vec<Direction> {
    let lines: Vec<String> = text
        .lines()
        .map(|line| strip_list_markers(line, ListKind::Directions))
        .collect();

    detect_heading_lines(&lines, HeadingMode::DoubleBlankOrColon)
        .into_iter()
        .map(|line| Direction {
            text: line.text,
            is_heading: line.is_heading,
        })
        .collect()
}
