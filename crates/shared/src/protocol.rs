//! Payload grammar of the `/scrape` progress stream.
//!
//! Every SSE `message` event carries one of: the literal `DONE`, a string
//! prefixed with `ERROR:`, or a decimal percentage.

pub const SCRAPE_PATH: &str = "/scrape";
pub const DOWNLOAD_PATH: &str = "/download";

pub const DONE_TOKEN: &str = "DONE";
pub const ERROR_PREFIX: &str = "ERROR:";

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressMessage {
    Done,
    /// Server-reported failure; holds the payload after the `ERROR:` prefix, verbatim.
    Error(String),
    Progress(f64),
    /// Neither terminal nor a finite number.
    Unrecognized(String),
}

impl ProgressMessage {
    pub fn parse(payload: &str) -> Self {
        if payload == DONE_TOKEN {
            return Self::Done;
        }
        if let Some(message) = payload.strip_prefix(ERROR_PREFIX) {
            return Self::Error(message.to_string());
        }
        match parse_float_prefix(payload).filter(|value| value.is_finite()) {
            Some(value) => Self::Progress(value),
            None => Self::Unrecognized(payload.to_string()),
        }
    }
}

/// Parses the longest leading decimal literal, ignoring leading whitespace and
/// any trailing garbage (`"42.5%"` is `42.5`). Returns `None` when no digits lead.
pub fn parse_float_prefix(input: &str) -> Option<f64> {
    let s = input.trim_start_matches(|c: char| c.is_whitespace() || c == '\u{feff}');
    let bytes = s.as_bytes();
    let len = bytes.len();
    let is_digit = |idx: usize| idx < len && bytes[idx].is_ascii_digit();

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }

    let int_start = end;
    while is_digit(end) {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < len && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut cursor = frac_start;
        while is_digit(cursor) {
            cursor += 1;
        }
        digits += cursor - frac_start;
        if digits > 0 {
            end = cursor;
        }
    }

    if digits == 0 {
        return None;
    }

    if end < len && matches!(bytes[end], b'e' | b'E') {
        let mut cursor = end + 1;
        if cursor < len && matches!(bytes[cursor], b'+' | b'-') {
            cursor += 1;
        }
        let exp_start = cursor;
        while is_digit(cursor) {
            cursor += 1;
        }
        if cursor > exp_start {
            end = cursor;
        }
    }

    s[..end].parse::<f64>().ok()
}

/// Rounds half toward positive infinity (`2.5 -> 3`, `-2.5 -> -2`).
pub fn round_half_up(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let floor = value.floor();
    let rounded = if value - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    };
    // Normalize -0.0 so labels never read "-0%".
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// What the progress indicator shows for one progress message.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressRender {
    pub width_percent: f64,
    pub label: String,
}

impl ProgressRender {
    pub fn from_percent(percent: f64) -> Self {
        let rounded = round_half_up(percent);
        Self {
            width_percent: rounded,
            label: format!("{rounded:.0}%"),
        }
    }
}
