//! Caption formatting: numbers, dates, trend glyphs and HTML markup.
//!
//! All functions are pure; "now" is always passed in by the caller.

use chrono::{NaiveDate, Weekday};

/// Glyph for a rising window
pub const GLYPH_UP: &str = "📈";
/// Glyph for a flat or falling window
pub const GLYPH_DOWN: &str = "📉";

const DAY_LABEL_FORMAT: &str = "%A, %b %-d";

/// Truncate toward zero to `decimals` places, never rounding.
///
/// Products within a few ulps of a whole step are snapped to it, so `0.29`
/// stays `0.29` instead of becoming `0.28`. Anything further below a step is
/// real input and is truncated.
#[must_use]
pub fn truncate_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    let scaled = value * factor;
    let nearest = scaled.round();
    let noise = 4.0 * f64::EPSILON * nearest.abs().max(1.0);
    if (scaled - nearest).abs() <= noise {
        nearest / factor
    } else {
        scaled.trunc() / factor
    }
}

/// Render a per-100k rate: one decimal, truncated; integer above 10.
///
/// ```
/// use ecodash_core::format::format_rate;
/// assert_eq!(format_rate(12.7), "12");
/// assert_eq!(format_rate(3.47), "3.4");
/// ```
#[must_use]
pub fn format_rate(rate: f64) -> String {
    let truncated = truncate_to(rate, 1);
    if truncated > 10.0 {
        format!("{}", truncated.trunc())
    } else {
        format!("{truncated}")
    }
}

/// Rate per 100k for a count, using the API's population unit.
#[must_use]
pub fn rate_per_100k(count: f64, population: f64) -> f64 {
    if population <= 0.0 {
        return 0.0;
    }
    (count / population).trunc() / 10.0
}

/// Percentage change of `value` over `baseline`, truncated to two decimals.
#[must_use]
pub fn percent_change(value: f64, baseline: f64) -> f64 {
    if baseline == 0.0 {
        return 0.0;
    }
    truncate_to((value - baseline) / baseline * 100.0, 2)
}

/// Whole days between `then` and `now`, phrased for a caption.
///
/// ```
/// use chrono::NaiveDate;
/// use ecodash_core::format::relative_day;
/// let now = NaiveDate::from_ymd_opt(2020, 11, 21).unwrap();
/// let then = NaiveDate::from_ymd_opt(2020, 11, 20).unwrap();
/// assert_eq!(relative_day(then, now), "yesterday");
/// ```
#[must_use]
pub fn relative_day(then: NaiveDate, now: NaiveDate) -> String {
    match (now - then).num_days() {
        1 => "yesterday".to_string(),
        days => format!("{days} days ago"),
    }
}

/// Parse the date part of an ISO date or timestamp.
#[must_use]
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let date = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// Render an ISO date as e.g. `Friday, Nov 20`.
#[must_use]
pub fn day_label(raw: &str) -> Option<String> {
    parse_date(raw).map(|d| d.format(DAY_LABEL_FORMAT).to_string())
}

/// Sunday of an ISO `YYYYWW` week, rendered as e.g. `Sunday, Nov 8`.
#[must_use]
pub fn week_ending(year_week: &str) -> Option<String> {
    let year: i32 = year_week.get(..4)?.parse().ok()?;
    let week: u32 = year_week.get(4..)?.parse().ok()?;
    NaiveDate::from_isoywd_opt(year, week, Weekday::Sun)
        .map(|d| d.format(DAY_LABEL_FORMAT).to_string())
}

/// Direction of one window compared with the window before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    /// The recent window is strictly larger
    Up,
    /// The recent window is equal or smaller
    Down,
}

impl Trend {
    /// Compare a recent window with the prior one.
    #[must_use]
    pub fn between(recent: f64, prior: f64) -> Self {
        if recent > prior {
            Self::Up
        } else {
            Self::Down
        }
    }

    /// Display glyph
    #[must_use]
    pub const fn glyph(self) -> &'static str {
        match self {
            Self::Up => GLYPH_UP,
            Self::Down => GLYPH_DOWN,
        }
    }
}

/// Multi-glyph trend from window values ordered most recent first.
///
/// Each adjacent pair gives one glyph; the oldest comparison is leftmost and
/// the most recent one rightmost.
#[must_use]
pub fn trend_indicator(windows: &[f64]) -> String {
    windows
        .windows(2)
        .rev()
        .map(|pair| Trend::between(pair[0], pair[1]).glyph())
        .collect()
}

/// File stem for chart images: every non-ASCII-letter becomes `_`.
#[must_use]
pub fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphabetic() { c } else { '_' })
        .collect()
}

/// `<b>text</b>` with the text escaped
#[must_use]
pub fn bold(text: &str) -> String {
    format!("<b>{}</b>", html_escape::encode_text(text))
}

/// `<i>text</i>` with the text escaped
#[must_use]
pub fn italic(text: &str) -> String {
    format!("<i>{}</i>", html_escape::encode_text(text))
}

/// `<code>text</code>` with the text escaped
#[must_use]
pub fn code(text: &str) -> String {
    format!("<code>{}</code>", html_escape::encode_text(text))
}

/// Escape plain text for HTML parse mode
#[must_use]
pub fn escape(text: &str) -> String {
    html_escape::encode_text(text).into_owned()
}

/// Maximum message length with a safety margin below Telegram's 4096.
pub const MESSAGE_LIMIT: usize = 4000;

/// Split text on line boundaries into parts of at most `max_chars` characters.
///
/// A single line longer than the limit is cut at character boundaries.
#[must_use]
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split('\n') {
        let line_len = line.chars().count();
        let needed = if current.is_empty() { line_len } else { line_len + 1 };

        if current_len + needed > max_chars && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if line_len > max_chars {
            let chars: Vec<char> = line.chars().collect();
            for chunk in chars.chunks(max_chars) {
                parts.push(chunk.iter().collect());
            }
            continue;
        }

        if !current.is_empty() {
            current.push('\n');
            current_len += 1;
        }
        current.push_str(line);
        current_len += line_len;
    }

    if !current.is_empty() {
        parts.push(current);
    }
    parts
}
