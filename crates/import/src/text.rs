use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{Datelike, Duration, NaiveDate};
use regex::Regex;
use rust_decimal::Decimal;

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        pub(crate) fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}
pub(crate) use re;

re!(re_trailing_time, r"^(.*?\S)[ T]+\d{1,2}:\d{2}(?::\d{2})?(?:\.\d+)?\s*(?:[ap]\.?m\.?|z|[+-]\d{2}:?\d{2})?$");

const DAY_FIRST: &[&str] = &["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%d/%m/%y", "%d-%m-%y", "%d.%m.%y"];
const YEAR_FIRST: &[&str] = &["%Y/%m/%d", "%Y-%m-%d", "%Y.%m.%d"];
const MONTH_NAME: &[&str] = &[
    "%d %b %Y", "%d-%b-%Y", "%d/%b/%Y", "%d %B %Y", "%d-%B-%Y", "%d %b, %Y", "%d %b %y", "%d-%b-%y",
    "%b %d, %Y", "%B %d, %Y", "%b %d %Y", "%B %d %Y",
];
const MONTH_FIRST: &[&str] = &["%m/%d/%Y", "%m-%d-%Y", "%m/%d/%y"];

/// Excel's day zero (accounts for the 1900 leap-year bug).
const EXCEL_EPOCH: (i32, u32, u32) = (1899, 12, 30);
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

/// Lower-cases and replaces punctuation with single spaces.
pub fn normalize_label(raw: &str) -> String {
    raw.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parses a bank-formatted amount. Currency markers, thousands separators and
/// trailing Cr/Dr markers are ignored; `(x)` and `-x` are negative.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let mut s = raw.trim().to_lowercase();
    if s.is_empty() {
        return None;
    }
    let mut negative = false;
    if s.len() >= 2 && s.starts_with('(') && s.ends_with(')') {
        negative = true;
        s = s[1..s.len() - 1].trim().to_string();
    }
    for marker in ["inr", "rs.", "rs", "\u{20b9}", "$"] {
        s = s.replace(marker, "");
    }
    let trimmed = s.trim().trim_end_matches('.');
    let trimmed = trimmed
        .strip_suffix("cr")
        .or_else(|| trimmed.strip_suffix("dr"))
        .unwrap_or(trimmed);

    let mut digits: String = trimmed
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',' && *c != '\u{a0}')
        .collect();
    if let Some(rest) = digits.strip_prefix('+') {
        digits = rest.to_string();
    }
    if let Some(rest) = digits.strip_prefix('-').or_else(|| digits.strip_suffix('-')) {
        negative = !negative;
        digits = rest.to_string();
    }
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    let value = Decimal::from_str(&digits).ok()?;
    Some(if negative { -value } else { value })
}

/// Parses the date shapes found on bank statements, day-first before month-first.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = collapse_whitespace(raw.trim().trim_matches(|c| c == '"' || c == '\''));
    if s.is_empty() {
        return None;
    }
    if let Some(date) = parse_date_exact(&s) {
        return Some(date);
    }
    let caps = re_trailing_time().captures(&s)?;
    parse_date_exact(caps.get(1)?.as_str())
}

fn parse_date_exact(s: &str) -> Option<NaiveDate> {
    DAY_FIRST
        .iter()
        .chain(YEAR_FIRST)
        .chain(MONTH_NAME)
        .chain(MONTH_FIRST)
        .filter_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .find(|d| (1900..=2200).contains(&d.year()))
}

/// Like [`parse_date`], but also accepts bare Excel serial numbers when the
/// cell came out of a spreadsheet.
pub fn parse_date_cell(raw: &str, allow_excel_serial: bool) -> Option<NaiveDate> {
    if allow_excel_serial {
        if let Ok(serial) = raw.trim().parse::<f64>() {
            return excel_serial_to_date(serial);
        }
    }
    parse_date(raw)
}

pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !(1.0..=MAX_EXCEL_SERIAL).contains(&serial) {
        return None;
    }
    let (y, m, d) = EXCEL_EPOCH;
    let base = NaiveDate::from_ymd_opt(y, m, d)?;
    base.checked_add_signed(Duration::days(serial.trunc() as i64))
}

/// True when `needle`'s tokens occur as a contiguous run inside `haystack`.
pub(crate) fn contains_phrase(haystack: &[&str], needle: &[&str]) -> bool {
    !needle.is_empty()
        && haystack.len() >= needle.len()
        && haystack.windows(needle.len()).any(|w| w == needle)
}
