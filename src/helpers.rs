// 🧮 Formatting & parsing helpers
//
// Pure functions shared by the import pipelines and reports:
// currency formatting, lenient numeric coercion, Korean/ISO date parsing, median.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};

// ============================================================================
// FORMATTING
// ============================================================================

/// Format an amount with thousands separators: 1234567 → "1,234,567"
pub fn format_currency(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if amount < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Compact Korean units: 억 (1e8), 만 (1e4), 천 (1e3), otherwise "N원"
pub fn format_currency_short(amount: i64) -> String {
    let abs = amount.unsigned_abs();
    let value = amount as f64;

    if abs >= 100_000_000 {
        format!("{:.1}억", value / 100_000_000.0)
    } else if abs >= 10_000 {
        format!("{:.0}만", value / 10_000.0)
    } else if abs >= 1_000 {
        format!("{:.0}천", value / 1_000.0)
    } else {
        format!("{}원", format_currency(amount))
    }
}

/// Man-days without a trailing ".0": 1.0 → "1", 1.5 → "1.5"
pub fn format_md(md: f64) -> String {
    if !md.is_finite() {
        return "0".to_string();
    }
    if md.fract() == 0.0 {
        format!("{:.0}", md)
    } else {
        format!("{:.1}", md)
    }
}

// ============================================================================
// TEXT / NUMBER COERCION
// ============================================================================

/// Strip byte-order marks and surrounding whitespace
pub fn normalize_text(value: &str) -> String {
    value.replace('\u{FEFF}', "").trim().to_string()
}

/// Lenient integer parse: drops everything but digits and '-', then reads the
/// leading integer. "1,200원" → 1200, "" → fallback
pub fn parse_int(value: &str, fallback: i64) -> i64 {
    let filtered: String = value
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '-')
        .collect();

    numeric_prefix(&filtered, false)
        .parse::<i64>()
        .unwrap_or(fallback)
}

/// Lenient float parse: drops everything but digits, '.' and '-', then reads the
/// leading number. "1.5공수" → 1.5
pub fn parse_num(value: &str, fallback: f64) -> f64 {
    let filtered: String = value
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    match numeric_prefix(&filtered, true).parse::<f64>() {
        Ok(n) if n.is_finite() => n,
        _ => fallback,
    }
}

/// Longest prefix shaped like `-?digits(.digits)?`
fn numeric_prefix(s: &str, allow_fraction: bool) -> &str {
    let bytes = s.as_bytes();
    let mut end = 0;

    if bytes.first() == Some(&b'-') {
        end = 1;
    }
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if allow_fraction && end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }

    &s[..end]
}

// ============================================================================
// DATES
// ============================================================================

/// Parse a date written as ISO (`2025-01-01...`), Korean long form
/// (`25년1월1일(수)`, `2025년 1월 1일`) or a handful of common formats.
///
/// Two-digit Korean years are taken as 20xx.
pub fn parse_korean_date(raw: &str) -> Option<NaiveDate> {
    let s = normalize_text(raw);
    if s.is_empty() {
        return None;
    }

    // ISO prefix
    if let Some(prefix) = s.get(..10) {
        let b = prefix.as_bytes();
        let shaped = b[..4].iter().all(u8::is_ascii_digit)
            && b[4] == b'-'
            && b[5..7].iter().all(u8::is_ascii_digit)
            && b[7] == b'-'
            && b[8..10].iter().all(u8::is_ascii_digit);
        if shaped {
            if let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
                return Some(date);
            }
        }
    }

    if let Some(date) = parse_korean_long_form(&s) {
        return Some(date);
    }

    parse_general_date(&s)
}

/// `(\d{2,4})년\s*(\d{1,2})월\s*(\d{1,2})일` anywhere in the string
fn parse_korean_long_form(s: &str) -> Option<NaiveDate> {
    let chars: Vec<char> = s.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        if c != '년' {
            continue;
        }

        let mut start = i;
        while start > 0 && chars[start - 1].is_ascii_digit() {
            start -= 1;
        }
        if i - start < 2 {
            continue;
        }
        let year_start = start.max(i.saturating_sub(4));
        let year: i32 = match collect_number(&chars[year_start..i]) {
            Some(y) => y as i32,
            None => continue,
        };

        let Some((month, after_month)) = read_unit(&chars, i + 1, '월') else {
            continue;
        };
        let Some((day, _)) = read_unit(&chars, after_month, '일') else {
            continue;
        };

        let year = if year < 100 { 2000 + year } else { year };
        if year >= 1900 && (1..=12).contains(&month) && (1..=31).contains(&day) {
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                return Some(date);
            }
        }
    }

    None
}

/// Skip whitespace, read 1-2 digits, expect `unit`; returns value and next index
fn read_unit(chars: &[char], mut pos: usize, unit: char) -> Option<(u32, usize)> {
    while pos < chars.len() && chars[pos].is_whitespace() {
        pos += 1;
    }
    let start = pos;
    while pos < chars.len() && pos - start < 2 && chars[pos].is_ascii_digit() {
        pos += 1;
    }
    if pos == start || chars.get(pos) != Some(&unit) {
        return None;
    }
    let value = collect_number(&chars[start..pos])?;
    Some((value, pos + 1))
}

fn collect_number(digits: &[char]) -> Option<u32> {
    digits.iter().collect::<String>().parse().ok()
}

/// `YYYY[-./]M[-./]D` anywhere in the string ("2025.1.5 12:30" → 2025-01-05)
pub fn find_ymd(s: &str) -> Option<NaiveDate> {
    let b = s.as_bytes();
    let is_sep = |c: u8| c == b'-' || c == b'.' || c == b'/';

    let read_digits = |mut pos: usize| -> Option<(u32, usize)> {
        let start = pos;
        while pos < b.len() && pos - start < 2 && b[pos].is_ascii_digit() {
            pos += 1;
        }
        if pos == start {
            return None;
        }
        std::str::from_utf8(&b[start..pos])
            .ok()?
            .parse()
            .ok()
            .map(|v| (v, pos))
    };

    for i in 0..b.len().saturating_sub(4) {
        if !b[i..i + 4].iter().all(u8::is_ascii_digit) {
            continue;
        }
        if i + 4 >= b.len() || !is_sep(b[i + 4]) {
            continue;
        }
        let Some((month, pos)) = read_digits(i + 5) else {
            continue;
        };
        if pos >= b.len() || !is_sep(b[pos]) {
            continue;
        }
        let Some((day, _)) = read_digits(pos + 1) else {
            continue;
        };
        let year: i32 = match std::str::from_utf8(&b[i..i + 4]).ok().and_then(|y| y.parse().ok()) {
            Some(y) => y,
            None => continue,
        };
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(date);
        }
    }

    None
}

fn parse_general_date(s: &str) -> Option<NaiveDate> {
    if let Some(date) = find_ymd(s) {
        return Some(date);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }

    for fmt in ["%m/%d/%Y", "%b %d, %Y", "%B %d, %Y", "%d %b %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }

    None
}

/// Spreadsheet serial day number → calendar date (1900 date system)
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial >= 2_958_466.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64))
}

// ============================================================================
// STATISTICS
// ============================================================================

/// Median; an even count averages the two middle values (rounded). Empty → 0
pub fn median(values: &[i64]) -> i64 {
    let mut sorted = values.to_vec();
    sorted.sort_unstable();

    if sorted.is_empty() {
        return 0;
    }

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        ((sorted[mid - 1] + sorted[mid]) as f64 / 2.0).round() as i64
    }
}
