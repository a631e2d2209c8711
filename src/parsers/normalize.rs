use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use regex::Regex;

static RELATIVE_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:posted\s+)?(\d+)\+?\s*(minute|min|month|mo|hour|hr|h|day|d|week|wk|w|m)s?(?:\s+ago)?$",
    )
    .expect("relative date pattern is valid")
});

/// Resolve a scraped link against the source origin.
///
/// Empty stays empty, `/path` is joined to `origin`, `//host/path` gets
/// `https:`, anything with a scheme is kept, and any other text is
/// prefixed with `https://` as-is. This is not a general URL joiner.
pub fn normalize_url(raw: &str, origin: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }
    if let Some(rest) = raw.strip_prefix("//") {
        return format!("https://{rest}");
    }
    if raw.starts_with('/') {
        return format!("{}{raw}", origin.trim_end_matches('/'));
    }
    if has_scheme(raw) {
        return raw.to_string();
    }
    format!("https://{raw}")
}

fn has_scheme(raw: &str) -> bool {
    let lower = raw.to_ascii_lowercase();
    if lower.starts_with("mailto:") || lower.starts_with("tel:") {
        return true;
    }
    match raw.find("://") {
        Some(end) if end > 0 => {
            let scheme = &raw[..end];
            scheme.starts_with(|c: char| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        _ => false,
    }
}

/// Stable slug of title then company: lowercase ASCII alphanumerics with every
/// other run collapsed to one hyphen, no hyphen at either end.
pub fn generate_source_id(title: &str, company: &str) -> String {
    let mut slug = String::with_capacity(title.len() + company.len() + 1);
    let mut pending_hyphen = false;
    for ch in title.chars().chain(std::iter::once(' ')).chain(company.chars()) {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

/// Parse ISO-8601 or a relative expression ("3 days ago", "5h"). Anything
/// unreadable resolves to `now`.
pub fn parse_flexible_date(text: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
        return now;
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S") {
        return dt.and_utc();
    }
    if let Some(dt) = NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return dt.and_utc();
    }

    let lower = text.to_lowercase();
    match lower.as_str() {
        "today" | "just posted" | "just now" | "new" => return now,
        "yesterday" => return now - TimeDelta::days(1),
        _ => {}
    }

    relative_offset(&lower)
        .and_then(|delta| now.checked_sub_signed(delta))
        .unwrap_or(now)
}

fn relative_offset(text: &str) -> Option<TimeDelta> {
    let caps = RELATIVE_DATE.captures(text)?;
    let amount: i64 = caps[1].parse().ok()?;
    match &caps[2] {
        "minute" | "min" | "m" => TimeDelta::try_minutes(amount),
        "hour" | "hr" | "h" => TimeDelta::try_hours(amount),
        "day" | "d" => TimeDelta::try_days(amount),
        "week" | "wk" | "w" => TimeDelta::try_weeks(amount),
        "month" | "mo" => amount.checked_mul(30).and_then(TimeDelta::try_days),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const ORIGIN: &str = "https://jobs.example.com";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn normalize_url_rules() {
        assert_eq!(normalize_url("", ORIGIN), "");
        assert_eq!(normalize_url("   ", ORIGIN), "");
        assert_eq!(
            normalize_url("/jobs/42", ORIGIN),
            "https://jobs.example.com/jobs/42"
        );
        assert_eq!(
            normalize_url("/jobs/42", "https://jobs.example.com/"),
            "https://jobs.example.com/jobs/42"
        );
        assert_eq!(
            normalize_url("http://other.org/x?y=1", ORIGIN),
            "http://other.org/x?y=1"
        );
        assert_eq!(
            normalize_url("//cdn.example.com/apply", ORIGIN),
            "https://cdn.example.com/apply"
        );
        assert_eq!(
            normalize_url("careers.acme.io/apply", ORIGIN),
            "https://careers.acme.io/apply"
        );
        assert_eq!(normalize_url("mailto:hr@acme.io", ORIGIN), "mailto:hr@acme.io");
    }

    #[test]
    fn source_id_is_stable_and_collapses_separators() {
        let a = generate_source_id("  Senior C++ / Rust Engineer!! ", "Acme, Inc.");
        let b = generate_source_id("  Senior C++ / Rust Engineer!! ", "Acme, Inc.");
        assert_eq!(a, b);
        assert_eq!(a, "senior-c-rust-engineer-acme-inc");
        assert!(!a.starts_with('-') && !a.ends_with('-'));
        assert!(!a.contains("--"));
    }

    #[test]
    fn source_id_handles_empty_parts() {
        assert_eq!(generate_source_id("", "Acme"), "acme");
        assert_eq!(generate_source_id("Dev", ""), "dev");
        assert_eq!(generate_source_id("---", "***"), "");
    }

    #[test]
    fn iso_dates_parse() {
        assert_eq!(
            parse_flexible_date(Some("2024-05-01T08:30:00Z"), now()),
            Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap()
        );
        assert_eq!(
            parse_flexible_date(Some("2024-05-01T10:30:00+02:00"), now()),
            Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap()
        );
        assert_eq!(
            parse_flexible_date(Some("2024-05-01"), now()),
            Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn relative_dates_parse() {
        assert_eq!(
            parse_flexible_date(Some("3 days ago"), now()),
            now() - TimeDelta::days(3)
        );
        assert_eq!(
            parse_flexible_date(Some("1 hour ago"), now()),
            now() - TimeDelta::hours(1)
        );
        assert_eq!(
            parse_flexible_date(Some("Posted 30+ days ago"), now()),
            now() - TimeDelta::days(30)
        );
        assert_eq!(parse_flexible_date(Some("5h"), now()), now() - TimeDelta::hours(5));
        assert_eq!(parse_flexible_date(Some("2w"), now()), now() - TimeDelta::weeks(2));
        assert_eq!(parse_flexible_date(Some("1mo"), now()), now() - TimeDelta::days(30));
        assert_eq!(
            parse_flexible_date(Some("yesterday"), now()),
            now() - TimeDelta::days(1)
        );
    }

    #[test]
    fn unreadable_dates_fall_back_to_now() {
        assert_eq!(parse_flexible_date(None, now()), now());
        assert_eq!(parse_flexible_date(Some(""), now()), now());
        assert_eq!(parse_flexible_date(Some("sometime soon"), now()), now());
        assert_eq!(
            parse_flexible_date(Some("99999999999999999 days ago"), now()),
            now()
        );
    }
}
