/// Named string formats recognized by the string handler, and their lexical
/// checks. Any other `format` value is ignored by the compiler.
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate};
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringFormat {
    Email,
    DateTime,
    Uri,
    Uuid,
    Date,
}

impl StringFormat {
    pub fn parse(s: &str) -> Option<StringFormat> {
        match s {
            "email" => Some(StringFormat::Email),
            "date-time" => Some(StringFormat::DateTime),
            "uri" => Some(StringFormat::Uri),
            "uuid" => Some(StringFormat::Uuid),
            "date" => Some(StringFormat::Date),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StringFormat::Email => "email",
            StringFormat::DateTime => "date-time",
            StringFormat::Uri => "uri",
            StringFormat::Uuid => "uuid",
            StringFormat::Date => "date",
        }
    }

    /// True when `s` has the lexical form this format requires.
    pub fn matches(&self, s: &str) -> bool {
        match self {
            StringFormat::Email => is_email(s),
            StringFormat::DateTime => is_date_time(s),
            StringFormat::Uri => url::Url::parse(s).is_ok(),
            StringFormat::Uuid => s.len() == 36 && uuid::Uuid::parse_str(s).is_ok(),
            StringFormat::Date => is_full_date(s),
        }
    }
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^[a-z0-9_'+\-.]*[a-z0-9_+\-]@([a-z0-9][a-z0-9\-]*\.)+[a-z]{2,}$")
            .expect("email pattern is valid")
    })
}

fn date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date pattern is valid"))
}

fn date_time_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+\-]\d{2}:\d{2})$")
            .expect("date-time pattern is valid")
    })
}

/// Local part may not start with a dot or contain consecutive dots; the
/// regex crate has no lookahead, so those are checked separately.
fn is_email(s: &str) -> bool {
    !s.starts_with('.') && !s.contains("..") && email_regex().is_match(s)
}

/// `YYYY-MM-DD` naming a real calendar day.
fn is_full_date(s: &str) -> bool {
    date_regex().is_match(s) && NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

/// RFC 3339 with an uppercase `T` separator and `Z` designator.
fn is_date_time(s: &str) -> bool {
    date_time_regex().is_match(s) && DateTime::parse_from_rfc3339(s).is_ok()
}
