//! Heuristic publication-date recognition.
//!
//! Pages publish dates in every shape imaginable. [`recognize`] runs a fixed,
//! ordered chain of rules and the first rule that produces a timestamp wins:
//!
//! | # | Rule | Example |
//! |---|------|---------|
//! | 1 | [`DateRule::EpochSeconds`] | `1710496800` |
//! | 2 | [`DateRule::Iso8601`] | `2024-03-15T10:00:00Z` |
//! | 3 | [`DateRule::ZoneAbbreviation`] | `2024-03-15EST10:00:00` |
//! | 4 | [`DateRule::SlashDayMonth`] | `15/03/2024 10:00` |
//! | 5 | [`DateRule::DashDayMonth`] | `15-03-2024 10:00:00` |
//! | 6 | [`DateRule::MonthDayPreamble`] | `Friday, March 15, 2024` |
//! | 7 | [`DateRule::Relative`] | `2 hours ago`, `hace 3 días` |
//! | 8 | [`DateRule::LocaleAbsolute`] | `15 marzo 2024`, `March 15 2024` |
//! | 9 | [`DateRule::SpanishLongForm`] | `15 de mar. de 2024`, `15 de marzo del 2024` |
//!
//! The order is part of the contract. Text without an explicit zone is read as UTC.

use chrono::{
    DateTime, Duration, FixedOffset, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

/// Maximum distance from "now" for a date to count as recent.
pub const RECENT_WINDOW_HOURS: i64 = 24;

/// The rule of the fallback chain that recognized a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRule {
    EpochSeconds,
    Iso8601,
    ZoneAbbreviation,
    SlashDayMonth,
    DashDayMonth,
    MonthDayPreamble,
    Relative,
    LocaleAbsolute,
    SpanishLongForm,
}

static ZONE_ABBREVIATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2})([A-Za-z]{2,5})(\d{2}:\d{2}:\d{2})$").expect("valid regex")
});

static MONTH_DAY_PREAMBLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r",\s*([A-Za-z]+)\s+(\d{1,2}),\s*(\d{4})\s*$").expect("valid regex")
});

static RELATIVE_EN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d+)\s+(minute|hour|day|week|month)s?\s+ago\b").expect("valid regex")
});

static RELATIVE_ES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bhace\s+(\d+)\s+(minutos?|horas?|d[ií]as?|semanas?|mes(?:es)?)\b")
        .expect("valid regex")
});

static SPANISH_LONG_FORM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(\d{1,2})\s+de\s+([a-záéíóú]+)\.?\s+del?\s+(\d{4})$").expect("valid regex")
});

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-záéíóúñ]+\.?").expect("valid regex"));

/// Offsets (minutes east of UTC) for zone abbreviations embedded in dates.
const ZONE_OFFSETS: &[(&str, i32)] = &[
    ("UTC", 0),
    ("GMT", 0),
    ("WET", 0),
    ("BST", 60),
    ("CET", 60),
    ("CEST", 120),
    ("EET", 120),
    ("EEST", 180),
    ("MSK", 180),
    ("IST", 330),
    ("JST", 540),
    ("AEST", 600),
    ("EST", -300),
    ("EDT", -240),
    ("CST", -360),
    ("CDT", -300),
    ("MST", -420),
    ("MDT", -360),
    ("PST", -480),
    ("PDT", -420),
    ("AKST", -540),
    ("HST", -600),
    ("ART", -180),
    ("BRT", -180),
    ("CLT", -240),
    ("COT", -300),
    ("PET", -300),
    ("VET", -240),
];

/// Spanish month names and abbreviations with their English equivalent.
const SPANISH_MONTHS: &[(&str, &str)] = &[
    ("enero", "january"),
    ("febrero", "february"),
    ("marzo", "march"),
    ("abril", "april"),
    ("mayo", "may"),
    ("junio", "june"),
    ("julio", "july"),
    ("agosto", "august"),
    ("septiembre", "september"),
    ("setiembre", "september"),
    ("octubre", "october"),
    ("noviembre", "november"),
    ("diciembre", "december"),
    ("ene", "jan"),
    ("abr", "apr"),
    ("ago", "aug"),
    ("sept", "sep"),
    ("set", "sep"),
    ("dic", "dec"),
];

const LOCALE_DATETIME_FORMATS: &[&str] = &[
    "%d %B %Y %H:%M",
    "%d %B %Y %H:%M:%S",
    "%B %d, %Y %H:%M",
    "%B %d %Y %H:%M",
    "%d %b %Y %H:%M",
    "%b %d, %Y %H:%M",
];

const LOCALE_DATE_FORMATS: &[&str] = &[
    "%d %B %Y",
    "%d %B, %Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %b %Y",
    "%b %d, %Y",
    "%b %d %Y",
];

/// `true` if `text` names a moment within 24 hours of the current time.
pub fn is_recent(text: &str) -> bool {
    is_recent_at(text, Utc::now())
}

/// Like [`is_recent`] with an explicit "now".
pub fn is_recent_at(text: &str, now: DateTime<Utc>) -> bool {
    match recognize(text, now) {
        Some((rule, ts)) => {
            let distance = (now - ts).abs();
            let recent = distance <= Duration::hours(RECENT_WINDOW_HOURS);
            debug!(date = %text, ?rule, %ts, recent, "Recognized date");
            recent
        }
        None => {
            warn!(date = %text, "Unrecognized date format; treating as not recent");
            false
        }
    }
}

/// Run the fallback chain and report which rule matched.
pub fn recognize(text: &str, now: DateTime<Utc>) -> Option<(DateRule, DateTime<Utc>)> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    RULES
        .iter()
        .find_map(|(rule, parse)| parse(text, now).map(|ts| (*rule, ts)))
}

type RuleFn = fn(&str, DateTime<Utc>) -> Option<DateTime<Utc>>;

const RULES: [(DateRule, RuleFn); 9] = [
    (DateRule::EpochSeconds, parse_epoch_seconds),
    (DateRule::Iso8601, parse_iso8601),
    (DateRule::ZoneAbbreviation, parse_zone_abbreviation),
    (DateRule::SlashDayMonth, parse_slash_day_month),
    (DateRule::DashDayMonth, parse_dash_day_month),
    (DateRule::MonthDayPreamble, parse_month_day_preamble),
    (DateRule::Relative, parse_relative),
    (DateRule::LocaleAbsolute, parse_locale_absolute),
    (DateRule::SpanishLongForm, parse_spanish_long_form),
];

fn parse_epoch_seconds(text: &str, _now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let secs: i64 = text.parse().ok()?;
    DateTime::from_timestamp(secs, 0)
}

fn parse_iso8601(text: &str, _now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%dT%H:%M%z"] {
        if let Ok(ts) = DateTime::parse_from_str(text, fmt) {
            return Some(ts.with_timezone(&Utc));
        }
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Some(ts) = parse_naive_datetime(text, fmt) {
            return Some(ts);
        }
    }
    parse_naive_date(text, "%Y-%m-%d")
}

fn parse_zone_abbreviation(text: &str, _now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let caps = ZONE_ABBREVIATION_RE.captures(text)?;
    let naive = NaiveDateTime::parse_from_str(
        &format!("{} {}", &caps[1], &caps[3]),
        "%Y-%m-%d %H:%M:%S",
    )
    .ok()?;
    let abbreviation = caps[2].to_ascii_uppercase();
    let minutes = ZONE_OFFSETS
        .iter()
        .find(|(name, _)| *name == abbreviation)
        .map(|(_, minutes)| *minutes)
        .unwrap_or_else(|| {
            debug!(%abbreviation, "Unknown zone abbreviation; assuming UTC");
            0
        });
    let offset = FixedOffset::east_opt(minutes * 60)?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|ts| ts.with_timezone(&Utc))
}

fn parse_slash_day_month(text: &str, _now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    parse_naive_datetime(text, "%d/%m/%Y %H:%M")
}

fn parse_dash_day_month(text: &str, _now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    parse_naive_datetime(text, "%d-%m-%Y %H:%M:%S")
}

fn parse_naive_datetime(text: &str, fmt: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(text, fmt)
        .ok()
        .map(|naive| naive.and_utc())
}

fn parse_naive_date(text: &str, fmt: &str) -> Option<DateTime<Utc>> {
    NaiveDate::parse_from_str(text, fmt)
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
}

fn parse_month_day_preamble(text: &str, _now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let caps = MONTH_DAY_PREAMBLE_RE.captures(text)?;
    let candidate = format!("{} {} {}", &caps[1], &caps[2], &caps[3]);
    parse_naive_date(&candidate, "%B %d %Y")
}

fn parse_relative(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let caps = RELATIVE_EN_RE
        .captures(text)
        .or_else(|| RELATIVE_ES_RE.captures(text))?;
    let amount: u32 = caps[1].parse().ok()?;
    let unit = caps[2].to_lowercase();

    if unit.starts_with("month") || unit.starts_with("mes") {
        return now.checked_sub_months(Months::new(amount));
    }
    let amount = i64::from(amount);
    let delta = if unit.starts_with("minut") {
        Duration::minutes(amount)
    } else if unit.starts_with("hour") || unit.starts_with("hora") {
        Duration::hours(amount)
    } else if unit.starts_with("week") || unit.starts_with("semana") {
        Duration::weeks(amount)
    } else {
        Duration::days(amount)
    };
    now.checked_sub_signed(delta)
}

/// Rewrite Spanish month names to English so chrono can parse them.
fn englishify_months(text: &str) -> String {
    let lower = text.to_lowercase();
    WORD_RE
        .replace_all(&lower, |caps: &regex::Captures<'_>| {
            let word = caps[0].trim_end_matches('.');
            SPANISH_MONTHS
                .iter()
                .find(|(es, _)| *es == word)
                .map(|(_, en)| (*en).to_string())
                .unwrap_or_else(|| word.to_string())
        })
        .into_owned()
}

fn parse_locale_absolute(text: &str, _now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let candidate = englishify_months(text);
    LOCALE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| parse_naive_datetime(&candidate, fmt))
        .or_else(|| {
            LOCALE_DATE_FORMATS
                .iter()
                .find_map(|fmt| parse_naive_date(&candidate, fmt))
        })
}

fn spanish_month_number(name: &str) -> Option<u32> {
    const FULL: [&str; 12] = [
        "enero",
        "febrero",
        "marzo",
        "abril",
        "mayo",
        "junio",
        "julio",
        "agosto",
        "septiembre",
        "octubre",
        "noviembre",
        "diciembre",
    ];
    let name = name.to_lowercase();
    if name == "setiembre" || name == "sept" || name == "set" {
        return Some(9);
    }
    FULL.iter()
        .position(|full| *full == name || (name.len() >= 3 && full.starts_with(name.as_str())))
        .map(|idx| idx as u32 + 1)
}

fn parse_spanish_long_form(text: &str, _now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let caps = SPANISH_LONG_FORM_RE.captures(text)?;
    let day: u32 = caps[1].parse().ok()?;
    let month = spanish_month_number(&caps[2])?;
    let year: i32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day).map(|d| d.and_time(NaiveTime::MIN).and_utc())
}
