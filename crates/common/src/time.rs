//! A single comparable instant for both timestamp encodings in play.
//!
//! Slack reports message times as fractional Unix epoch strings
//! (`"1563305596.004500"`), while the Keybase body carries a human readable
//! local-time string (`"2019-07-16 21:33:16.0045 +0200 CEST"`). Both parse
//! into [`Timestamp`], which keeps microsecond precision so that either
//! rendering parses back to the same instant.

use std::{fmt, str::FromStr, sync::RwLock};

use {
    chrono::{DateTime, TimeDelta, Utc},
    chrono_tz::Tz,
};

use crate::error::{Error, Result};

/// Date and clock part of the local-time rendering.
const LOCAL_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse layout for the local-time rendering without its zone abbreviation.
const LOCAL_PARSE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f %z";

static DISPLAY_TZ: RwLock<Tz> = RwLock::new(Tz::UTC);

/// Set the zone used by [`Timestamp::to_local`] and the `Display` impl.
pub fn set_display_timezone(tz: Tz) {
    let mut guard = DISPLAY_TZ.write().unwrap_or_else(|e| e.into_inner());
    *guard = tz;
}

/// Zone currently used for local-time renderings.
pub fn display_timezone() -> Tz {
    *DISPLAY_TZ.read().unwrap_or_else(|e| e.into_inner())
}

/// An absolute instant with microsecond precision.
///
/// Equality and ordering compare the instant only; the zone a value was
/// parsed from is not retained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Parse a fractional Unix epoch string or a local-time string.
    ///
    /// Epoch input is tried first. The fractional part is rounded to six
    /// digits.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        parse_epoch(trimmed)
            .or_else(|| parse_local(trimmed))
            .ok_or_else(|| Error::invalid_timestamp(raw))
    }

    /// Build from whole Unix seconds plus a microsecond remainder.
    pub fn from_unix(secs: i64, micros: u32) -> Option<Self> {
        DateTime::from_timestamp(secs, micros.checked_mul(1_000)?).map(Self)
    }

    /// Wrap a chrono instant, rounding it to the nearest microsecond.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        let micros = dt.timestamp() * 1_000_000
            + i64::from(dt.timestamp_subsec_nanos().saturating_add(500) / 1_000);
        Self(DateTime::from_timestamp_micros(micros).unwrap_or(dt))
    }

    /// True for the zero instant (Unix epoch), the value of `Timestamp::default()`.
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }

    /// Shift the instant by `delta`, saturating at the representable range.
    #[must_use]
    pub fn shift(self, delta: TimeDelta) -> Self {
        self.0.checked_add_signed(delta).map_or(self, Self::from_datetime)
    }

    /// Unix time in whole seconds, e.g. `"1563305596"`.
    pub fn to_epoch_seconds(&self) -> String {
        self.0.timestamp().to_string()
    }

    /// Unix time with a six digit fraction, e.g. `"1563305596.004500"`.
    pub fn to_epoch_fractional(&self) -> String {
        let secs = self.0.timestamp();
        let micros = self.0.timestamp_subsec_micros();
        if secs < 0 && micros > 0 {
            // chrono floors negative instants; print the truncated form instead.
            format!("-{}.{:06}", -(secs + 1), 1_000_000 - micros)
        } else {
            format!("{secs}.{micros:06}")
        }
    }

    /// Local-time rendering in the configured display zone,
    /// e.g. `"2019-07-16 21:33:16.0045 +0200 CEST"`.
    pub fn to_local(&self) -> String {
        self.to_local_in(display_timezone())
    }

    /// Local-time rendering in an explicit zone.
    ///
    /// The fraction is printed without trailing zeros and omitted entirely
    /// on whole seconds.
    pub fn to_local_in(&self, tz: Tz) -> String {
        let local = self.0.with_timezone(&tz);
        let mut out = local.format(LOCAL_DATETIME_FORMAT).to_string();
        let nanos = local.timestamp_subsec_nanos();
        if nanos > 0 {
            let fraction = format!("{nanos:09}");
            out.push('.');
            out.push_str(fraction.trim_end_matches('0'));
        }
        out.push_str(&local.format(" %z %Z").to_string());
        out
    }
}

fn parse_epoch(raw: &str) -> Option<Timestamp> {
    let (negative, unsigned) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }
    let mut secs: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let mut micros = fraction_micros(fraction);
    if micros == 1_000_000 {
        secs = secs.checked_add(1)?;
        micros = 0;
    }
    if negative && micros > 0 {
        // "-1.25" is a quarter second before "-1".
        secs = secs.checked_add(1)?;
        micros = 1_000_000 - micros;
    }
    if negative {
        secs = secs.checked_neg()?;
    }
    Timestamp::from_unix(secs, micros)
}

/// Six digit microsecond value of a fraction's digits, rounded half up on
/// the seventh. May return exactly one second.
fn fraction_micros(digits: &str) -> u32 {
    let micros = digits
        .bytes()
        .chain(std::iter::repeat(b'0'))
        .take(6)
        .fold(0, |acc, b| acc * 10 + u32::from(b - b'0'));
    match digits.as_bytes().get(6) {
        Some(d) if *d >= b'5' => micros + 1,
        _ => micros,
    }
}

fn parse_local(raw: &str) -> Option<Timestamp> {
    let mut fields = raw.split_whitespace();
    let date = fields.next()?;
    let clock = fields.next()?;
    let offset = fields.next()?;
    // Zone abbreviations are ambiguous; the numeric offset decides the instant.
    let _zone = fields.next();
    if fields.next().is_some() {
        return None;
    }
    let joined = format!("{date} {clock} {offset}");
    DateTime::parse_from_str(&joined, LOCAL_PARSE_FORMAT)
        .ok()
        .map(|dt| Timestamp::from_datetime(dt.with_timezone(&Utc)))
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_local())
    }
}

impl FromStr for Timestamp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::from_datetime(dt)
    }
}
