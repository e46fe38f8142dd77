//! Deterministic, salt-keyed pseudonymization
//!
//! Every pseudonym derives from `HMAC-SHA256(salt, "<tag>:<value>")`. The
//! salt is a per-deployment secret, so the same logical patient or study
//! maps to the same pseudonym everywhere it recurs (required for
//! series/study linkage downstream) while remaining infeasible to invert
//! without the salt.
//!
//! Date and time values are shifted rather than replaced, keeping relative
//! plausibility: dates move by at most 365 days in either direction, times
//! by at most 12 hours with mod-24h wraparound. A value that does not parse
//! degrades to an `ANON_DATE_*` / `ANON_TIME_*` marker instead of failing
//! the batch.

use crate::anonymization::classify::TagClass;
use crate::config::SecretString;
use crate::domain::Tag;
use chrono::{Duration, NaiveDate};
use hmac::{Hmac, Mac};
use secrecy::ExposeSecret;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const SECONDS_PER_DAY: i64 = 86_400;

/// Keyed pseudonymizer holding the deployment salt and UID root
pub struct Pseudonymizer {
    salt: SecretString,
    uid_root: String,
}

impl Pseudonymizer {
    pub fn new(salt: SecretString, uid_root: impl Into<String>) -> Self {
        Self {
            salt,
            uid_root: uid_root.into(),
        }
    }

    /// Computes the pseudonym for a tag/value pair, dispatched by class
    pub fn pseudonymize(&self, tag: &Tag, value: &str, class: TagClass) -> String {
        let digest = self.digest_hex(tag, value);

        match class {
            TagClass::Identifier => format!("{}{}", self.uid_root, &digest[..16]),
            TagClass::Date => shift_date(value, &digest)
                .unwrap_or_else(|| format!("ANON_DATE_{}", digest[..8].to_uppercase())),
            TagClass::Time => shift_time(value, &digest)
                .unwrap_or_else(|| format!("ANON_TIME_{}", digest[..6].to_uppercase())),
            TagClass::Generic => format!("ANON_{}", digest[..8].to_uppercase()),
        }
    }

    /// Root prefix used for replacement identifiers
    pub fn uid_root(&self) -> &str {
        &self.uid_root
    }

    /// Hex-encoded HMAC-SHA256 over `"<tag>:<value>"`, keyed by the salt
    fn digest_hex(&self, tag: &Tag, value: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.salt.expose_secret().as_ref().as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(tag.to_string().as_bytes());
        mac.update(b":");
        mac.update(value.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

/// Shifts a `YYYYMMDD` date by a digest-derived offset in [-365, +364] days
///
/// Returns `None` on parse failure or calendar overflow; the caller
/// degrades to the generic date marker.
fn shift_date(value: &str, digest: &str) -> Option<String> {
    if value.len() != 8 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let date = NaiveDate::parse_from_str(value, "%Y%m%d").ok()?;

    let offset_days = (hex_u32(&digest[0..8])? % 730) as i64 - 365;
    let shifted = date.checked_add_signed(Duration::days(offset_days))?;

    Some(shifted.format("%Y%m%d").to_string())
}

/// Shifts an `HHMMSS[.ffffff]` time by a digest-derived offset of up to
/// ±12h, wrapping modulo 24h and preserving any fractional suffix
fn shift_time(value: &str, digest: &str) -> Option<String> {
    let (base, fraction) = match value.split_once('.') {
        Some((base, frac)) => (base, Some(frac)),
        None => (value, None),
    };

    if let Some(frac) = fraction {
        if frac.is_empty() || frac.len() > 6 || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
    }
    let seconds = parse_seconds_of_day(base)?;

    let offset_seconds = (hex_u32(&digest[8..16])? % 86_400) as i64 - 43_200;
    let shifted = wrap_seconds(seconds + offset_seconds);

    let formatted = format!(
        "{:02}{:02}{:02}",
        shifted / 3600,
        (shifted % 3600) / 60,
        shifted % 60
    );
    Some(match fraction {
        Some(frac) => format!("{formatted}.{frac}"),
        None => formatted,
    })
}

/// Parses a strict 6-digit `HHMMSS` into seconds of day
fn parse_seconds_of_day(base: &str) -> Option<i64> {
    if base.len() != 6 || !base.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i64 = base[0..2].parse().ok()?;
    let minutes: i64 = base[2..4].parse().ok()?;
    let seconds: i64 = base[4..6].parse().ok()?;
    if hours > 23 || minutes > 59 || seconds > 59 {
        return None;
    }
    Some(hours * 3600 + minutes * 60 + seconds)
}

/// Wraps a possibly negative seconds-of-day value into [0, 86400)
fn wrap_seconds(seconds: i64) -> i64 {
    seconds.rem_euclid(SECONDS_PER_DAY)
}

fn hex_u32(hex: &str) -> Option<u32> {
    u32::from_str_radix(hex, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::secret_string;
    use crate::domain::tags;

    fn pseudonymizer(salt: &str) -> Pseudonymizer {
        Pseudonymizer::new(secret_string(salt.to_string()), "2.25.")
    }

    #[test]
    fn test_deterministic_for_same_input() {
        let p = pseudonymizer("salt-a");
        let a = p.pseudonymize(&tags::PATIENT_NAME, "John Smith", TagClass::Generic);
        let b = p.pseudonymize(&tags::PATIENT_NAME, "John Smith", TagClass::Generic);
        assert_eq!(a, b);
    }

    #[test]
    fn test_salt_changes_output() {
        let a = pseudonymizer("salt-a").pseudonymize(
            &tags::PATIENT_NAME,
            "John Smith",
            TagClass::Generic,
        );
        let b = pseudonymizer("salt-b").pseudonymize(
            &tags::PATIENT_NAME,
            "John Smith",
            TagClass::Generic,
        );
        assert_ne!(a, b);
    }

    #[test]
    fn test_value_changes_output() {
        let p = pseudonymizer("salt-a");
        let a = p.pseudonymize(&tags::PATIENT_NAME, "John Smith", TagClass::Generic);
        let b = p.pseudonymize(&tags::PATIENT_NAME, "Jane Smith", TagClass::Generic);
        assert_ne!(a, b);
    }

    #[test]
    fn test_tag_participates_in_digest() {
        let p = pseudonymizer("salt-a");
        let a = p.pseudonymize(&tags::PATIENT_NAME, "X", TagClass::Generic);
        let b = p.pseudonymize(&tags::PATIENT_ID, "X", TagClass::Generic);
        assert_ne!(a, b);
    }

    #[test]
    fn test_generic_marker_shape() {
        let p = pseudonymizer("salt-a");
        let out = p.pseudonymize(&tags::PATIENT_NAME, "John Smith", TagClass::Generic);
        assert!(out.starts_with("ANON_"));
        assert_eq!(out.len(), "ANON_".len() + 8);
        assert!(out["ANON_".len()..]
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn test_identifier_keeps_root_and_16_hex() {
        let p = pseudonymizer("salt-a");
        let out = p.pseudonymize(&tags::STUDY_INSTANCE_UID, "1.2.3.999", TagClass::Identifier);
        assert!(out.starts_with("2.25."));
        let suffix = &out["2.25.".len()..];
        assert_eq!(suffix.len(), 16);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_date_shift_within_bounds() {
        let p = pseudonymizer("salt-a");
        let out = p.pseudonymize(&tags::STUDY_DATE, "20240115", TagClass::Date);

        let original = NaiveDate::parse_from_str("20240115", "%Y%m%d").unwrap();
        let shifted = NaiveDate::parse_from_str(&out, "%Y%m%d").unwrap();
        let delta = (shifted - original).num_days();
        assert!(delta.abs() <= 365, "shift of {delta} days out of range");
    }

    #[test]
    fn test_date_shift_deterministic() {
        let p = pseudonymizer("salt-a");
        let a = p.pseudonymize(&tags::STUDY_DATE, "20240115", TagClass::Date);
        let b = p.pseudonymize(&tags::STUDY_DATE, "20240115", TagClass::Date);
        assert_eq!(a, b);
    }

    #[test]
    fn test_date_parse_failure_degrades_to_marker() {
        let p = pseudonymizer("salt-a");
        let out = p.pseudonymize(&tags::STUDY_DATE, "not-a-date", TagClass::Date);
        assert!(out.starts_with("ANON_DATE_"));
        assert_eq!(out.len(), "ANON_DATE_".len() + 8);
    }

    #[test]
    fn test_date_invalid_calendar_day_degrades() {
        let p = pseudonymizer("salt-a");
        let out = p.pseudonymize(&tags::STUDY_DATE, "20240230", TagClass::Date);
        assert!(out.starts_with("ANON_DATE_"));
    }

    #[test]
    fn test_time_shift_within_12_hours() {
        let p = pseudonymizer("salt-a");
        let out = p.pseudonymize(&tags::STUDY_TIME, "101530", TagClass::Time);

        let original = parse_seconds_of_day("101530").unwrap();
        let shifted = parse_seconds_of_day(&out).unwrap();
        // Circular distance on the 24h clock
        let diff = (shifted - original).rem_euclid(SECONDS_PER_DAY);
        let circular = diff.min(SECONDS_PER_DAY - diff);
        assert!(circular <= 43_200, "shift of {circular}s out of range");
    }

    #[test]
    fn test_time_preserves_fractional_suffix() {
        let p = pseudonymizer("salt-a");
        let out = p.pseudonymize(&tags::STUDY_TIME, "101530.250000", TagClass::Time);
        assert!(out.ends_with(".250000"), "fraction dropped: {out}");
        assert_eq!(out.len(), 6 + 1 + 6);
    }

    #[test]
    fn test_time_parse_failure_degrades_to_marker() {
        let p = pseudonymizer("salt-a");
        for bad in ["25:00:00", "999999", "12345", "1015", "101530.", "101530.abc"] {
            let out = p.pseudonymize(&tags::STUDY_TIME, bad, TagClass::Time);
            assert!(out.starts_with("ANON_TIME_"), "expected marker for {bad:?}, got {out}");
            assert_eq!(out.len(), "ANON_TIME_".len() + 6);
        }
    }

    #[test]
    fn test_wrap_seconds_forward_past_midnight() {
        // 23:50:00 shifted +20min wraps to 00:10:00
        let base = parse_seconds_of_day("235000").unwrap();
        assert_eq!(wrap_seconds(base + 1200), 600);
    }

    #[test]
    fn test_wrap_seconds_backward_past_midnight() {
        // 00:10:00 shifted -20min wraps to 23:50:00
        let base = parse_seconds_of_day("001000").unwrap();
        assert_eq!(wrap_seconds(base - 1200), parse_seconds_of_day("235000").unwrap());
    }

    #[test]
    fn test_parse_seconds_of_day_ranges() {
        assert_eq!(parse_seconds_of_day("000000"), Some(0));
        assert_eq!(parse_seconds_of_day("235959"), Some(86_399));
        assert_eq!(parse_seconds_of_day("240000"), None);
        assert_eq!(parse_seconds_of_day("006000"), None);
        assert_eq!(parse_seconds_of_day("000060"), None);
    }
}
