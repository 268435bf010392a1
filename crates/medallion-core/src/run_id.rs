//! Run identity: `YYYYMMDD_HHMMSS_#<suffix>`
//!
//! A Bronze run gets a freshly generated suffix. Silver and Gold runs keep
//! their parent's suffix and re-stamp the timestamp, so one logical run can
//! be followed across all three layers by its suffix alone.

use crate::errors::{PipelineError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike, Utc};
use std::fmt;
use std::str::FromStr;

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const TIMESTAMP_LEN: usize = 15;
const SUFFIX_SEPARATOR: &str = "_#";
const SUFFIX_MIN: usize = 6;
const SUFFIX_MAX: usize = 32;
const GENERATED_SUFFIX_LEN: usize = 8;

/// Parsed run identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunId {
    timestamp: NaiveDateTime,
    suffix: String,
}

impl RunId {
    /// Parse and validate a run id string.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::InvalidRunId` when the id contains a path
    /// separator, is `.`/`..`, has a malformed or impossible timestamp, or a
    /// suffix outside 6-32 alphanumeric characters.
    pub fn parse(id: &str) -> Result<Self> {
        let invalid = |reason: &str| PipelineError::InvalidRunId {
            run_id: id.to_string(),
            reason: reason.to_string(),
        };

        if id == "." || id == ".." || id.contains('/') || id.contains('\\') {
            return Err(invalid("run id must not contain path components"));
        }

        let (stamp, suffix) = id
            .split_once(SUFFIX_SEPARATOR)
            .ok_or_else(|| invalid("missing '_#' separator"))?;

        let well_formed = stamp.len() == TIMESTAMP_LEN
            && stamp.char_indices().all(|(i, c)| {
                if i == 8 {
                    c == '_'
                } else {
                    c.is_ascii_digit()
                }
            });
        if !well_formed {
            return Err(invalid("timestamp must be YYYYMMDD_HHMMSS"));
        }
        let field =
            |range: std::ops::Range<usize>| stamp[range].parse::<u32>().unwrap_or(u32::MAX);
        let timestamp = NaiveDate::from_ymd_opt(field(0..4) as i32, field(4..6), field(6..8))
            .and_then(|date| date.and_hms_opt(field(9..11), field(11..13), field(13..15)))
            .ok_or_else(|| invalid("timestamp is not a valid calendar date and time"))?;

        if suffix.len() < SUFFIX_MIN
            || suffix.len() > SUFFIX_MAX
            || !suffix.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(invalid("suffix must be 6-32 alphanumeric characters"));
        }

        Ok(Self {
            timestamp,
            suffix: suffix.to_string(),
        })
    }

    /// Fresh id stamped at `now` with a random 8-hex-char suffix.
    pub fn generate(now: DateTime<Utc>) -> Self {
        let simple = uuid::Uuid::new_v4().simple().to_string();
        Self {
            timestamp: truncate_to_seconds(now),
            suffix: simple[..GENERATED_SUFFIX_LEN].to_string(),
        }
    }

    /// Child id for a downstream layer: `now`'s timestamp with this id's suffix.
    pub fn derive(&self, now: DateTime<Utc>) -> Self {
        Self {
            timestamp: truncate_to_seconds(now),
            suffix: self.suffix.clone(),
        }
    }

    /// Execution timestamp encoded in the id
    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    /// Lineage suffix shared by every layer of one logical run
    pub fn suffix(&self) -> &str {
        &self.suffix
    }
}

/// Derive a child run id from a parent id string.
///
/// # Errors
///
/// Returns `PipelineError::InvalidRunId` if `parent` is not a valid run id.
pub fn derive(parent: &str, now: DateTime<Utc>) -> Result<RunId> {
    Ok(RunId::parse(parent)?.derive(now))
}

/// Pick the lexicographically greatest valid run id among directory names.
///
/// Names that do not parse are ignored. The fixed-width timestamp prefix
/// makes lexicographic order chronological.
pub fn select_latest<'a, I>(names: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    names
        .into_iter()
        .filter(|name| RunId::parse(name).is_ok())
        .max()
        .map(str::to_string)
}

fn truncate_to_seconds(now: DateTime<Utc>) -> NaiveDateTime {
    let naive = now.naive_utc();
    naive.with_nanosecond(0).unwrap_or(naive)
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            SUFFIX_SEPARATOR,
            self.suffix
        )
    }
}

impl FromStr for RunId {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        RunId::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_derive_keeps_suffix_and_restamps() {
        let child = derive("20240102_030405_#abcdef12", at(2024, 3, 4, 5, 6, 7)).unwrap();
        assert_eq!(child.to_string(), "20240304_050607_#abcdef12");
    }

    #[test]
    fn test_derive_rejects_invalid_parent() {
        let err = derive("not-a-run", at(2024, 3, 4, 5, 6, 7)).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidRunId { .. }));
    }

    #[test]
    fn test_parse_round_trips_display() {
        let id = RunId::parse("20240102_030405_#ABCdef99").unwrap();
        assert_eq!(id.suffix(), "ABCdef99");
        assert_eq!(id.to_string(), "20240102_030405_#ABCdef99");
    }

    #[test]
    fn test_parse_rejects_bad_shapes() {
        for bad in [
            "",
            ".",
            "..",
            "20240102_030405_#ab/cdef",
            "20240102_030405_#ab\\cdef",
            "20240102_030405_abcdef",
            "2024012_030405_#abcdef",
            "20240102-030405_#abcdef",
            "20240102_030405_#abc",
            "20240102_030405_#abc-def",
            "20240102_030405_#0123456789abcdef0123456789abcdef0",
            "20241302_030405_#abcdef",
            "20240230_030405_#abcdef",
            "20240102_250405_#abcdef",
        ] {
            assert!(RunId::parse(bad).is_err(), "expected {:?} to be rejected", bad);
        }
    }

    #[test]
    fn test_generate_has_eight_char_suffix() {
        let id = RunId::generate(at(2025, 1, 2, 3, 4, 5));
        assert_eq!(id.suffix().len(), 8);
        assert!(id.to_string().starts_with("20250102_030405_#"));
        assert!(RunId::parse(&id.to_string()).is_ok());
    }

    #[test]
    fn test_generate_suffixes_differ() {
        let now = at(2025, 1, 2, 3, 4, 5);
        assert_ne!(RunId::generate(now).suffix(), RunId::generate(now).suffix());
    }

    #[test]
    fn test_select_latest_ignores_non_matching() {
        let names = [
            "20240101_000000_#aaaaaa",
            "_state",
            "20240301_000000_#bbbbbb",
            "zzz_not_a_run",
            "20240201_000000_#cccccc",
        ];
        assert_eq!(
            select_latest(names.iter().copied()),
            Some("20240301_000000_#bbbbbb".to_string())
        );
        assert_eq!(select_latest(["_state"].iter().copied()), None);
    }

    proptest! {
        #[test]
        fn prop_derive_preserves_suffix(
            suffix in "[a-zA-Z0-9]{6,32}",
            secs in 0i64..4_000_000_000i64,
        ) {
            let parent = format!("20240102_030405_#{}", suffix);
            let now = Utc.timestamp_opt(secs, 0).unwrap();
            let child = derive(&parent, now).unwrap();
            prop_assert_eq!(child.suffix(), suffix.as_str());
            let reparsed = RunId::parse(&child.to_string()).unwrap();
            prop_assert_eq!(reparsed, child);
        }
    }
}
