//! Archive filename generation.
//!
//! Format: `<unix-seconds>.M<microseconds>P<random>.<host-tag>`, the maildir
//! unique-name layout, so archived files can be dropped into any maildir.
//!
//! The clock only has millisecond resolution here; the microsecond field is
//! the millisecond remainder multiplied by 1000. Uniqueness rests on time plus
//! a random draw and is not guaranteed.

use std::fmt::{Display, Formatter, Result as FmtResult};

use chrono::{DateTime, Utc};
use rand::Rng;

/// Fixed tag for the execution environment. Not a hostname.
pub const HOST_TAG: &str = "mailkeep-archiver";

const RANDOM_MAX: u32 = 999_999;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArchiveFilename(String);

impl ArchiveFilename {
    /// Generate a filename from the current wall-clock time and a random draw.
    pub fn generate() -> Self {
        let random = rand::rng().random_range(0..=RANDOM_MAX);
        Self::from_parts(Utc::now(), random)
    }

    fn from_parts(now: DateTime<Utc>, random: u32) -> Self {
        let millis = now.timestamp_millis();
        let seconds = millis.div_euclid(1000);
        let micros = millis.rem_euclid(1000) * 1000;
        ArchiveFilename(format!("{}.M{}P{}.{}", seconds, micros, random, HOST_TAG))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ArchiveFilename {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ArchiveFilename {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use regex::Regex;

    fn pattern() -> Regex {
        Regex::new(r"^\d+\.M\d+P\d{1,6}\.[A-Za-z0-9-]+$").unwrap()
    }

    #[test]
    fn generated_names_match_maildir_layout() {
        let re = pattern();
        for _ in 0..1000 {
            let name = ArchiveFilename::generate();
            assert!(re.is_match(name.as_str()), "bad filename: {}", name);
        }
    }

    #[test]
    fn microseconds_come_from_millisecond_clock() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let name = ArchiveFilename::from_parts(now, 42);
        assert_eq!(name.as_str(), "1700000000.M123000P42.mailkeep-archiver");
    }

    #[test]
    fn whole_second_has_zero_microseconds() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let name = ArchiveFilename::from_parts(now, RANDOM_MAX);
        assert_eq!(name.as_str(), "1700000000.M0P999999.mailkeep-archiver");
    }

    #[test]
    fn rapid_generation_is_almost_always_distinct() {
        let names: std::collections::HashSet<_> =
            (0..100).map(|_| ArchiveFilename::generate()).collect();
        // Collisions are possible in principle; 100 draws from 10^6 values per
        // millisecond make more than a couple vanishingly unlikely.
        assert!(names.len() >= 98);
    }
}
