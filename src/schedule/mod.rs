pub mod countdown;
pub mod scheduler;

use std::{fmt, str::FromStr};

use anyhow::{anyhow, bail, Result};
use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

pub use countdown::Countdown;
pub use scheduler::ChallengeScheduler;

pub const PRE_COUNTDOWN_SECS: u32 = 20;
pub const COUNTDOWN_SECS: u32 = 5;

/// Time of day a challenge is scheduled for.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledTime {
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl ScheduledTime {
    pub fn new(hours: u32, minutes: u32, seconds: u32) -> Result<Self> {
        let time = Self {
            hours,
            minutes,
            seconds,
        };
        if !time.is_valid() {
            bail!("invalid challenge time {time}");
        }
        Ok(time)
    }

    /// Build from the three input fields. Each must be at most two digits;
    /// an empty field counts as zero.
    pub fn from_fields(hours: &str, minutes: &str, seconds: &str) -> Result<Self> {
        Self::new(
            parse_field(hours, "hours")?,
            parse_field(minutes, "minutes")?,
            parse_field(seconds, "seconds")?,
        )
    }

    pub fn is_valid(&self) -> bool {
        self.hours < 24 && self.minutes < 60 && self.seconds < 60
    }

    pub fn to_naive_time(&self) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(self.hours, self.minutes, self.seconds)
    }

    /// Today at this time, or tomorrow if that moment has already passed.
    pub fn next_occurrence(&self, now: NaiveDateTime) -> Result<NaiveDateTime> {
        let time = self
            .to_naive_time()
            .ok_or_else(|| anyhow!("invalid challenge time {self}"))?;

        let today = now.date().and_time(time);
        if today < now {
            Ok(today + Duration::days(1))
        } else {
            Ok(today)
        }
    }
}

fn parse_field(raw: &str, field: &str) -> Result<u32> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0);
    }
    if raw.len() > 2 || !raw.chars().all(|c| c.is_ascii_digit()) {
        bail!("{field} must be at most two digits, got {raw:?}");
    }
    Ok(raw.parse()?)
}

impl fmt::Display for ScheduledTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
    }
}

impl FromStr for ScheduledTime {
    type Err = anyhow::Error;

    /// Accepts `HH:MM:SS`, `HH:MM` or `HH`.
    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.trim().split(':');
        let hours = parts.next().unwrap_or_default();
        let minutes = parts.next().unwrap_or_default();
        let seconds = parts.next().unwrap_or_default();
        if parts.next().is_some() {
            bail!("expected HH:MM:SS, got {s:?}");
        }
        Self::from_fields(hours, minutes, seconds)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "state")]
pub enum ChallengeStatus {
    Waiting { seconds_until: u64 },
    PreCountdown { seconds: u32 },
    Started,
}

pub fn status_at(
    scheduled: NaiveDateTime,
    now: NaiveDateTime,
    pre_countdown_secs: u32,
) -> ChallengeStatus {
    let seconds_until = (scheduled - now).num_seconds();
    if seconds_until <= 0 {
        ChallengeStatus::Started
    } else if seconds_until <= i64::from(pre_countdown_secs) {
        ChallengeStatus::PreCountdown {
            seconds: seconds_until as u32,
        }
    } else {
        ChallengeStatus::Waiting {
            seconds_until: seconds_until as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 15)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn parses_and_validates_fields() {
        let time = ScheduledTime::from_fields("9", "05", "").unwrap();
        assert_eq!(time, ScheduledTime { hours: 9, minutes: 5, seconds: 0 });
        assert_eq!(time.to_string(), "09:05:00");

        assert!(ScheduledTime::from_fields("24", "0", "0").is_err());
        assert!(ScheduledTime::from_fields("1", "60", "0").is_err());
        assert!(ScheduledTime::from_fields("123", "0", "0").is_err());
        assert!(ScheduledTime::from_fields("1a", "0", "0").is_err());
    }

    #[test]
    fn parses_colon_separated_input() {
        assert_eq!(
            "23:59:30".parse::<ScheduledTime>().unwrap(),
            ScheduledTime { hours: 23, minutes: 59, seconds: 30 }
        );
        assert_eq!(
            "7:30".parse::<ScheduledTime>().unwrap(),
            ScheduledTime { hours: 7, minutes: 30, seconds: 0 }
        );
        assert!("1:2:3:4".parse::<ScheduledTime>().is_err());
    }

    #[test]
    fn next_occurrence_rolls_over_to_tomorrow() {
        let time = ScheduledTime::new(8, 0, 0).unwrap();
        assert_eq!(time.next_occurrence(at(7, 0, 0)).unwrap(), at(8, 0, 0));
        assert_eq!(time.next_occurrence(at(8, 0, 0)).unwrap(), at(8, 0, 0));
        assert_eq!(
            time.next_occurrence(at(9, 0, 0)).unwrap(),
            at(8, 0, 0) + Duration::days(1)
        );
    }

    #[test]
    fn status_moves_from_waiting_to_pre_countdown_to_started() {
        let scheduled = at(12, 0, 0);
        assert_eq!(
            status_at(scheduled, at(11, 59, 0), 20),
            ChallengeStatus::Waiting { seconds_until: 60 }
        );
        assert_eq!(
            status_at(scheduled, at(11, 59, 40), 20),
            ChallengeStatus::PreCountdown { seconds: 20 }
        );
        assert_eq!(
            status_at(scheduled, at(11, 59, 59), 20),
            ChallengeStatus::PreCountdown { seconds: 1 }
        );
        assert_eq!(status_at(scheduled, at(12, 0, 0), 20), ChallengeStatus::Started);
        assert_eq!(status_at(scheduled, at(12, 5, 0), 20), ChallengeStatus::Started);
    }
}
