use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::NoozeError;
use crate::models::WakeTime;

pub const DAY_KEY_FORMAT: &str = "%Y-%m-%d";

// ─── DayKey ──────────────────────────────────────────────────────────────────

/// A calendar date with the time of day discarded. Ordering is chronological,
/// which is also the lexicographic order of the `YYYY-MM-DD` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DayKey(NaiveDate);

impl DayKey {
    pub fn parse(s: &str) -> Result<Self, NoozeError> {
        let trimmed = s.trim();
        // chrono accepts unpadded fields; the canonical form does not.
        if trimmed.len() != 10 {
            return Err(NoozeError::MalformedDate(s.to_string()));
        }
        NaiveDate::parse_from_str(trimmed, DAY_KEY_FORMAT)
            .map(DayKey)
            .map_err(|_| NoozeError::MalformedDate(s.to_string()))
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self, NoozeError> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(DayKey)
            .ok_or_else(|| {
                NoozeError::MalformedDate(format!("{:04}-{:02}-{:02}", year, month, day))
            })
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    pub fn midnight(&self) -> NaiveDateTime {
        self.0.and_time(chrono::NaiveTime::MIN)
    }

    pub fn succ(&self) -> Option<Self> {
        self.0.succ_opt().map(DayKey)
    }

    pub fn pred(&self) -> Option<Self> {
        self.0.pred_opt().map(DayKey)
    }
}

impl std::fmt::Display for DayKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format(DAY_KEY_FORMAT))
    }
}

impl FromStr for DayKey {
    type Err = NoozeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DayKey {
    type Error = NoozeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DayKey> for String {
    fn from(value: DayKey) -> Self {
        value.to_string()
    }
}

impl From<NaiveDate> for DayKey {
    fn from(value: NaiveDate) -> Self {
        DayKey(value)
    }
}

/// Anything that can be normalized to the local calendar day it falls on.
pub trait IntoDayKey {
    fn into_day_key(self) -> Result<DayKey, NoozeError>;
}

impl IntoDayKey for DayKey {
    fn into_day_key(self) -> Result<DayKey, NoozeError> {
        Ok(self)
    }
}

impl IntoDayKey for NaiveDate {
    fn into_day_key(self) -> Result<DayKey, NoozeError> {
        Ok(DayKey(self))
    }
}

impl IntoDayKey for NaiveDateTime {
    fn into_day_key(self) -> Result<DayKey, NoozeError> {
        Ok(DayKey(self.date()))
    }
}

impl<Tz: TimeZone> IntoDayKey for DateTime<Tz> {
    /// Uses the date in the instant's own offset, i.e. its local calendar day.
    fn into_day_key(self) -> Result<DayKey, NoozeError> {
        Ok(DayKey(self.naive_local().date()))
    }
}

impl IntoDayKey for &str {
    fn into_day_key(self) -> Result<DayKey, NoozeError> {
        DayKey::parse(self)
    }
}

// ─── DayStatus ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayStatus {
    Completed,
    Missed,
    Pending,
}

impl DayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DayStatus::Completed => "completed",
            DayStatus::Missed => "missed",
            DayStatus::Pending => "pending",
        }
    }
}

impl std::fmt::Display for DayStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DayStatus {
    type Err = NoozeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "completed" | "done" => Ok(DayStatus::Completed),
            "missed" => Ok(DayStatus::Missed),
            "pending" => Ok(DayStatus::Pending),
            _ => Err(NoozeError::UnknownStatus(s.to_string())),
        }
    }
}

// ─── Ledger entries ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeLogEntry {
    pub date_key: DayKey,
    pub status: DayStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_wake_time: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solved_math: Option<bool>,
}

/// Optional details recorded alongside a day's status.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkInfo {
    pub actual_wake_time: Option<DateTime<FixedOffset>>,
    pub solved_math: Option<bool>,
}

// ─── Challenge ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum ChallengeDuration {
    Days90,
    #[default]
    Days365,
}

impl ChallengeDuration {
    pub fn days(&self) -> u32 {
        match self {
            ChallengeDuration::Days90 => 90,
            ChallengeDuration::Days365 => 365,
        }
    }
}

impl TryFrom<u32> for ChallengeDuration {
    type Error = NoozeError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            90 => Ok(ChallengeDuration::Days90),
            365 => Ok(ChallengeDuration::Days365),
            other => Err(NoozeError::InvalidDuration(other)),
        }
    }
}

impl From<ChallengeDuration> for u32 {
    fn from(value: ChallengeDuration) -> Self {
        value.days()
    }
}

/// What the user said about themselves when signing up for a challenge.
/// Free text, empty when skipped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChallengeProfile {
    pub motivation: String,
    pub activities: Vec<String>,
    pub past_experience: String,
    pub obstacle: String,
    pub routine_rating: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: i64,
    pub wake_up_time: WakeTime,
    pub duration: ChallengeDuration,
    pub start_date: DayKey,
    pub active: bool,
    #[serde(flatten)]
    pub profile: ChallengeProfile,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    #[test]
    fn day_key_discards_time_of_day() {
        let morning = NaiveDate::from_ymd_opt(2024, 1, 3)
            .unwrap()
            .and_time(NaiveTime::from_hms_opt(5, 0, 0).unwrap());
        let night = NaiveDate::from_ymd_opt(2024, 1, 3)
            .unwrap()
            .and_time(NaiveTime::from_hms_opt(23, 59, 0).unwrap());
        assert_eq!(morning.into_day_key().unwrap(), night.into_day_key().unwrap());
        assert_eq!(morning.into_day_key().unwrap().to_string(), "2024-01-03");
    }

    #[test]
    fn day_key_rejects_invalid_calendar_dates() {
        assert!(matches!(DayKey::parse("2024-02-30"), Err(NoozeError::MalformedDate(_))));
        assert!(DayKey::parse("2024-1-3").is_err());
        assert!(DayKey::parse("yesterday").is_err());
        assert!(DayKey::from_ymd(2023, 2, 29).is_err());
        assert!(DayKey::parse("2024-02-29").is_ok());
    }

    #[test]
    fn day_key_order_matches_string_order() {
        let a = DayKey::parse("2023-12-31").unwrap();
        let b = DayKey::parse("2024-01-01").unwrap();
        let c = DayKey::parse("2024-01-10").unwrap();
        assert!(a < b && b < c);
        assert!(a.to_string() < b.to_string() && b.to_string() < c.to_string());
    }

    #[test]
    fn offset_datetime_uses_its_local_day() {
        let tz = FixedOffset::east_opt(5 * 3600).unwrap();
        let instant = tz.with_ymd_and_hms(2024, 1, 4, 2, 30, 0).unwrap();
        assert_eq!(instant.into_day_key().unwrap().to_string(), "2024-01-04");
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("Completed".parse::<DayStatus>().unwrap(), DayStatus::Completed);
        assert_eq!("missed".parse::<DayStatus>().unwrap(), DayStatus::Missed);
        assert!("skipped".parse::<DayStatus>().is_err());
    }

    #[test]
    fn duration_only_accepts_90_or_365() {
        assert_eq!(ChallengeDuration::try_from(90).unwrap().days(), 90);
        assert_eq!(ChallengeDuration::try_from(365).unwrap().days(), 365);
        assert!(matches!(
            ChallengeDuration::try_from(30),
            Err(NoozeError::InvalidDuration(30))
        ));
    }

    #[test]
    fn log_entry_uses_camel_case_keys() {
        let entry = ChallengeLogEntry {
            date_key: DayKey::parse("2024-01-03").unwrap(),
            status: DayStatus::Completed,
            actual_wake_time: None,
            solved_math: Some(true),
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"dateKey":"2024-01-03","status":"completed","solvedMath":true}"#);
    }

    #[test]
    fn challenge_without_profile_fields_reads_as_blank_profile() {
        let stored = serde_json::json!({
            "id": 1,
            "wake_up_time": "05:30",
            "duration": 90,
            "start_date": "2024-01-03",
            "active": true,
            "obstacle": "phone",
        });
        let challenge: Challenge = serde_json::from_value(stored).unwrap();
        assert_eq!(challenge.profile.obstacle, "phone");
        assert!(challenge.profile.motivation.is_empty());
        assert!(challenge.profile.activities.is_empty());
        assert_eq!(challenge.profile.routine_rating, "");
    }
}
