use chrono::{NaiveDateTime, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::NoozeError;

/// Weekday names indexed 0 = Sunday .. 6 = Saturday.
pub const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

const DAY_ABBREVS: [&str; 7] = ["sun", "mon", "tue", "wed", "thu", "fri", "sat"];

// ─── WakeTime ────────────────────────────────────────────────────────────────

/// A time of day with minute precision and no date attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WakeTime {
    hour: u8,
    minute: u8,
}

impl WakeTime {
    pub fn new(hour: u8, minute: u8) -> Result<Self, NoozeError> {
        if hour > 23 || minute > 59 {
            return Err(NoozeError::InvalidWakeTime(format!("{}:{:02}", hour, minute)));
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    pub fn to_naive_time(&self) -> NaiveTime {
        // Range is checked in `new`, so this cannot fall through to midnight.
        NaiveTime::from_hms_opt(self.hour as u32, self.minute as u32, 0).unwrap_or(NaiveTime::MIN)
    }

    /// Wall-clock time of `instant`, truncated to the minute.
    pub fn of(instant: NaiveDateTime) -> Self {
        Self {
            hour: instant.hour() as u8,
            minute: instant.minute() as u8,
        }
    }
}

impl Default for WakeTime {
    fn default() -> Self {
        Self { hour: 6, minute: 0 }
    }
}

impl std::fmt::Display for WakeTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for WakeTime {
    type Err = NoozeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || NoozeError::InvalidWakeTime(s.to_string());
        let (h, m) = s.trim().split_once(':').ok_or_else(bad)?;
        let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
        if !digits(h) || !digits(m) || m.len() != 2 {
            return Err(bad());
        }
        let hour: u8 = h.parse().map_err(|_| bad())?;
        let minute: u8 = m.parse().map_err(|_| bad())?;
        Self::new(hour, minute).map_err(|_| bad())
    }
}

impl TryFrom<String> for WakeTime {
    type Error = NoozeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<WakeTime> for String {
    fn from(value: WakeTime) -> Self {
        value.to_string()
    }
}

// ─── RepeatSet ───────────────────────────────────────────────────────────────

/// Weekdays an alarm recurs on, 0 = Sunday .. 6 = Saturday.
/// An empty set means a one-shot alarm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct RepeatSet {
    mask: u8,
}

impl RepeatSet {
    pub fn empty() -> Self {
        Self { mask: 0 }
    }

    pub fn every_day() -> Self {
        Self { mask: 0b111_1111 }
    }

    pub fn from_indices<I: IntoIterator<Item = u8>>(indices: I) -> Result<Self, NoozeError> {
        let mut set = Self::empty();
        for idx in indices {
            if idx > 6 {
                return Err(NoozeError::InvalidWeekday(idx.to_string()));
            }
            set.mask |= 1 << idx;
        }
        Ok(set)
    }

    pub fn from_weekdays<I: IntoIterator<Item = Weekday>>(days: I) -> Self {
        let mut set = Self::empty();
        for day in days {
            set.insert(day);
        }
        set
    }

    pub fn insert(&mut self, day: Weekday) {
        self.mask |= 1 << day.num_days_from_sunday();
    }

    pub fn remove(&mut self, day: Weekday) {
        self.mask &= !(1 << day.num_days_from_sunday());
    }

    pub fn contains_index(&self, idx: u32) -> bool {
        idx < 7 && self.mask & (1 << idx) != 0
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.contains_index(day.num_days_from_sunday())
    }

    pub fn is_empty(&self) -> bool {
        self.mask == 0
    }

    pub fn len(&self) -> usize {
        self.mask.count_ones() as usize
    }

    /// Indices in ascending order (Sunday first).
    pub fn indices(&self) -> Vec<u8> {
        (0..7u8).filter(|i| self.contains_index(*i as u32)).collect()
    }

    /// Short human label, e.g. "Mon, Wed, Fri", "Every day" or "Once".
    pub fn label(&self) -> String {
        match self.mask {
            0 => "Once".to_string(),
            0b111_1111 => "Every day".to_string(),
            0b011_1110 => "Weekdays".to_string(),
            0b100_0001 => "Weekends".to_string(),
            _ => self
                .indices()
                .iter()
                .map(|i| &DAY_NAMES[*i as usize][..3])
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

fn parse_weekday_token(token: &str) -> Result<u8, NoozeError> {
    let t = token.trim().to_lowercase();
    if let Ok(idx) = t.parse::<u8>() {
        return if idx <= 6 {
            Ok(idx)
        } else {
            Err(NoozeError::InvalidWeekday(token.to_string()))
        };
    }
    if t.len() >= 3 {
        if let Some(pos) = DAY_ABBREVS.iter().position(|a| t.starts_with(a)) {
            if DAY_NAMES[pos].to_lowercase().starts_with(&t) {
                return Ok(pos as u8);
            }
        }
    }
    Err(NoozeError::InvalidWeekday(token.to_string()))
}

impl FromStr for RepeatSet {
    type Err = NoozeError;

    /// Accepts `mon,wed,fri`, `1,3,5`, full day names, and the shorthands
    /// `daily`, `weekdays`, `weekends`, `once`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "once" | "none" => return Ok(Self::empty()),
            "daily" | "everyday" | "every day" => return Ok(Self::every_day()),
            "weekdays" => return Self::from_indices(1..=5),
            "weekends" => return Self::from_indices([0, 6]),
            _ => {}
        }
        let indices = s
            .split(',')
            .filter(|t| !t.trim().is_empty())
            .map(parse_weekday_token)
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_indices(indices)
    }
}

impl TryFrom<Vec<u8>> for RepeatSet {
    type Error = NoozeError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        Self::from_indices(value)
    }
}

impl From<RepeatSet> for Vec<u8> {
    fn from(value: RepeatSet) -> Self {
        value.indices()
    }
}

// ─── AlarmSchedule ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmSchedule {
    pub id: i64,
    pub wake_time: WakeTime,
    pub repeat: RepeatSet,
    pub active: bool,
    /// Instant last handed to the trigger facility, if armed.
    pub next_trigger: Option<NaiveDateTime>,
}

impl AlarmSchedule {
    pub fn is_recurring(&self) -> bool {
        !self.repeat.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wake_time_rejects_out_of_range() {
        assert!(WakeTime::new(24, 0).is_err());
        assert!(WakeTime::new(23, 60).is_err());
        assert!(WakeTime::new(23, 59).is_ok());
    }

    #[test]
    fn wake_time_parses_and_displays() {
        let t: WakeTime = "6:05".parse().unwrap();
        assert_eq!(t.hour(), 6);
        assert_eq!(t.minute(), 5);
        assert_eq!(t.to_string(), "06:05");
        assert!("06:5".parse::<WakeTime>().is_err());
        assert!("25:00".parse::<WakeTime>().is_err());
        assert!("six".parse::<WakeTime>().is_err());
    }

    #[test]
    fn wake_time_takes_plain_digits_only() {
        for input in ["+6:05", "06:+5", "-0:05", ":05", "06: 5", "٠٦:05"] {
            assert!(input.parse::<WakeTime>().is_err(), "{input} should not parse");
        }
        assert_eq!(" 06:05 ".parse::<WakeTime>().unwrap(), WakeTime::new(6, 5).unwrap());
    }

    #[test]
    fn repeat_set_parses_names_and_indices() {
        let by_name: RepeatSet = "mon,wed,fri".parse().unwrap();
        let by_index: RepeatSet = "1, 3, 5".parse().unwrap();
        assert_eq!(by_name, by_index);
        assert_eq!(by_name.indices(), vec![1, 3, 5]);
        assert!(by_name.contains(Weekday::Wed));
        assert!(!by_name.contains(Weekday::Sun));

        let full: RepeatSet = "Sunday,saturday".parse().unwrap();
        assert_eq!(full.label(), "Weekends");
        assert_eq!("weekdays".parse::<RepeatSet>().unwrap().len(), 5);
        assert!("once".parse::<RepeatSet>().unwrap().is_empty());
    }

    #[test]
    fn repeat_set_rejects_unknown_days() {
        assert!("7".parse::<RepeatSet>().is_err());
        assert!("funday".parse::<RepeatSet>().is_err());
        assert!("mo".parse::<RepeatSet>().is_err());
        assert!(RepeatSet::from_indices([2, 9]).is_err());
    }

    #[test]
    fn repeat_set_serializes_as_sorted_indices() {
        let set = RepeatSet::from_indices([5, 1, 3]).unwrap();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, "[1,3,5]");
        let back: RepeatSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
        assert!(serde_json::from_str::<RepeatSet>("[8]").is_err());
    }
}
