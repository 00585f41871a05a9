pub mod alarm;
pub mod challenge;
pub mod stats;

pub use alarm::{AlarmSchedule, DAY_NAMES, RepeatSet, WakeTime};
pub use challenge::{
    Challenge, ChallengeDuration, ChallengeLogEntry, ChallengeProfile, DayKey, DayStatus,
    IntoDayKey, MarkInfo,
};
pub use stats::{Streak, WeekDay, WeekStrip};
