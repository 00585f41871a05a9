//! Elapsed-time progress for a challenge.
//!
//! These functions look only at the wall clock: how many whole days have
//! passed since the start date. The completed-day tally lives on the ledger
//! and is a separate number.

use chrono::NaiveDateTime;

use crate::models::Challenge;

/// Whole days elapsed since the start date's midnight, clamped to
/// `[0, duration]`.
pub fn calculate_progress(challenge: &Challenge, now: NaiveDateTime) -> u32 {
    let total = challenge.duration.days() as i64;
    let elapsed = (now - challenge.start_date.midnight()).num_days();
    elapsed.clamp(0, total) as u32
}

/// Elapsed days as a rounded percentage of the duration, in `[0, 100]`.
pub fn calculate_progress_percentage(challenge: &Challenge, now: NaiveDateTime) -> u32 {
    let total = challenge.duration.days() as f64;
    let progress = calculate_progress(challenge, now) as f64;
    ((progress / total) * 100.0).round().clamp(0.0, 100.0) as u32
}

pub fn is_challenge_completed(challenge: &Challenge, now: NaiveDateTime) -> bool {
    calculate_progress(challenge, now) >= challenge.duration.days()
}

pub fn days_remaining(challenge: &Challenge, now: NaiveDateTime) -> u32 {
    challenge
        .duration
        .days()
        .saturating_sub(calculate_progress(challenge, now))
}

/// 1-based day number shown as "Day N", never past the last day.
pub fn current_day(challenge: &Challenge, now: NaiveDateTime) -> u32 {
    (calculate_progress(challenge, now) + 1).min(challenge.duration.days())
}

/// Completed days as a share of the duration, to two decimals.
pub fn completed_percentage(completed: u32, challenge: &Challenge) -> f64 {
    let pct = completed as f64 / challenge.duration.days() as f64 * 100.0;
    (pct * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChallengeDuration, ChallengeProfile, DayKey, WakeTime};
    use chrono::{Duration, NaiveDate};

    fn challenge(duration: ChallengeDuration) -> Challenge {
        Challenge {
            id: 1,
            wake_up_time: WakeTime::default(),
            duration,
            start_date: DayKey::parse("2024-01-01").unwrap(),
            active: true,
            profile: ChallengeProfile::default(),
        }
    }

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    #[test]
    fn twenty_days_of_ninety_is_22_percent() {
        let c = challenge(ChallengeDuration::Days90);
        let now = start() + Duration::days(20) + Duration::hours(9);
        assert_eq!(calculate_progress(&c, now), 20);
        assert_eq!(calculate_progress_percentage(&c, now), 22);
        assert_eq!(days_remaining(&c, now), 70);
        assert_eq!(current_day(&c, now), 21);
        assert!(!is_challenge_completed(&c, now));
    }

    #[test]
    fn partial_days_do_not_count() {
        let c = challenge(ChallengeDuration::Days90);
        let now = start() + Duration::hours(23) + Duration::minutes(59);
        assert_eq!(calculate_progress(&c, now), 0);
        assert_eq!(current_day(&c, now), 1);
    }

    #[test]
    fn before_start_clamps_to_zero() {
        let c = challenge(ChallengeDuration::Days365);
        let now = start() - Duration::days(3);
        assert_eq!(calculate_progress(&c, now), 0);
        assert_eq!(calculate_progress_percentage(&c, now), 0);
        assert_eq!(days_remaining(&c, now), 365);
    }

    #[test]
    fn after_end_clamps_to_duration() {
        let c = challenge(ChallengeDuration::Days90);
        let now = start() + Duration::days(400);
        assert_eq!(calculate_progress(&c, now), 90);
        assert_eq!(calculate_progress_percentage(&c, now), 100);
        assert_eq!(days_remaining(&c, now), 0);
        assert_eq!(current_day(&c, now), 90);
        assert!(is_challenge_completed(&c, now));
    }

    #[test]
    fn percentage_is_rounded() {
        // 1/365 = 0.27% -> 0, 2/365 = 0.55% -> 1
        let c = challenge(ChallengeDuration::Days365);
        assert_eq!(calculate_progress_percentage(&c, start() + Duration::days(1)), 0);
        assert_eq!(calculate_progress_percentage(&c, start() + Duration::days(2)), 1);
    }

    #[test]
    fn completed_share_is_separate_from_elapsed() {
        let c = challenge(ChallengeDuration::Days90);
        assert_eq!(completed_percentage(10, &c), 11.11);
        assert_eq!(completed_percentage(90, &c), 100.0);
    }
}
