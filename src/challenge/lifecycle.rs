use log::info;
use rusqlite::Connection;

use crate::db::repository::ChallengeRepo;
use crate::error::Result;
use crate::models::{Challenge, ChallengeDuration, ChallengeProfile, DayKey, WakeTime};

/// Settings for a new challenge. Unset fields fall back to 06:00, 365 days
/// and a start of today.
#[derive(Debug, Clone, Default)]
pub struct ChallengeOptions {
    pub wake_up_time: Option<WakeTime>,
    pub duration: Option<ChallengeDuration>,
    pub start_date: Option<DayKey>,
    pub profile: ChallengeProfile,
}

/// Start a new challenge. Any challenge still running is ended first, so at
/// most one is active.
pub fn start_challenge(
    conn: &Connection,
    options: ChallengeOptions,
    today: DayKey,
) -> Result<Challenge> {
    if let Some(running) = ChallengeRepo::current(conn)?.filter(|c| c.active) {
        ChallengeRepo::set_active(conn, running.id, false)?;
        info!("ended challenge {} to start a new one", running.id);
    }

    let challenge = ChallengeRepo::insert(
        conn,
        options.wake_up_time.unwrap_or_default(),
        options.duration.unwrap_or_default(),
        options.start_date.unwrap_or(today),
        &options.profile,
    )?;
    info!(
        "started {}-day challenge {} on {} (wake {})",
        challenge.duration.days(),
        challenge.id,
        challenge.start_date,
        challenge.wake_up_time
    );
    Ok(challenge)
}

/// Mark the current challenge inactive. Returns the ended challenge, or
/// `None` when nothing was running.
pub fn end_challenge(conn: &Connection) -> Result<Option<Challenge>> {
    match ChallengeRepo::current(conn)? {
        Some(mut challenge) if challenge.active => {
            ChallengeRepo::set_active(conn, challenge.id, false)?;
            challenge.active = false;
            info!("ended challenge {}", challenge.id);
            Ok(Some(challenge))
        }
        _ => Ok(None),
    }
}

pub fn current_challenge(conn: &Connection) -> Result<Option<Challenge>> {
    ChallengeRepo::current(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn today() -> DayKey {
        DayKey::parse("2024-01-03").unwrap()
    }

    #[test]
    fn defaults_are_six_am_for_a_year_from_today() {
        let conn = conn();
        let c = start_challenge(&conn, ChallengeOptions::default(), today()).unwrap();
        assert_eq!(c.wake_up_time, WakeTime::new(6, 0).unwrap());
        assert_eq!(c.duration, ChallengeDuration::Days365);
        assert_eq!(c.start_date, today());
        assert!(c.active);
    }

    #[test]
    fn starting_again_ends_the_previous_challenge() {
        let conn = conn();
        let first = start_challenge(&conn, ChallengeOptions::default(), today()).unwrap();
        let second = start_challenge(
            &conn,
            ChallengeOptions {
                duration: Some(ChallengeDuration::Days90),
                profile: ChallengeProfile {
                    motivation: "mornings".to_string(),
                    obstacle: "I hit snooze".to_string(),
                    ..Default::default()
                },
                ..Default::default()
            },
            today(),
        )
        .unwrap();
        assert_ne!(first.id, second.id);
        let current = current_challenge(&conn).unwrap().unwrap();
        assert_eq!(current.id, second.id);
        assert_eq!(current.profile.motivation, "mornings");
        assert_eq!(current.profile.obstacle, "I hit snooze");
        let active: i64 = conn
            .query_row("SELECT COUNT(*) FROM challenges WHERE active = 1", [], |r| r.get(0))
            .unwrap();
        assert_eq!(active, 1);
    }

    #[test]
    fn end_is_a_no_op_without_a_running_challenge() {
        let conn = conn();
        assert!(end_challenge(&conn).unwrap().is_none());
        start_challenge(&conn, ChallengeOptions::default(), today()).unwrap();
        let ended = end_challenge(&conn).unwrap().unwrap();
        assert!(!ended.active);
        assert!(end_challenge(&conn).unwrap().is_none());
        assert!(!current_challenge(&conn).unwrap().unwrap().active);
    }
}
