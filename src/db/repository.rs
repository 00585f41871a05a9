use chrono::{DateTime, NaiveDateTime};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::BTreeMap;

use crate::error::{NoozeError, Result};
use crate::models::{
    AlarmSchedule, Challenge, ChallengeDuration, ChallengeLogEntry, ChallengeProfile, DayKey,
    DayStatus, RepeatSet, WakeTime,
};

pub const TRIGGER_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

fn format_instant(at: NaiveDateTime) -> String {
    at.format(TRIGGER_FORMAT).to_string()
}

fn parse_instant(s: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TRIGGER_FORMAT)
        .map_err(|_| NoozeError::MalformedDate(s.to_string()))
}

// ─── Challenge log ───────────────────────────────────────────────────────────

pub struct LedgerRepo;

impl LedgerRepo {
    pub fn load_all(conn: &Connection) -> Result<BTreeMap<DayKey, ChallengeLogEntry>> {
        let mut stmt = conn.prepare(
            "SELECT date_key, status, actual_wake_time, solved_math
             FROM challenge_log ORDER BY date_key",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<bool>>(3)?,
            ))
        })?;

        let mut entries = BTreeMap::new();
        for r in rows {
            let (date_key, status, actual_wake_time, solved_math) = r?;
            let key = DayKey::parse(&date_key)?;
            let actual_wake_time = actual_wake_time
                .map(|s| {
                    DateTime::parse_from_rfc3339(&s).map_err(|_| NoozeError::MalformedDate(s))
                })
                .transpose()?;
            entries.insert(
                key,
                ChallengeLogEntry {
                    date_key: key,
                    status: status.parse::<DayStatus>()?,
                    actual_wake_time,
                    solved_math,
                },
            );
        }
        Ok(entries)
    }

    /// Replace the stored log with `entries` in one transaction.
    pub fn replace_all(
        conn: &Connection,
        entries: &BTreeMap<DayKey, ChallengeLogEntry>,
    ) -> Result<()> {
        let tx = conn.unchecked_transaction()?;
        tx.execute("DELETE FROM challenge_log", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO challenge_log (date_key, status, actual_wake_time, solved_math)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (key, entry) in entries {
                stmt.execute(params![
                    key.to_string(),
                    entry.status.as_str(),
                    entry.actual_wake_time.map(|t| t.to_rfc3339()),
                    entry.solved_math,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

// ─── Alarms ──────────────────────────────────────────────────────────────────

pub struct AlarmRepo;

type AlarmRow = (i64, String, String, bool, Option<String>);

fn read_alarm_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AlarmRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn alarm_from_row(row: AlarmRow) -> Result<AlarmSchedule> {
    let (id, wake_time, repeat_days, active, next_trigger) = row;
    let indices: Vec<u8> = serde_json::from_str(&repeat_days)?;
    Ok(AlarmSchedule {
        id,
        wake_time: wake_time.parse::<WakeTime>()?,
        repeat: RepeatSet::from_indices(indices)?,
        active,
        next_trigger: next_trigger.as_deref().map(parse_instant).transpose()?,
    })
}

impl AlarmRepo {
    pub fn insert(
        conn: &Connection,
        wake_time: WakeTime,
        repeat: &RepeatSet,
        active: bool,
        next_trigger: Option<NaiveDateTime>,
    ) -> Result<AlarmSchedule> {
        conn.execute(
            "INSERT INTO alarms (wake_time, repeat_days, active, next_trigger)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                wake_time.to_string(),
                serde_json::to_string(repeat)?,
                active,
                next_trigger.map(format_instant),
            ],
        )?;
        Ok(AlarmSchedule {
            id: conn.last_insert_rowid(),
            wake_time,
            repeat: *repeat,
            active,
            next_trigger,
        })
    }

    pub fn get(conn: &Connection, id: i64) -> Result<Option<AlarmSchedule>> {
        let row = conn
            .query_row(
                "SELECT id, wake_time, repeat_days, active, next_trigger FROM alarms WHERE id = ?1",
                params![id],
                read_alarm_row,
            )
            .optional()?;
        row.map(alarm_from_row).transpose()
    }

    pub fn list(conn: &Connection) -> Result<Vec<AlarmSchedule>> {
        let mut stmt = conn.prepare(
            "SELECT id, wake_time, repeat_days, active, next_trigger FROM alarms ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], read_alarm_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(alarm_from_row).collect()
    }

    pub fn update(conn: &Connection, alarm: &AlarmSchedule) -> Result<bool> {
        let changed = conn.execute(
            "UPDATE alarms SET wake_time = ?1, repeat_days = ?2, active = ?3, next_trigger = ?4
             WHERE id = ?5",
            params![
                alarm.wake_time.to_string(),
                serde_json::to_string(&alarm.repeat)?,
                alarm.active,
                alarm.next_trigger.map(format_instant),
                alarm.id,
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn delete(conn: &Connection, id: i64) -> Result<bool> {
        let changed = conn.execute("DELETE FROM alarms WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    pub fn clear(conn: &Connection) -> Result<()> {
        conn.execute("DELETE FROM alarms", [])?;
        Ok(())
    }
}

// ─── Pending triggers ────────────────────────────────────────────────────────

pub struct TriggerRepo;

impl TriggerRepo {
    /// Arm (or re-arm) the trigger for an alarm. Re-arming clears the
    /// acknowledged flag.
    pub fn upsert(conn: &Connection, alarm_id: i64, at: NaiveDateTime) -> Result<()> {
        conn.execute(
            "INSERT INTO alarm_triggers (alarm_id, trigger_at, acknowledged) VALUES (?1, ?2, 0)
             ON CONFLICT(alarm_id) DO UPDATE SET trigger_at = ?2, acknowledged = 0",
            params![alarm_id, format_instant(at)],
        )?;
        Ok(())
    }

    pub fn delete(conn: &Connection, alarm_id: i64) -> Result<()> {
        conn.execute("DELETE FROM alarm_triggers WHERE alarm_id = ?1", params![alarm_id])?;
        Ok(())
    }

    /// Earliest unacknowledged trigger at or before `now`.
    pub fn earliest_due(
        conn: &Connection,
        now: NaiveDateTime,
    ) -> Result<Option<(i64, NaiveDateTime)>> {
        // The fixed-width format sorts the same as the instants it encodes.
        let row = conn
            .query_row(
                "SELECT alarm_id, trigger_at FROM alarm_triggers
                 WHERE acknowledged = 0 AND trigger_at <= ?1
                 ORDER BY trigger_at, alarm_id LIMIT 1",
                params![format_instant(now)],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        row.map(|(id, at)| Ok((id, parse_instant(&at)?))).transpose()
    }

    pub fn acknowledge(conn: &Connection, alarm_id: i64) -> Result<()> {
        conn.execute(
            "UPDATE alarm_triggers SET acknowledged = 1 WHERE alarm_id = ?1",
            params![alarm_id],
        )?;
        Ok(())
    }

    pub fn get(conn: &Connection, alarm_id: i64) -> Result<Option<NaiveDateTime>> {
        let at: Option<String> = conn
            .query_row(
                "SELECT trigger_at FROM alarm_triggers WHERE alarm_id = ?1 AND acknowledged = 0",
                params![alarm_id],
                |row| row.get(0),
            )
            .optional()?;
        at.as_deref().map(parse_instant).transpose()
    }

    pub fn clear(conn: &Connection) -> Result<()> {
        conn.execute("DELETE FROM alarm_triggers", [])?;
        Ok(())
    }
}

// ─── Challenges ──────────────────────────────────────────────────────────────

pub struct ChallengeRepo;

struct ChallengeRow {
    id: i64,
    wake_up_time: String,
    duration: u32,
    start_date: String,
    active: bool,
    activities: String,
    profile: ChallengeProfile,
}

const CHALLENGE_COLUMNS: &str = "id, wake_up_time, duration, start_date, active, motivation, \
     activities, past_experience, obstacle, routine_rating";

fn read_challenge_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChallengeRow> {
    Ok(ChallengeRow {
        id: row.get(0)?,
        wake_up_time: row.get(1)?,
        duration: row.get(2)?,
        start_date: row.get(3)?,
        active: row.get(4)?,
        activities: row.get(6)?,
        profile: ChallengeProfile {
            motivation: row.get(5)?,
            activities: Vec::new(),
            past_experience: row.get(7)?,
            obstacle: row.get(8)?,
            routine_rating: row.get(9)?,
        },
    })
}

fn challenge_from_row(row: ChallengeRow) -> Result<Challenge> {
    let mut profile = row.profile;
    profile.activities = serde_json::from_str(&row.activities)?;
    Ok(Challenge {
        id: row.id,
        wake_up_time: row.wake_up_time.parse()?,
        duration: ChallengeDuration::try_from(row.duration)?,
        start_date: DayKey::parse(&row.start_date)?,
        active: row.active,
        profile,
    })
}

impl ChallengeRepo {
    pub fn insert(
        conn: &Connection,
        wake_up_time: WakeTime,
        duration: ChallengeDuration,
        start_date: DayKey,
        profile: &ChallengeProfile,
    ) -> Result<Challenge> {
        conn.execute(
            "INSERT INTO challenges (wake_up_time, duration, start_date, active, motivation,
                                     activities, past_experience, obstacle, routine_rating)
             VALUES (?1, ?2, ?3, 1, ?4, ?5, ?6, ?7, ?8)",
            params![
                wake_up_time.to_string(),
                duration.days(),
                start_date.to_string(),
                profile.motivation,
                serde_json::to_string(&profile.activities)?,
                profile.past_experience,
                profile.obstacle,
                profile.routine_rating,
            ],
        )?;
        Ok(Challenge {
            id: conn.last_insert_rowid(),
            wake_up_time,
            duration,
            start_date,
            active: true,
            profile: profile.clone(),
        })
    }

    /// Most recently started challenge, active or not.
    pub fn current(conn: &Connection) -> Result<Option<Challenge>> {
        let sql = format!(
            "SELECT {} FROM challenges ORDER BY id DESC LIMIT 1",
            CHALLENGE_COLUMNS
        );
        let row = conn
            .query_row(&sql, [], read_challenge_row)
            .optional()?;
        row.map(challenge_from_row).transpose()
    }

    pub fn set_active(conn: &Connection, id: i64, active: bool) -> Result<bool> {
        let changed = conn.execute(
            "UPDATE challenges SET active = ?1 WHERE id = ?2",
            params![active, id],
        )?;
        Ok(changed > 0)
    }

    pub fn clear(conn: &Connection) -> Result<()> {
        conn.execute("DELETE FROM challenges", [])?;
        Ok(())
    }
}

// ─── App meta ────────────────────────────────────────────────────────────────

pub struct MetaRepo;

impl MetaRepo {
    pub fn get(conn: &Connection, key: &str) -> Result<Option<String>> {
        conn.query_row(
            "SELECT value FROM app_meta WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(NoozeError::from)
    }

    pub fn set(conn: &Connection, key: &str, value: &str) -> Result<()> {
        conn.execute(
            "INSERT INTO app_meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = ?2",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn delete(conn: &Connection, key: &str) -> Result<()> {
        conn.execute("DELETE FROM app_meta WHERE key = ?1", params![key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;
    use chrono::{FixedOffset, NaiveDate, TimeZone};

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn instant(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    #[test]
    fn ledger_replace_and_load_round_trip() {
        let conn = conn();
        let tz = FixedOffset::east_opt(-5 * 3600).unwrap();
        let mut entries = BTreeMap::new();
        let woke = tz.with_ymd_and_hms(2024, 1, 2, 6, 3, 0).unwrap();
        for (day, status, wake, math) in [
            ("2024-01-02", DayStatus::Completed, Some(woke), Some(true)),
            ("2024-01-03", DayStatus::Missed, None, None),
            ("2024-01-04", DayStatus::Pending, None, Some(false)),
        ] {
            let key = DayKey::parse(day).unwrap();
            entries.insert(
                key,
                ChallengeLogEntry {
                    date_key: key,
                    status,
                    actual_wake_time: wake,
                    solved_math: math,
                },
            );
        }

        LedgerRepo::replace_all(&conn, &entries).unwrap();
        assert_eq!(LedgerRepo::load_all(&conn).unwrap(), entries);

        entries.remove(&DayKey::parse("2024-01-03").unwrap());
        LedgerRepo::replace_all(&conn, &entries).unwrap();
        assert_eq!(LedgerRepo::load_all(&conn).unwrap().len(), 2);
    }

    #[test]
    fn alarm_crud() {
        let conn = conn();
        let repeat: RepeatSet = "mon,fri".parse().unwrap();
        let wake = WakeTime::new(6, 30).unwrap();
        let mut alarm =
            AlarmRepo::insert(&conn, wake, &repeat, true, Some(instant(5, 6))).unwrap();
        assert_eq!(AlarmRepo::get(&conn, alarm.id).unwrap().as_ref(), Some(&alarm));

        alarm.active = false;
        alarm.next_trigger = None;
        assert!(AlarmRepo::update(&conn, &alarm).unwrap());
        let stored = AlarmRepo::get(&conn, alarm.id).unwrap().unwrap();
        assert!(!stored.active);
        assert_eq!(stored.repeat, repeat);

        assert_eq!(AlarmRepo::list(&conn).unwrap().len(), 1);
        assert!(AlarmRepo::delete(&conn, alarm.id).unwrap());
        assert!(!AlarmRepo::delete(&conn, alarm.id).unwrap());
        assert!(AlarmRepo::get(&conn, alarm.id).unwrap().is_none());
    }

    #[test]
    fn triggers_report_earliest_due() {
        let conn = conn();
        TriggerRepo::upsert(&conn, 1, instant(3, 6)).unwrap();
        TriggerRepo::upsert(&conn, 2, instant(3, 5)).unwrap();
        TriggerRepo::upsert(&conn, 3, instant(4, 6)).unwrap();

        assert_eq!(TriggerRepo::earliest_due(&conn, instant(3, 4)).unwrap(), None);
        assert_eq!(
            TriggerRepo::earliest_due(&conn, instant(3, 7)).unwrap(),
            Some((2, instant(3, 5)))
        );

        TriggerRepo::acknowledge(&conn, 2).unwrap();
        assert_eq!(
            TriggerRepo::earliest_due(&conn, instant(3, 7)).unwrap(),
            Some((1, instant(3, 6)))
        );

        // re-arming clears the acknowledgement
        TriggerRepo::upsert(&conn, 2, instant(3, 5)).unwrap();
        assert_eq!(TriggerRepo::get(&conn, 2).unwrap(), Some(instant(3, 5)));
    }

    #[test]
    fn challenge_current_is_latest() {
        let conn = conn();
        assert!(ChallengeRepo::current(&conn).unwrap().is_none());
        let start = DayKey::parse("2024-01-01").unwrap();
        let first = ChallengeRepo::insert(
            &conn,
            WakeTime::default(),
            ChallengeDuration::Days90,
            start,
            &ChallengeProfile::default(),
        )
        .unwrap();
        let second = ChallengeRepo::insert(
            &conn,
            WakeTime::new(5, 45).unwrap(),
            ChallengeDuration::Days365,
            start,
            &ChallengeProfile {
                motivation: "feel rested".to_string(),
                activities: vec!["run".to_string()],
                past_experience: "tried but didn't stick".to_string(),
                obstacle: "bed too late".to_string(),
                routine_rating: "chaotic".to_string(),
            },
        )
        .unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(ChallengeRepo::current(&conn).unwrap(), Some(second.clone()));

        ChallengeRepo::set_active(&conn, second.id, false).unwrap();
        assert!(!ChallengeRepo::current(&conn).unwrap().unwrap().active);
    }

    #[test]
    fn meta_set_get_delete() {
        let conn = conn();
        assert_eq!(MetaRepo::get(&conn, "k").unwrap(), None);
        MetaRepo::set(&conn, "k", "1").unwrap();
        MetaRepo::set(&conn, "k", "2").unwrap();
        assert_eq!(MetaRepo::get(&conn, "k").unwrap().as_deref(), Some("2"));
        MetaRepo::delete(&conn, "k").unwrap();
        assert_eq!(MetaRepo::get(&conn, "k").unwrap(), None);
    }
}
