use rusqlite::Connection;

use crate::error::Result;

pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch("
        CREATE TABLE IF NOT EXISTS alarms (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            wake_time     TEXT NOT NULL,
            repeat_days   TEXT NOT NULL DEFAULT '[]',
            active        INTEGER NOT NULL DEFAULT 1,
            next_trigger  TEXT,
            created_at    TEXT DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS alarm_triggers (
            alarm_id      INTEGER PRIMARY KEY,
            trigger_at    TEXT NOT NULL,
            acknowledged  INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS challenges (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            wake_up_time  TEXT NOT NULL,
            duration      INTEGER NOT NULL CHECK(duration IN (90, 365)),
            start_date    TEXT NOT NULL,
            active        INTEGER NOT NULL DEFAULT 1,
            motivation    TEXT NOT NULL DEFAULT '',
            activities    TEXT NOT NULL DEFAULT '[]',
            past_experience TEXT NOT NULL DEFAULT '',
            obstacle      TEXT NOT NULL DEFAULT '',
            routine_rating TEXT NOT NULL DEFAULT '',
            created_at    TEXT DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS challenge_log (
            date_key          TEXT PRIMARY KEY,
            status            TEXT NOT NULL
                              CHECK(status IN ('completed','missed','pending')),
            actual_wake_time  TEXT,
            solved_math       INTEGER
        );

        CREATE TABLE IF NOT EXISTS app_meta (
            key   TEXT PRIMARY KEY,
            value TEXT
        );
    ")?;
    Ok(())
}
