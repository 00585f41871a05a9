use chrono::NaiveDateTime;
use log::debug;
use rusqlite::Connection;

use crate::db::repository::TriggerRepo;
use crate::error::Result;

/// The platform facility that actually wakes the user.
///
/// It only ever sees an alarm id and a concrete instant; working out which
/// instant is the calculator's job.
pub trait AlarmTrigger {
    fn schedule(&self, alarm_id: i64, at: NaiveDateTime) -> Result<()>;
    fn cancel(&self, alarm_id: i64) -> Result<()>;
    /// The alarm whose trigger has fired by `now` and has not been
    /// acknowledged, earliest first.
    fn launched_by_alarm(&self, now: NaiveDateTime) -> Result<Option<i64>>;
    fn acknowledge(&self, alarm_id: i64) -> Result<()>;
}

/// Trigger facility for the terminal: pending triggers live in the
/// `alarm_triggers` table and count as fired once their instant has passed.
pub struct SqliteTriggerQueue<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteTriggerQueue<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn pending(&self, alarm_id: i64) -> Result<Option<NaiveDateTime>> {
        TriggerRepo::get(self.conn, alarm_id)
    }
}

impl AlarmTrigger for SqliteTriggerQueue<'_> {
    fn schedule(&self, alarm_id: i64, at: NaiveDateTime) -> Result<()> {
        debug!("trigger for alarm {} set at {}", alarm_id, at);
        TriggerRepo::upsert(self.conn, alarm_id, at)
    }

    fn cancel(&self, alarm_id: i64) -> Result<()> {
        debug!("trigger for alarm {} cancelled", alarm_id);
        TriggerRepo::delete(self.conn, alarm_id)
    }

    fn launched_by_alarm(&self, now: NaiveDateTime) -> Result<Option<i64>> {
        Ok(TriggerRepo::earliest_due(self.conn, now)?.map(|(id, _)| id))
    }

    fn acknowledge(&self, alarm_id: i64) -> Result<()> {
        TriggerRepo::acknowledge(self.conn, alarm_id)
    }
}
