use chrono::{Duration, NaiveDateTime};
use log::{debug, info};
use rusqlite::Connection;

use crate::alarm::calculator::{next_ring, next_trigger};
use crate::alarm::trigger::AlarmTrigger;
use crate::db::repository::AlarmRepo;
use crate::error::{NoozeError, Result};
use crate::models::{AlarmSchedule, RepeatSet, WakeTime};

/// The user's alarms. Every change is written to the `alarms` table and
/// mirrored to the trigger facility.
pub struct AlarmBook<'c, T: AlarmTrigger> {
    conn: &'c Connection,
    trigger: T,
}

impl<'c, T: AlarmTrigger> AlarmBook<'c, T> {
    pub fn new(conn: &'c Connection, trigger: T) -> Self {
        Self { conn, trigger }
    }

    pub fn trigger(&self) -> &T {
        &self.trigger
    }

    pub fn add(
        &self,
        wake_time: WakeTime,
        repeat: RepeatSet,
        now: NaiveDateTime,
    ) -> Result<AlarmSchedule> {
        let at = next_trigger(now, wake_time, &repeat)?;
        let alarm = AlarmRepo::insert(self.conn, wake_time, &repeat, true, Some(at))?;
        self.trigger.schedule(alarm.id, at)?;
        info!("alarm {} set for {} ({})", alarm.id, at, repeat.label());
        Ok(alarm)
    }

    pub fn get(&self, id: i64) -> Result<AlarmSchedule> {
        AlarmRepo::get(self.conn, id)?.ok_or(NoozeError::AlarmNotFound(id))
    }

    pub fn list(&self) -> Result<Vec<AlarmSchedule>> {
        AlarmRepo::list(self.conn)
    }

    pub fn active(&self) -> Result<Vec<AlarmSchedule>> {
        Ok(self.list()?.into_iter().filter(|a| a.active).collect())
    }

    /// Active alarms paired with their next ring time, soonest first.
    pub fn upcoming(
        &self,
        now: NaiveDateTime,
    ) -> Result<Vec<(NaiveDateTime, AlarmSchedule)>> {
        let mut upcoming = Vec::new();
        for alarm in self.active()? {
            if let Some(at) = next_ring(now, &alarm)? {
                upcoming.push((at, alarm));
            }
        }
        upcoming.sort_by_key(|(at, _)| *at);
        Ok(upcoming)
    }

    pub fn remove(&self, id: i64) -> Result<()> {
        if !AlarmRepo::delete(self.conn, id)? {
            return Err(NoozeError::AlarmNotFound(id));
        }
        self.trigger.cancel(id)?;
        info!("alarm {} removed", id);
        Ok(())
    }

    pub fn clear(&self) -> Result<usize> {
        let alarms = self.list()?;
        for alarm in &alarms {
            self.trigger.cancel(alarm.id)?;
        }
        AlarmRepo::clear(self.conn)?;
        info!("cleared {} alarms", alarms.len());
        Ok(alarms.len())
    }

    /// Turn an alarm on or off. Turning it on computes a fresh trigger from
    /// `now`; turning it off cancels the pending one.
    pub fn set_active(&self, id: i64, active: bool, now: NaiveDateTime) -> Result<AlarmSchedule> {
        let mut alarm = self.get(id)?;
        if active {
            let at = next_trigger(now, alarm.wake_time, &alarm.repeat)?;
            self.trigger.schedule(id, at)?;
            alarm.next_trigger = Some(at);
        } else {
            self.trigger.cancel(id)?;
            alarm.next_trigger = None;
        }
        alarm.active = active;
        AlarmRepo::update(self.conn, &alarm)?;
        Ok(alarm)
    }

    /// Active alarm whose armed trigger lies within `tolerance` of `now`.
    pub fn find_triggered(
        &self,
        now: NaiveDateTime,
        tolerance: Duration,
    ) -> Result<Option<AlarmSchedule>> {
        Ok(self
            .active()?
            .into_iter()
            .filter_map(|a| a.next_trigger.map(|at| ((at - now).abs(), a)))
            .filter(|(diff, _)| *diff < tolerance)
            .min_by_key(|(diff, _)| *diff)
            .map(|(_, a)| a))
    }

    /// Set an alarm up again after it rang and was dismissed. Repeating
    /// alarms move to their next occurrence; one-shot alarms switch off.
    ///
    /// The search starts from whichever is later, `now` or the instant that
    /// just fired, so a dismissal before the ring time cannot re-arm the
    /// same occurrence.
    pub fn rearm(&self, id: i64, now: NaiveDateTime) -> Result<AlarmSchedule> {
        let mut alarm = self.get(id)?;
        if alarm.is_recurring() {
            let from = alarm.next_trigger.map_or(now, |fired| fired.max(now));
            let at = next_trigger(from, alarm.wake_time, &alarm.repeat)?;
            self.trigger.schedule(id, at)?;
            alarm.next_trigger = Some(at);
            debug!("alarm {} re-armed for {}", id, at);
        } else {
            self.trigger.cancel(id)?;
            alarm.active = false;
            alarm.next_trigger = None;
            debug!("one-shot alarm {} switched off", id);
        }
        AlarmRepo::update(self.conn, &alarm)?;
        Ok(alarm)
    }
}
