use chrono::{Datelike, Days, NaiveDate, NaiveDateTime};
use log::debug;

use crate::error::{NoozeError, Result};
use crate::models::{AlarmSchedule, RepeatSet, WakeTime};

/// Next instant an alarm set for `wake_time` should ring, seen from `now`.
///
/// With an empty `repeat` the alarm is one-shot: today at `wake_time` if that
/// is still ahead, otherwise tomorrow. With a non-empty `repeat`, today only
/// qualifies when it is one of the repeat days and the time has not passed;
/// otherwise the search starts tomorrow and walks forward one week, so an
/// alarm repeating only on today's weekday lands exactly seven days out.
///
/// Everything happens on local wall-clock values. The hour and minute are set
/// on a calendar date, so a 06:00 alarm rings at 06:00 local on both sides of
/// a daylight-saving change even though the elapsed time between two rings
/// is then 23 or 25 hours. `now` must come from the same local clock.
pub fn next_trigger(
    now: NaiveDateTime,
    wake_time: WakeTime,
    repeat: &RepeatSet,
) -> Result<NaiveDateTime> {
    let today = now.date();
    let candidate_today = at_wake_time(today, wake_time);

    if repeat.is_empty() {
        let next = if candidate_today <= now {
            at_wake_time(add_days(today, 1)?, wake_time)
        } else {
            candidate_today
        };
        debug!("one-shot alarm at {} from {} -> {}", wake_time, now, next);
        return Ok(next);
    }

    let weekday = today.weekday().num_days_from_sunday();
    if repeat.contains_index(weekday) && candidate_today > now {
        debug!("repeating alarm at {} still due today -> {}", wake_time, candidate_today);
        return Ok(candidate_today);
    }

    for offset in 1..=7u32 {
        let day = (weekday + offset) % 7;
        if repeat.contains_index(day) {
            let next = at_wake_time(add_days(today, offset)?, wake_time);
            debug!(
                "repeating alarm at {} ({}) from {} -> {}",
                wake_time,
                repeat.label(),
                now,
                next
            );
            return Ok(next);
        }
    }

    Err(NoozeError::InvalidSchedule)
}

/// Next trigger for a stored alarm, using its own wake time and repeat days.
pub fn next_trigger_for(now: NaiveDateTime, alarm: &AlarmSchedule) -> Result<NaiveDateTime> {
    next_trigger(now, alarm.wake_time, &alarm.repeat)
}

/// When `alarm` rings next as seen from `now`, or `None` when it is off.
///
/// A stored trigger that already passed without the ring being handled is
/// replaced by the next occurrence after `now`. The stored value itself is
/// left alone so the trigger facility still reports the missed ring.
pub fn next_ring(now: NaiveDateTime, alarm: &AlarmSchedule) -> Result<Option<NaiveDateTime>> {
    if !alarm.active {
        return Ok(None);
    }
    match alarm.next_trigger {
        Some(at) if at > now => Ok(Some(at)),
        _ => next_trigger_for(now, alarm).map(Some),
    }
}

fn at_wake_time(date: NaiveDate, wake_time: WakeTime) -> NaiveDateTime {
    date.and_time(wake_time.to_naive_time())
}

fn add_days(date: NaiveDate, days: u32) -> Result<NaiveDate> {
    date.checked_add_days(Days::new(days as u64))
        .ok_or_else(|| NoozeError::MalformedDate(format!("{} + {} days", date, days)))
}
