use chrono::{Datelike, Days};
use log::{debug, info};
use rusqlite::Connection;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use crate::challenge::events::{EventBus, LedgerEvent};
use crate::db::repository::LedgerRepo;
use crate::error::{NoozeError, Result};
use crate::models::{
    Challenge, ChallengeLogEntry, DayKey, DayStatus, IntoDayKey, MarkInfo, Streak, WeekDay,
    WeekStrip,
};

pub type LedgerEntries = BTreeMap<DayKey, ChallengeLogEntry>;

/// Where the ledger keeps its entries between runs.
pub trait LedgerStore {
    fn load_ledger(&self) -> Result<LedgerEntries>;
    fn save_ledger(&self, entries: &LedgerEntries) -> Result<()>;
}

/// Ledger persisted in the `challenge_log` table.
pub struct SqliteLedgerStore<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteLedgerStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

impl LedgerStore for SqliteLedgerStore<'_> {
    fn load_ledger(&self) -> Result<LedgerEntries> {
        LedgerRepo::load_all(self.conn)
    }

    fn save_ledger(&self, entries: &LedgerEntries) -> Result<()> {
        LedgerRepo::replace_all(self.conn, entries)
    }
}

/// Ledger persisted as a JSON object keyed by `YYYY-MM-DD`.
/// A missing file loads as an empty ledger.
pub struct JsonLedgerFile {
    path: PathBuf,
}

impl JsonLedgerFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LedgerStore for JsonLedgerFile {
    fn load_ledger(&self) -> Result<LedgerEntries> {
        if !self.path.exists() {
            return Ok(LedgerEntries::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        let entries: LedgerEntries = serde_json::from_str(&content)?;
        if let Some((key, entry)) = entries.iter().find(|(k, e)| **k != e.date_key) {
            return Err(NoozeError::MalformedDate(format!(
                "entry under {} is dated {}",
                key, entry.date_key
            )));
        }
        Ok(entries)
    }

    fn save_ledger(&self, entries: &LedgerEntries) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

/// Date-keyed log of daily outcomes.
///
/// Writes are last-write-wins per day and any status may replace any other.
/// There is no locking: callers that write from more than one place must
/// serialize those writes themselves.
pub struct ChallengeLedger<S: LedgerStore> {
    store: S,
    entries: LedgerEntries,
    events: EventBus<LedgerEvent>,
}

impl<S: LedgerStore> ChallengeLedger<S> {
    pub fn load(store: S) -> Result<Self> {
        let entries = store.load_ledger()?;
        debug!("loaded {} ledger entries", entries.len());
        Ok(Self {
            store,
            entries,
            events: EventBus::new(),
        })
    }

    /// Record `status` for the day `date` falls on, replacing any earlier
    /// entry, and persist the whole ledger.
    pub fn mark_day<D: IntoDayKey>(
        &mut self,
        date: D,
        status: DayStatus,
        info: Option<MarkInfo>,
    ) -> Result<&ChallengeLogEntry> {
        let key = date.into_day_key()?;
        let info = info.unwrap_or_default();
        let entry = ChallengeLogEntry {
            date_key: key,
            status,
            actual_wake_time: info.actual_wake_time,
            solved_math: info.solved_math,
        };

        let previous = self.entries.insert(key, entry);
        if let Err(e) = self.store.save_ledger(&self.entries) {
            match previous {
                Some(prev) => self.entries.insert(key, prev),
                None => self.entries.remove(&key),
            };
            return Err(e);
        }

        debug!("marked {} as {}", key, status);
        self.events.publish(LedgerEvent::DayMarked { key, status });
        Ok(&self.entries[&key])
    }

    /// Status for the day, or `None` when nothing was ever recorded.
    pub fn day_status<D: IntoDayKey>(&self, date: D) -> Result<Option<DayStatus>> {
        Ok(self.get_log(date)?.map(|e| e.status))
    }

    pub fn get_log<D: IntoDayKey>(&self, date: D) -> Result<Option<&ChallengeLogEntry>> {
        let key = date.into_day_key()?;
        Ok(self.entries.get(&key))
    }

    /// Completed days on or after the challenge start, capped at its duration.
    ///
    /// The cap applies to the count, not to a date window: a completed day
    /// dated after `start + duration` still counts while the cap has room.
    pub fn completed_days_count(&self, challenge: &Challenge) -> u32 {
        let total = challenge.duration.days();
        let mut count = 0;
        for entry in self.entries.range(challenge.start_date..).map(|(_, e)| e) {
            if count >= total {
                break;
            }
            if entry.status == DayStatus::Completed {
                count += 1;
            }
        }
        count
    }

    /// Current and best runs of consecutive completed days. The current run
    /// ends today, or yesterday while today is still open.
    pub fn streak(&self, today: DayKey) -> Streak {
        let done = |k: &DayKey| {
            self.entries
                .get(k)
                .is_some_and(|e| e.status == DayStatus::Completed)
        };

        let mut current = 0u32;
        let mut check = if done(&today) { Some(today) } else { today.pred() };
        while let Some(day) = check {
            if !done(&day) {
                break;
            }
            current += 1;
            check = day.pred();
        }

        let completed: Vec<DayKey> = self.entries.keys().filter(|k| done(*k)).copied().collect();
        Streak {
            current,
            best: best_run(&completed).max(current),
        }
    }

    /// The Sunday-to-Saturday week containing `today`.
    pub fn week_strip(&self, today: DayKey) -> WeekStrip {
        let date = today.date();
        let back = date.weekday().num_days_from_sunday() as u64;
        let sunday = date.checked_sub_days(Days::new(back)).unwrap_or(date);
        let days = (0..7u64)
            .filter_map(|i| sunday.checked_add_days(Days::new(i)))
            .map(|d| {
                let key = DayKey::from(d);
                WeekDay {
                    date: key,
                    status: self.entries.get(&key).map(|e| e.status),
                    is_today: key == today,
                }
            })
            .collect();
        WeekStrip::new(days)
    }

    pub fn entries(&self) -> &LedgerEntries {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace every entry at once, e.g. from an import.
    pub fn replace_all(&mut self, entries: LedgerEntries) -> Result<()> {
        self.store.save_ledger(&entries)?;
        self.entries = entries;
        info!("ledger replaced with {} entries", self.entries.len());
        self.events.publish(LedgerEvent::Cleared);
        for (key, entry) in &self.entries {
            self.events.publish(LedgerEvent::DayMarked {
                key: *key,
                status: entry.status,
            });
        }
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        self.store.save_ledger(&LedgerEntries::new())?;
        self.entries.clear();
        info!("ledger cleared");
        self.events.publish(LedgerEvent::Cleared);
        Ok(())
    }

    pub fn subscribe(&mut self) -> mpsc::Receiver<LedgerEvent> {
        self.events.subscribe()
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

/// Longest run of consecutive days in an ascending list.
fn best_run(sorted: &[DayKey]) -> u32 {
    if sorted.is_empty() {
        return 0;
    }

    let mut best = 1u32;
    let mut current = 1u32;

    for pair in sorted.windows(2) {
        if pair[0].succ() == Some(pair[1]) {
            current += 1;
        } else {
            current = 1;
        }
        best = best.max(current);
    }
    best
}
