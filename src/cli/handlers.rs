use anyhow::{Context, Result, bail};
use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDateTime};
use log::{info, warn};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, Write};
use std::path::Path;

use crate::alarm::{AlarmBook, AlarmTrigger, SqliteTriggerQueue, next_ring};
use crate::challenge::progress::{
    calculate_progress_percentage, completed_percentage, current_day, days_remaining,
    is_challenge_completed,
};
use crate::challenge::{
    ChallengeLedger, ChallengeOptions, JsonLedgerFile, LedgerStore, SqliteLedgerStore,
    current_challenge, end_challenge, start_challenge,
};
use crate::cli::args::{AlarmCommands, ChallengeCommands};
use crate::config::AppConfig;
use crate::db::repository::{ChallengeRepo, MetaRepo, TriggerRepo};
use crate::models::{
    ChallengeDuration, ChallengeProfile, DayKey, DayStatus, MarkInfo, RepeatSet, WakeTime,
    WeekStrip,
};
use crate::puzzle::{Attempt, MathGate};
use crate::utils::format::{format_duration_secs, format_trigger, progress_bar};

// ─── ANSI helpers ────────────────────────────────────────────────────────────

macro_rules! println_colored {
    ($color:expr, $($arg:tt)*) => {{
        print!("{}", $color);
        print!($($arg)*);
        println!("\x1b[0m");
    }};
}

const GREEN: &str = "\x1b[32m";
const AMBER: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const GOLD: &str = "\x1b[38;2;196;160;68m";

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn today() -> DayKey {
    DayKey::from(Local::now().date_naive())
}

fn alarm_book(conn: &Connection) -> AlarmBook<'_, SqliteTriggerQueue<'_>> {
    AlarmBook::new(conn, SqliteTriggerQueue::new(conn))
}

fn open_ledger(conn: &Connection) -> Result<ChallengeLedger<SqliteLedgerStore<'_>>> {
    ChallengeLedger::load(SqliteLedgerStore::new(conn)).context("Loading challenge log")
}

// ─── Status overview ─────────────────────────────────────────────────────────

pub fn handle_status(conn: &Connection) -> Result<()> {
    let now = now();
    let today = today();
    let ledger = open_ledger(conn)?;

    println!();
    println_colored!(GOLD, "  nooze · {}", now.format("%a %Y-%m-%d"));
    println!();

    let upcoming = alarm_book(conn).upcoming(now)?;
    match upcoming.first().map(|(at, _)| *at) {
        Some(at) => println_colored!(
            BOLD,
            "  Next alarm:  {} (in {})",
            format_trigger(at, now),
            format_duration_secs((at - now).num_seconds())
        ),
        None => println_colored!(DIM, "  Next alarm:  none set"),
    }

    match current_challenge(conn)?.filter(|c| c.active) {
        Some(challenge) => {
            let pct = calculate_progress_percentage(&challenge, now);
            println!(
                "  Challenge:   day {} of {}  {} {}%",
                current_day(&challenge, now),
                challenge.duration.days(),
                progress_bar(pct, 100, 20),
                pct
            );
            println!(
                "  Completed:   {} days",
                ledger.completed_days_count(&challenge)
            );
        }
        None => println_colored!(DIM, "  Challenge:   not running"),
    }

    let streak = ledger.streak(today);
    println!(
        "  Streak:      {} days current  |  {} days best",
        streak.current, streak.best
    );
    println!();
    print_week(&ledger.week_strip(today));
    println!();
    Ok(())
}

// ─── Alarms ──────────────────────────────────────────────────────────────────

pub fn handle_alarm(conn: &Connection, config: &AppConfig, action: &AlarmCommands) -> Result<()> {
    let book = alarm_book(conn);
    let now = now();

    match action {
        AlarmCommands::Set { time, days } => {
            let wake_time = match time {
                Some(t) => t.parse::<WakeTime>()?,
                None => config.alarm.default_wake_time,
            };
            let repeat = match days {
                Some(d) => d.parse::<RepeatSet>()?,
                None => config.alarm.default_repeat,
            };
            let alarm = book.add(wake_time, repeat, now)?;
            println_colored!(
                GREEN,
                "  ✓ Alarm {} set for {} ({})",
                alarm.id,
                alarm.wake_time,
                alarm.repeat.label()
            );
            if let Some(at) = alarm.next_trigger {
                println_colored!(DIM, "    Rings {}", format_trigger(at, now));
            }
        }
        AlarmCommands::List => {
            let alarms = book.list()?;
            println!();
            if alarms.is_empty() {
                println_colored!(DIM, "  No alarms. Add one with `nooze alarm set HH:MM`.");
            } else {
                println_colored!(GOLD, "  Alarms");
                println!();
                for alarm in &alarms {
                    let next = next_ring(now, alarm)?
                        .map(|at| format_trigger(at, now))
                        .unwrap_or_else(|| "-".to_string());
                    let line = format!(
                        "  #{:<4} {}  {:<22} {}",
                        alarm.id,
                        alarm.wake_time,
                        alarm.repeat.label(),
                        next
                    );
                    if alarm.active {
                        println!("{}", line);
                    } else {
                        println_colored!(DIM, "{}  (off)", line);
                    }
                }
            }
            println!();
        }
        AlarmCommands::Cancel { id } => {
            book.remove(*id)?;
            println_colored!(GREEN, "  ✓ Alarm {} deleted", id);
        }
        AlarmCommands::Clear => {
            let removed = book.clear()?;
            println_colored!(GREEN, "  ✓ Deleted {} alarms", removed);
        }
        AlarmCommands::Enable { id } => {
            let alarm = book.set_active(*id, true, now)?;
            if let Some(at) = alarm.next_trigger {
                println_colored!(GREEN, "  ✓ Alarm {} on, rings {}", id, format_trigger(at, now));
            }
        }
        AlarmCommands::Disable { id } => {
            book.set_active(*id, false, now)?;
            println_colored!(AMBER, "  Alarm {} off", id);
        }
    }
    Ok(())
}

pub fn handle_next(conn: &Connection) -> Result<()> {
    let now = now();
    let upcoming = alarm_book(conn).upcoming(now)?;

    println!();
    if upcoming.is_empty() {
        println_colored!(DIM, "  No active alarms");
    }
    for (at, alarm) in &upcoming {
        let secs = (*at - now).num_seconds();
        println!(
            "  #{:<4} {:<22} in {}",
            alarm.id,
            format_trigger(*at, now),
            format_duration_secs(secs)
        );
    }
    println!();
    Ok(())
}

// ─── Ring ────────────────────────────────────────────────────────────────────

const PENDING_COMPLETION_KEY: &str = "pending_completion";

/// A solved alarm that still has to be written to the challenge log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionEvent {
    pub date_key: DayKey,
    pub actual_wake_time: DateTime<FixedOffset>,
}

pub fn record_completion(conn: &Connection, event: &CompletionEvent) -> Result<()> {
    let raw = serde_json::to_string(event)?;
    MetaRepo::set(conn, PENDING_COMPLETION_KEY, &raw)?;
    Ok(())
}

/// Mark the day of a recorded completion as completed and forget the record.
/// Returns the day that was marked, if any.
pub fn apply_pending_completion(conn: &Connection) -> Result<Option<DayKey>> {
    let Some(raw) = MetaRepo::get(conn, PENDING_COMPLETION_KEY)? else {
        return Ok(None);
    };
    let event: CompletionEvent = match serde_json::from_str(&raw) {
        Ok(event) => event,
        Err(e) => {
            warn!("dropping unreadable pending completion: {}", e);
            MetaRepo::delete(conn, PENDING_COMPLETION_KEY)?;
            return Ok(None);
        }
    };

    let mut ledger = open_ledger(conn)?;
    ledger.mark_day(
        event.date_key,
        DayStatus::Completed,
        Some(MarkInfo {
            actual_wake_time: Some(event.actual_wake_time),
            solved_math: Some(true),
        }),
    )?;
    MetaRepo::delete(conn, PENDING_COMPLETION_KEY)?;
    info!("completion for {} applied", event.date_key);
    Ok(Some(event.date_key))
}

/// Ask the gate's questions until all are answered. `false` when input runs
/// out first.
pub fn run_gate<R: BufRead, W: Write>(
    gate: &mut MathGate,
    input: &mut R,
    out: &mut W,
) -> Result<bool> {
    while let Some(question) = gate.current().copied() {
        let (n, total) = gate.position();
        write!(out, "  [{}/{}] {} ", n, total, question)?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(false);
        }
        match gate.answer(&line) {
            Attempt::Correct => writeln!(out, "  {}✓\x1b[0m", GREEN)?,
            Attempt::Wrong => writeln!(out, "  {}✗ Try again\x1b[0m", RED)?,
            Attempt::Invalid => writeln!(out, "  {}Numbers only\x1b[0m", AMBER)?,
            Attempt::Solved => writeln!(out, "  {}✓ All solved\x1b[0m", GREEN)?,
        }
    }
    Ok(true)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingOutcome {
    /// No alarm due and no practice asked for.
    NotRinging,
    /// Input ran out before the last answer.
    GaveUp,
    /// A forced round with no alarm behind it. Nothing is logged.
    Practised,
    /// The ringing alarm was dismissed and its day marked completed.
    Dismissed { alarm_id: i64, day: DayKey },
}

/// Find the alarm ringing at `rang_at` and make the user get through `gate`
/// to stop it. With `force` and nothing due the round is practice only.
pub fn ring<R: BufRead, W: Write>(
    conn: &Connection,
    tolerance: Duration,
    force: bool,
    gate: &mut MathGate,
    rang_at: NaiveDateTime,
    input: &mut R,
    out: &mut W,
) -> Result<RingOutcome> {
    let book = alarm_book(conn);
    let alarm_id = match book.trigger().launched_by_alarm(rang_at)? {
        Some(id) => Some(id),
        None => book.find_triggered(rang_at, tolerance)?.map(|a| a.id),
    };

    let total = gate.position().1;
    match alarm_id {
        Some(_) => writeln!(
            out,
            "\n  {}⏰ Wake up! Solve {} sums to stop the alarm.\x1b[0m\n",
            GOLD, total
        )?,
        None if force => writeln!(
            out,
            "\n  {}Practice round, {} sums. Nothing is logged.\x1b[0m\n",
            DIM, total
        )?,
        None => return Ok(RingOutcome::NotRinging),
    }

    if !run_gate(gate, input, out)? {
        return Ok(RingOutcome::GaveUp);
    }
    let Some(alarm_id) = alarm_id else {
        return Ok(RingOutcome::Practised);
    };

    let woke_at = Local::now().fixed_offset();
    let day = DayKey::from(woke_at.date_naive());
    record_completion(
        conn,
        &CompletionEvent {
            date_key: day,
            actual_wake_time: woke_at,
        },
    )?;
    apply_pending_completion(conn)?;

    book.trigger().acknowledge(alarm_id)?;
    book.rearm(alarm_id, rang_at)?;
    info!("alarm {} dismissed", alarm_id);
    Ok(RingOutcome::Dismissed { alarm_id, day })
}

pub fn handle_ring(conn: &Connection, config: &AppConfig, force: bool) -> Result<()> {
    let mut gate = MathGate::generate(
        &mut rand::thread_rng(),
        config.puzzle.questions,
        config.puzzle.max_operand,
    );
    let tolerance = Duration::seconds(config.alarm.trigger_tolerance_secs);
    let stdin = io::stdin();
    let outcome = ring(
        conn,
        tolerance,
        force,
        &mut gate,
        now(),
        &mut stdin.lock(),
        &mut io::stdout(),
    )?;

    match outcome {
        RingOutcome::NotRinging => {
            println_colored!(DIM, "  No alarm is ringing. Use --force to practise anyway.");
            return Ok(());
        }
        RingOutcome::GaveUp => bail!("Alarm not dismissed"),
        RingOutcome::Practised => println_colored!(DIM, "  Practice done, the log is unchanged"),
        RingOutcome::Dismissed { alarm_id, day } => {
            println_colored!(GREEN, "  ✓ {} marked as completed", day);
            let now = now();
            match alarm_book(conn).get(alarm_id)?.next_trigger {
                Some(at) => println_colored!(
                    DIM,
                    "    Alarm {} rings again {}",
                    alarm_id,
                    format_trigger(at, now)
                ),
                None => println_colored!(DIM, "    One-time alarm {} switched off", alarm_id),
            }
        }
    }
    if gate.wrong_answers() > 0 {
        println_colored!(DIM, "    {} wrong answers along the way", gate.wrong_answers());
    }
    Ok(())
}

// ─── Challenge ───────────────────────────────────────────────────────────────

pub fn handle_challenge(
    conn: &Connection,
    config: &AppConfig,
    action: &ChallengeCommands,
) -> Result<()> {
    match action {
        ChallengeCommands::Start {
            duration,
            wake,
            start,
            motivation,
            activities,
            experience,
            obstacle,
            routine,
        } => {
            let duration = match duration {
                Some(days) => ChallengeDuration::try_from(*days)?,
                None => config.challenge.default_duration,
            };
            let wake_up_time = match wake {
                Some(w) => w.parse::<WakeTime>()?,
                None => config.alarm.default_wake_time,
            };
            let start_date = start.as_deref().map(DayKey::parse).transpose()?;
            let challenge = start_challenge(
                conn,
                ChallengeOptions {
                    wake_up_time: Some(wake_up_time),
                    duration: Some(duration),
                    start_date,
                    profile: ChallengeProfile {
                        motivation: motivation.clone(),
                        activities: activities.clone(),
                        past_experience: experience.clone(),
                        obstacle: obstacle.clone(),
                        routine_rating: routine.clone(),
                    },
                },
                today(),
            )?;
            println_colored!(
                GREEN,
                "  ✓ {}-day challenge started on {}, wake up at {}",
                challenge.duration.days(),
                challenge.start_date,
                challenge.wake_up_time
            );
        }
        ChallengeCommands::End => match end_challenge(conn)? {
            Some(challenge) => println_colored!(AMBER, "  Challenge {} ended", challenge.id),
            None => println_colored!(DIM, "  No challenge is running"),
        },
        ChallengeCommands::Status => {
            let Some(challenge) = current_challenge(conn)? else {
                println_colored!(DIM, "  No challenge yet. Start one with `nooze challenge start`.");
                return Ok(());
            };
            let now = now();
            let ledger = open_ledger(conn)?;
            let completed = ledger.completed_days_count(&challenge);
            let pct = calculate_progress_percentage(&challenge, now);

            println!();
            println_colored!(
                GOLD,
                "  {}-day challenge from {}{}",
                challenge.duration.days(),
                challenge.start_date,
                if challenge.active { "" } else { " (ended)" }
            );
            println!();
            println!("  Wake time:   {}", challenge.wake_up_time);
            println!(
                "  Progress:    day {} of {}  {} {}%",
                current_day(&challenge, now),
                challenge.duration.days(),
                progress_bar(pct, 100, 20),
                pct
            );
            println!(
                "  Completed:   {} days ({:.2}%)",
                completed,
                completed_percentage(completed, &challenge)
            );
            if is_challenge_completed(&challenge, now) {
                println_colored!(GREEN, "  ✓ Challenge finished");
            } else {
                println!("  Remaining:   {} days", days_remaining(&challenge, now));
            }
            let profile = &challenge.profile;
            for (label, value) in [
                ("Why:", &profile.motivation),
                ("Before:", &profile.past_experience),
                ("Obstacle:", &profile.obstacle),
                ("Mornings:", &profile.routine_rating),
            ] {
                if !value.is_empty() {
                    println_colored!(DIM, "  {:<12} {}", label, value);
                }
            }
            for activity in &profile.activities {
                println_colored!(DIM, "  · {}", activity);
            }
            println!();
        }
    }
    Ok(())
}

// ─── Ledger ──────────────────────────────────────────────────────────────────

pub fn handle_mark(conn: &Connection, args: &[String]) -> Result<()> {
    let (date, status) = match args {
        [status] => (None, status),
        [date, status] => (Some(date), status),
        _ => bail!("Usage: nooze mark [YYYY-MM-DD] completed|missed|pending"),
    };
    let status = status.parse::<DayStatus>()?;
    let key = match date {
        Some(d) => DayKey::parse(d)?,
        None => today(),
    };

    let mut ledger = open_ledger(conn)?;
    ledger.mark_day(key, status, None)?;
    let color = match status {
        DayStatus::Completed => GREEN,
        DayStatus::Missed => RED,
        DayStatus::Pending => AMBER,
    };
    println_colored!(color, "  {} marked as {}", key, status);
    Ok(())
}

pub fn handle_skip(conn: &Connection) -> Result<()> {
    let key = today();
    open_ledger(conn)?.mark_day(key, DayStatus::Missed, None)?;
    println_colored!(RED, "  ✗ {} marked as missed", key);
    Ok(())
}

pub fn handle_stats(conn: &Connection) -> Result<()> {
    let today = today();
    let ledger = open_ledger(conn)?;
    let streak = ledger.streak(today);
    let entries = ledger.entries();
    let total_completed = entries
        .values()
        .filter(|e| e.status == DayStatus::Completed)
        .count();
    let total_missed = entries
        .values()
        .filter(|e| e.status == DayStatus::Missed)
        .count();

    println!();
    println_colored!(GOLD, "  Statistics");
    println!();
    println_colored!(
        BOLD,
        "  Streak:      {} days current  |  {} days best",
        streak.current,
        streak.best
    );
    println!("  Logged:      {} completed, {} missed", total_completed, total_missed);
    if let Some(challenge) = current_challenge(conn)?.filter(|c| c.active) {
        println!(
            "  Challenge:   {} of {} days completed",
            ledger.completed_days_count(&challenge),
            challenge.duration.days()
        );
    }
    println!();
    print_week(&ledger.week_strip(today));
    println!();
    Ok(())
}

fn print_week(strip: &WeekStrip) {
    println_colored!(DIM, "  This week   S  M  T  W  T  F  S");
    let cells: String = strip
        .days
        .iter()
        .map(|d| {
            let icon = match d.status {
                Some(DayStatus::Completed) => format!("{}●\x1b[0m", GREEN),
                Some(DayStatus::Missed) => format!("{}✗\x1b[0m", RED),
                Some(DayStatus::Pending) => format!("{}◑\x1b[0m", AMBER),
                None => format!("{}○\x1b[0m", DIM),
            };
            if d.is_today {
                format!("[{}]", icon)
            } else {
                format!(" {} ", icon)
            }
        })
        .collect();
    println!("             {}", cells);
    println_colored!(
        DIM,
        "              {} completed, {} missed",
        strip.completed(),
        strip.missed()
    );
}

// ─── Export / import ─────────────────────────────────────────────────────────

pub fn handle_export(conn: &Connection, path: Option<&Path>) -> Result<()> {
    let ledger = open_ledger(conn)?;
    match path {
        Some(path) => {
            JsonLedgerFile::new(path)
                .save_ledger(ledger.entries())
                .with_context(|| format!("Writing {:?}", path))?;
            println_colored!(GREEN, "  ✓ Exported {} days to {}", ledger.len(), path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(ledger.entries())?),
    }
    Ok(())
}

pub fn handle_import(conn: &Connection, path: &Path) -> Result<()> {
    if !path.exists() {
        bail!("No such file: {}", path.display());
    }
    let entries = JsonLedgerFile::new(path)
        .load_ledger()
        .with_context(|| format!("Reading {:?}", path))?;
    let mut ledger = open_ledger(conn)?;
    ledger.replace_all(entries)?;
    println_colored!(GREEN, "  ✓ Imported {} days", ledger.len());
    Ok(())
}

// ─── Reset ───────────────────────────────────────────────────────────────────

pub fn handle_reset(conn: &Connection, yes: bool) -> Result<()> {
    if !yes {
        let answer = prompt("  Delete all alarms, challenges and log entries? [y/N] ")?;
        if !matches!(answer.trim(), "y" | "Y" | "yes") {
            println_colored!(DIM, "  Nothing deleted");
            return Ok(());
        }
    }

    let alarms = alarm_book(conn).clear()?;
    TriggerRepo::clear(conn)?;
    ChallengeRepo::clear(conn)?;
    open_ledger(conn)?.clear()?;
    MetaRepo::delete(conn, PENDING_COMPLETION_KEY)?;
    info!("reset: {} alarms removed", alarms);
    println_colored!(GREEN, "  ✓ All local data cleared");
    Ok(())
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    io::stdout().flush()?;
    let mut buf = String::new();
    io::stdin().lock().read_line(&mut buf)?;
    Ok(buf.trim_end_matches('\n').trim_end_matches('\r').to_string())
}
