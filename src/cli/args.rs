use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "nooze",
    version,
    author,
    about = "Wake-up alarms that only stop for a solved sum, and a challenge to keep you at it"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Alarm management
    Alarm {
        #[command(subcommand)]
        action: AlarmCommands,
    },
    /// Show when each active alarm rings next
    Next,
    /// Dismiss a ringing alarm by solving the math questions
    Ring {
        /// Run the questions even when no alarm is due
        #[arg(long)]
        force: bool,
    },
    /// Wake-up challenge lifecycle
    Challenge {
        #[command(subcommand)]
        action: ChallengeCommands,
    },
    /// Record a day's outcome
    Mark {
        /// [YYYY-MM-DD] completed|missed|pending (the day defaults to today)
        #[arg(required = true, num_args = 1..=2, value_name = "DATE STATUS")]
        args: Vec<String>,
    },
    /// Mark today as missed
    Skip,
    /// Show streak, completed days and this week
    Stats,
    /// Write the challenge log as JSON
    Export {
        /// Output file (stdout when omitted)
        path: Option<PathBuf>,
    },
    /// Replace the challenge log with a JSON export
    Import {
        /// File written by `nooze export`
        path: PathBuf,
    },
    /// Delete all alarms, challenges and log entries
    Reset {
        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum AlarmCommands {
    /// Add an alarm
    Set {
        /// Wake time as HH:MM (defaults to the configured wake time)
        time: Option<String>,
        /// Repeat days: "mon,wed,fri", "weekdays", "weekends", "daily" or "once"
        #[arg(long)]
        days: Option<String>,
    },
    /// List all alarms
    List,
    /// Delete an alarm
    Cancel {
        /// Alarm id
        id: i64,
    },
    /// Delete every alarm
    Clear,
    /// Turn an alarm back on
    Enable {
        /// Alarm id
        id: i64,
    },
    /// Turn an alarm off without deleting it
    Disable {
        /// Alarm id
        id: i64,
    },
}

#[derive(Subcommand, Debug)]
pub enum ChallengeCommands {
    /// Start a new challenge, ending any running one
    Start {
        /// Length in days: 90 or 365
        #[arg(long)]
        duration: Option<u32>,
        /// Target wake time as HH:MM
        #[arg(long)]
        wake: Option<String>,
        /// First day as YYYY-MM-DD (defaults to today)
        #[arg(long)]
        start: Option<String>,
        /// Why you are doing this
        #[arg(long, default_value = "")]
        motivation: String,
        /// Morning activity (repeatable)
        #[arg(long = "activity")]
        activities: Vec<String>,
        /// Have you tried waking up early before?
        #[arg(long, default_value = "")]
        experience: String,
        /// What usually stops you
        #[arg(long, default_value = "")]
        obstacle: String,
        /// How your mornings go today
        #[arg(long, default_value = "")]
        routine: String,
    },
    /// End the running challenge
    End,
    /// Show progress of the current challenge
    Status,
}
