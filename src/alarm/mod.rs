pub mod book;
pub mod calculator;
pub mod trigger;

pub use book::AlarmBook;
pub use calculator::{next_ring, next_trigger, next_trigger_for};
pub use trigger::{AlarmTrigger, SqliteTriggerQueue};
