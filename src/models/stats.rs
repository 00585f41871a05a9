use serde::{Deserialize, Serialize};

use crate::models::{DayKey, DayStatus};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streak {
    pub current: u32,
    pub best: u32,
}

/// One cell of the Sunday-to-Saturday strip shown on the status screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekDay {
    pub date: DayKey,
    pub status: Option<DayStatus>,
    pub is_today: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeekStrip {
    pub days: Vec<WeekDay>,
}

impl WeekStrip {
    pub fn new(days: Vec<WeekDay>) -> Self {
        Self { days }
    }

    pub fn completed(&self) -> u32 {
        self.days
            .iter()
            .filter(|d| d.status == Some(DayStatus::Completed))
            .count() as u32
    }

    pub fn missed(&self) -> u32 {
        self.days
            .iter()
            .filter(|d| d.status == Some(DayStatus::Missed))
            .count() as u32
    }
}
