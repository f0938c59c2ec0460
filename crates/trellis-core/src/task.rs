use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "low" | "l" => Some(Priority::Low),
            "medium" | "med" | "m" => Some(Priority::Medium),
            "high" | "h" => Some(Priority::High),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }
}

/// The sole persisted entity of the board. `id` is unique and immutable after
/// creation; `status`/`sub_status` form a two-level workflow state whose
/// pairing is convention held in configuration data, not validated here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub assignee: String,

    #[serde(default)]
    pub client: String,

    pub priority: Priority,

    pub due: DateTime<Utc>,

    pub created: DateTime<Utc>,

    /// Completion percentage, held in 0..=100 by every writer.
    pub progress: u8,

    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub sub_status: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub counter: Option<u32>,
}

impl Task {
    pub fn new(title: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            description: String::new(),
            assignee: String::new(),
            client: String::new(),
            priority: Priority::Medium,
            due: now,
            created: now,
            progress: 0,
            status: String::new(),
            sub_status: String::new(),
            tags: vec![],
            counter: None,
        }
    }

    /// Overdue is derived, never stored: due date passed while progress is
    /// still below 100.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.due < now && self.progress < 100
    }

    pub fn set_progress(&mut self, progress: u8) {
        self.progress = clamp_progress(progress);
    }
}

pub fn clamp_progress(progress: u8) -> u8 {
    progress.min(100)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{Priority, Task};

    #[test]
    fn overdue_requires_incomplete_progress() {
        let now = Utc.with_ymd_and_hms(2026, 2, 16, 5, 0, 0).unwrap();
        let mut task = Task::new("cut the trailer".to_string(), now);
        task.due = now - Duration::hours(1);
        task.progress = 40;
        assert!(task.is_overdue(now));

        task.progress = 100;
        assert!(!task.is_overdue(now));

        task.progress = 40;
        task.due = now + Duration::hours(1);
        assert!(!task.is_overdue(now));
    }

    #[test]
    fn progress_is_clamped_on_write() {
        let now = Utc.with_ymd_and_hms(2026, 2, 16, 5, 0, 0).unwrap();
        let mut task = Task::new("grade footage".to_string(), now);
        task.set_progress(250);
        assert_eq!(task.progress, 100);
    }

    #[test]
    fn priority_parses_short_and_long_forms() {
        assert_eq!(Priority::parse("H"), Some(Priority::High));
        assert_eq!(Priority::parse("medium"), Some(Priority::Medium));
        assert_eq!(Priority::parse("urgent"), None);
    }
}
