//! Terminal rendering: one line per entity, or JSON with `--json`.

use std::time::Duration;

use anyhow::Result;
use serde::Serialize;

use crate::models::{Activity, Expense, Tag};

#[derive(Debug, Clone, Copy)]
pub struct Output {
    json: bool,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    pub fn is_json(&self) -> bool {
        self.json
    }

    pub fn list<T: Serialize>(&self, items: &[T], line: impl Fn(&T) -> String) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(items)?);
        } else if items.is_empty() {
            println!("(none)");
        } else {
            for item in items {
                println!("{}", line(item));
            }
        }
        Ok(())
    }

    pub fn one<T: Serialize>(&self, item: &T, line: impl Fn(&T) -> String) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(item)?);
        } else {
            println!("{}", line(item));
        }
        Ok(())
    }

    /// Confirmation for writes without a body to show.
    pub fn done(&self, message: &str) {
        if self.json {
            println!("{}", serde_json::json!({ "ok": true, "message": message }));
        } else {
            println!("{message}");
        }
    }
}

pub fn tag_line(tag: &Tag) -> String {
    format!("#{:<5} {}", tag.id, tag.name)
}

pub fn expense_line(expense: &Expense) -> String {
    let mut line = format!(
        "#{:<5} {}  {:<30} {:>10.2} {}",
        expense.id,
        expense.time.format("%Y-%m-%d %H:%M"),
        expense.label,
        expense.value,
        expense.unit
    );
    if let Some(activity) = expense.activity_id {
        line.push_str(&format!("  (activity #{activity})"));
    }
    line.push_str(&tag_suffix(&expense.tags));
    line
}

pub fn activity_line(activity: &Activity) -> String {
    let mut line = format!(
        "#{:<5} {}  {:<30} {:>8}",
        activity.id,
        activity.time.format("%Y-%m-%d %H:%M"),
        activity.label,
        format_duration(activity.duration)
    );
    if !activity.place.is_empty() {
        line.push_str(&format!("  @ {}", activity.place));
    }
    if !activity.expenses.is_empty() {
        line.push_str(&format!("  ({} expense(s))", activity.expenses.len()));
    }
    line.push_str(&tag_suffix(&activity.tags));
    line
}

fn tag_suffix(tags: &[Tag]) -> String {
    if tags.is_empty() {
        return String::new();
    }
    let names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
    format!("  [{}]", names.join(", "))
}

/// Compact `1h30m`-style rendering.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, total % 3600 / 60, total % 60);
    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{hours}h"));
    }
    if minutes > 0 {
        out.push_str(&format!("{minutes}m"));
    }
    if seconds > 0 || out.is_empty() {
        out.push_str(&format!("{seconds}s"));
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::models::{ActivityId, ExpenseId, TagId};

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(0)), "0s");
        assert_eq!(format_duration(Duration::from_secs(45)), "45s");
        assert_eq!(format_duration(Duration::from_secs(5400)), "1h30m");
        assert_eq!(format_duration(Duration::from_secs(3661)), "1h1m1s");
    }

    #[test]
    fn test_expense_line() {
        let expense = Expense {
            id: ExpenseId(3),
            label: "Lunch".to_string(),
            time: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
            value: 12.5,
            unit: "EUR".to_string(),
            activity_id: Some(ActivityId(2)),
            tags: vec![Tag::new(TagId(1), "food"), Tag::new(TagId(4), "work")],
        };
        let line = expense_line(&expense);
        assert!(line.starts_with("#3 "));
        assert!(line.contains("2024-05-01 12:30"));
        assert!(line.contains("12.50 EUR"));
        assert!(line.contains("(activity #2)"));
        assert!(line.ends_with("[food, work]"));
    }

    #[test]
    fn test_activity_line() {
        let activity = Activity {
            id: ActivityId(9),
            label: "Hike".to_string(),
            place: "Alps".to_string(),
            description: String::new(),
            time: Utc.with_ymd_and_hms(2024, 6, 2, 8, 0, 0).unwrap(),
            duration: Duration::from_secs(4 * 3600),
            tags: Vec::new(),
            expenses: Vec::new(),
        };
        let line = activity_line(&activity);
        assert!(line.contains("4h"));
        assert!(line.ends_with("@ Alps"));
    }
}
