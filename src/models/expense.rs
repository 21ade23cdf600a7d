//! Expense model.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use super::{
    require_max_len, require_non_empty, require_storable_time, ActivityId, ExpenseId, Tag, TagId, ValidationError,
};

pub const EXPENSE_LABEL_MAX_LEN: usize = 100;
pub const EXPENSE_UNIT_MAX_LEN: usize = 10;

/// A monetary record, optionally owned by one activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: ExpenseId,
    pub label: String,
    pub time: DateTime<Utc>,
    pub value: f64,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_id: Option<ActivityId>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl Expense {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("label", &self.label)?;
        require_max_len("label", &self.label, EXPENSE_LABEL_MAX_LEN)?;
        require_non_empty("unit", &self.unit)?;
        require_max_len("unit", &self.unit, EXPENSE_UNIT_MAX_LEN)?;
        require_storable_time("time", &self.time)?;
        if !self.value.is_finite() || self.value < 0.0 {
            return Err(ValidationError::Negative { field: "value" });
        }
        Ok(())
    }

    /// Whether the given tag is attached to this expense.
    pub fn has_tag(&self, id: TagId) -> bool {
        self.tags.iter().any(|t| t.id == id)
    }
}

/// Request body for creating or editing an expense.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseRequest {
    pub label: String,
    pub time: DateTime<Utc>,
    pub value: f64,
    pub unit: String,
    #[serde(default)]
    pub activity_id: Option<ActivityId>,
    #[serde(default)]
    pub tag_ids: Vec<TagId>,
}

impl ExpenseRequest {
    /// Builds the entity with no tags attached; tag IDs are resolved by the
    /// editing service. Time is cut to microseconds, the stored precision.
    pub fn to_expense(&self, id: ExpenseId) -> Expense {
        Expense {
            id,
            label: self.label.trim().to_string(),
            time: self.time.trunc_subsecs(6),
            value: self.value,
            unit: self.unit.trim().to_string(),
            activity_id: self.activity_id,
            tags: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expense() -> Expense {
        Expense {
            id: ExpenseId(1),
            label: "Lunch".to_string(),
            time: Utc::now(),
            value: 12.5,
            unit: "EUR".to_string(),
            activity_id: None,
            tags: vec![Tag::new(TagId(3), "food")],
        }
    }

    #[test]
    fn test_valid_expense() {
        assert!(expense().validate().is_ok());
        let free = Expense {
            value: 0.0,
            ..expense()
        };
        assert!(free.validate().is_ok());
    }

    #[test]
    fn test_empty_label_rejected() {
        let exp = Expense {
            label: "  ".to_string(),
            ..expense()
        };
        assert_eq!(
            exp.validate(),
            Err(ValidationError::Empty { field: "label" })
        );
    }

    #[test]
    fn test_negative_or_nan_value_rejected() {
        for value in [-0.01, f64::NAN, f64::INFINITY] {
            let exp = Expense { value, ..expense() };
            assert_eq!(
                exp.validate(),
                Err(ValidationError::Negative { field: "value" })
            );
        }
    }

    #[test]
    fn test_unit_required() {
        let exp = Expense {
            unit: String::new(),
            ..expense()
        };
        assert_eq!(exp.validate(), Err(ValidationError::Empty { field: "unit" }));
    }

    #[test]
    fn test_has_tag() {
        let exp = expense();
        assert!(exp.has_tag(TagId(3)));
        assert!(!exp.has_tag(TagId(4)));
    }

    #[test]
    fn test_request_serde_defaults() {
        let req: ExpenseRequest = serde_json::from_str(
            r#"{"label":" Taxi ","time":"2024-01-02T10:00:00Z","value":20,"unit":"EUR"}"#,
        )
        .unwrap();
        assert!(req.activity_id.is_none());
        assert!(req.tag_ids.is_empty());

        let exp = req.to_expense(ExpenseId(9));
        assert_eq!(exp.id, ExpenseId(9));
        assert_eq!(exp.label, "Taxi");
        assert!(exp.tags.is_empty());
    }

    #[test]
    fn test_time_outside_four_digit_years_rejected() {
        let req: ExpenseRequest = serde_json::from_str(
            r#"{"label":"Far","time":"+10000-01-01T00:00:00Z","value":1,"unit":"EUR"}"#,
        )
        .unwrap();
        assert_eq!(
            req.to_expense(ExpenseId(1)).validate(),
            Err(ValidationError::YearOutOfRange {
                field: "time",
                min: 1,
                max: 9999
            })
        );

        let last = Expense {
            time: "9999-12-31T23:59:59.999999Z".parse().unwrap(),
            ..expense()
        };
        assert!(last.validate().is_ok());
    }

    #[test]
    fn test_request_time_truncated_to_micros() {
        let req: ExpenseRequest = serde_json::from_str(
            r#"{"label":"Tea","time":"2024-01-02T10:00:00.123456789Z","value":2,"unit":"EUR"}"#,
        )
        .unwrap();
        let exp = req.to_expense(ExpenseId(1));
        assert_eq!(exp.time, "2024-01-02T10:00:00.123456Z".parse::<DateTime<Utc>>().unwrap());
    }
}
