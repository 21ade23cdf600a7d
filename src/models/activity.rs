//! Activity model.

use std::time::Duration;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use super::{
    duration_secs, require_max_len, require_non_empty, require_storable_time, ActivityId, Expense, Tag, TagId,
    ValidationError,
};

pub const ACTIVITY_LABEL_MAX_LEN: usize = 100;
pub const ACTIVITY_PLACE_MAX_LEN: usize = 100;
pub const ACTIVITY_DESCRIPTION_MAX_LEN: usize = 1000;
/// One leap year.
pub const ACTIVITY_DURATION_MAX_SECS: u64 = 366 * 24 * 3600;

/// A logged life event.
///
/// `expenses` is populated by the store on every read and ignored on writes:
/// ownership is recorded on the expense side through its `activity_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: ActivityId,
    pub label: String,
    #[serde(default)]
    pub place: String,
    #[serde(default)]
    pub description: String,
    pub time: DateTime<Utc>,
    #[serde(with = "duration_secs")]
    pub duration: Duration,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub expenses: Vec<Expense>,
}

impl Activity {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("label", &self.label)?;
        require_max_len("label", &self.label, ACTIVITY_LABEL_MAX_LEN)?;
        require_max_len("place", &self.place, ACTIVITY_PLACE_MAX_LEN)?;
        require_max_len("description", &self.description, ACTIVITY_DESCRIPTION_MAX_LEN)?;
        require_storable_time("time", &self.time)?;
        if self.duration.as_secs() > ACTIVITY_DURATION_MAX_SECS {
            return Err(ValidationError::TooLarge {
                field: "duration",
                max: ACTIVITY_DURATION_MAX_SECS,
            });
        }
        Ok(())
    }

    pub fn has_tag(&self, id: TagId) -> bool {
        self.tags.iter().any(|t| t.id == id)
    }
}

/// Request body for creating or editing an activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRequest {
    pub label: String,
    #[serde(default)]
    pub place: String,
    #[serde(default)]
    pub description: String,
    pub time: DateTime<Utc>,
    /// Duration in whole seconds.
    #[serde(with = "duration_secs")]
    pub duration: Duration,
    #[serde(default)]
    pub tag_ids: Vec<TagId>,
}

impl ActivityRequest {
    pub fn to_activity(&self, id: ActivityId) -> Activity {
        Activity {
            id,
            label: self.label.trim().to_string(),
            place: self.place.trim().to_string(),
            description: self.description.clone(),
            time: self.time.trunc_subsecs(6),
            duration: self.duration,
            tags: Vec::new(),
            expenses: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn activity() -> Activity {
        Activity {
            id: ActivityId(1),
            label: "Hiking".to_string(),
            place: "Mountains".to_string(),
            description: String::new(),
            time: Utc::now(),
            duration: Duration::from_secs(3 * 3600),
            tags: Vec::new(),
            expenses: Vec::new(),
        }
    }

    #[test]
    fn test_valid_activity() {
        assert!(activity().validate().is_ok());
    }

    #[test]
    fn test_label_required() {
        let act = Activity {
            label: String::new(),
            ..activity()
        };
        assert_eq!(act.validate(), Err(ValidationError::Empty { field: "label" }));
    }

    #[test]
    fn test_description_too_long() {
        let act = Activity {
            description: "x".repeat(ACTIVITY_DESCRIPTION_MAX_LEN + 1),
            ..activity()
        };
        assert_eq!(
            act.validate(),
            Err(ValidationError::TooLong {
                field: "description",
                max: ACTIVITY_DESCRIPTION_MAX_LEN
            })
        );
    }

    #[test]
    fn test_duration_serialized_as_seconds() {
        let json = serde_json::to_value(activity()).unwrap();
        assert_eq!(json["duration"], 10800);

        let req: ActivityRequest = serde_json::from_str(
            r#"{"label":"Run","time":"2024-03-01T07:00:00Z","duration":1800}"#,
        )
        .unwrap();
        assert_eq!(req.duration, Duration::from_secs(1800));
        assert_eq!(req.place, "");
    }

    #[test]
    fn test_duration_upper_bound() {
        let longest = Activity {
            duration: Duration::from_secs(ACTIVITY_DURATION_MAX_SECS),
            ..activity()
        };
        assert!(longest.validate().is_ok());

        for secs in [ACTIVITY_DURATION_MAX_SECS + 1, u64::MAX] {
            let act = Activity {
                duration: Duration::from_secs(secs),
                ..activity()
            };
            assert_eq!(
                act.validate(),
                Err(ValidationError::TooLarge {
                    field: "duration",
                    max: ACTIVITY_DURATION_MAX_SECS
                })
            );
        }
    }

    #[test]
    fn test_time_year_bounds() {
        let far = Activity {
            time: "+10000-06-01T00:00:00Z".parse().unwrap(),
            ..activity()
        };
        assert!(matches!(
            far.validate(),
            Err(ValidationError::YearOutOfRange { field: "time", .. })
        ));
    }
}
