//! Tag model.

use serde::{Deserialize, Serialize};

use super::{require_max_len, require_non_empty, TagId, ValidationError};

/// Upper bound on a tag name, in characters.
pub const TAG_NAME_MAX_LEN: usize = 50;

/// A named label attachable to expenses and activities.
///
/// Names are unique across all tags; the editing service enforces this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
}

impl Tag {
    pub fn new(id: TagId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Names are 1..=50 ASCII letters, digits, `-` or `_`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("name", &self.name)?;
        require_max_len("name", &self.name, TAG_NAME_MAX_LEN)?;
        let valid = self
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(ValidationError::InvalidCharacters {
                field: "name",
                value: self.name.clone(),
            });
        }
        Ok(())
    }
}

/// Request body for creating or renaming a tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagRequest {
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(name: &str) -> Tag {
        Tag::new(TagId(1), name)
    }

    #[test]
    fn test_valid_names() {
        assert!(tag("good-tag_1").validate().is_ok());
        assert!(tag("work").validate().is_ok());
        assert!(tag(&"a".repeat(TAG_NAME_MAX_LEN)).validate().is_ok());
    }

    #[test]
    fn test_invalid_characters() {
        assert_eq!(
            tag("bad$tag").validate(),
            Err(ValidationError::InvalidCharacters {
                field: "name",
                value: "bad$tag".to_string()
            })
        );
        assert!(tag("with space").validate().is_err());
        assert!(tag("café").validate().is_err());
    }

    #[test]
    fn test_empty_and_long_names() {
        assert_eq!(
            tag("").validate(),
            Err(ValidationError::Empty { field: "name" })
        );
        assert_eq!(
            tag(&"a".repeat(TAG_NAME_MAX_LEN + 1)).validate(),
            Err(ValidationError::TooLong {
                field: "name",
                max: TAG_NAME_MAX_LEN
            })
        );
    }
}
