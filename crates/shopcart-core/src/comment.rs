//! # Product Comments
//!
//! Free-text comments users leave on a product. A comment belongs to one
//! product and one author; only the author may edit or delete it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::validation::{validate_owner_id, validate_product_id, ValidationResult};

/// Longest accepted comment body.
pub const MAX_COMMENT_LEN: usize = 2_000;

/// A stored comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub product_id: String,
    /// Author.
    pub user_id: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for posting a comment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewComment {
    pub user_id: String,
    pub body: String,
}

impl NewComment {
    pub fn new(user_id: impl Into<String>, body: impl Into<String>) -> Self {
        NewComment {
            user_id: user_id.into(),
            body: body.into(),
        }
    }

    /// Validates the input and builds the comment.
    pub fn into_comment(
        self,
        id: String,
        product_id: &str,
        now: DateTime<Utc>,
    ) -> ValidationResult<Comment> {
        validate_product_id(product_id)?;
        validate_owner_id(&self.user_id)?;
        validate_comment_body(&self.body)?;

        Ok(Comment {
            id,
            product_id: product_id.to_string(),
            user_id: self.user_id,
            body: self.body.trim().to_string(),
            created_at: now,
            updated_at: now,
        })
    }
}

/// Validates a comment body: non-blank, at most `MAX_COMMENT_LEN` characters.
pub fn validate_comment_body(body: &str) -> ValidationResult<()> {
    let body = body.trim();

    if body.is_empty() {
        return Err(ValidationError::required("comment"));
    }

    if body.chars().count() > MAX_COMMENT_LEN {
        return Err(ValidationError::TooLong {
            field: "comment".to_string(),
            max: MAX_COMMENT_LEN,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_comment_trims_body() {
        let comment = NewComment::new("alice", "  Great lamp!  ")
            .into_comment("c-1".to_string(), "p-1", Utc::now())
            .unwrap();

        assert_eq!(comment.body, "Great lamp!");
        assert_eq!(comment.user_id, "alice");
        assert_eq!(comment.product_id, "p-1");
        assert_eq!(comment.created_at, comment.updated_at);
    }

    #[test]
    fn test_comment_validation() {
        let err = NewComment::new("alice", "   ")
            .into_comment("c-1".to_string(), "p-1", Utc::now())
            .unwrap_err();
        assert_eq!(err, ValidationError::required("comment"));

        let err = NewComment::new("", "hi")
            .into_comment("c-1".to_string(), "p-1", Utc::now())
            .unwrap_err();
        assert_eq!(err, ValidationError::required("owner_id"));

        assert!(validate_comment_body(&"x".repeat(MAX_COMMENT_LEN)).is_ok());
        assert!(validate_comment_body(&"x".repeat(MAX_COMMENT_LEN + 1)).is_err());
    }
}
