//! # Comment Repository
//!
//! Comments on products. Only the author can edit or delete a comment;
//! for anyone else the comment does not exist.
//!
//! ```text
//! add(product_id, NewComment)   product must exist      → Comment
//! list_for_product(product_id)  oldest first            → Vec<Comment>
//! update(id, user_id, body)     WHERE id AND user_id    → Comment
//! delete(id, user_id)           WHERE id AND user_id    → ()
//! ```

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use shopcart_core::comment::{validate_comment_body, Comment, NewComment};

use crate::error::{DbError, DbResult};

const COMMENT_COLUMNS: &str = "id, product_id, user_id, body, created_at, updated_at";

fn comment_from_row(row: &SqliteRow) -> DbResult<Comment> {
    Ok(Comment {
        id: row.try_get("id")?,
        product_id: row.try_get("product_id")?,
        user_id: row.try_get("user_id")?,
        body: row.try_get("body")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Repository for product comments.
#[derive(Debug, Clone)]
pub struct CommentRepository {
    pool: SqlitePool,
}

impl CommentRepository {
    /// Creates a new CommentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CommentRepository { pool }
    }

    async fn product_exists(&self, product_id: &str) -> DbResult<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM products WHERE id = ?1")
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    /// Posts a comment on a product.
    ///
    /// ## Returns
    /// * `Err(DbError::Validation)` - Blank or oversized body, missing author
    /// * `Err(DbError::NotFound)` - Product doesn't exist
    pub async fn add(&self, product_id: &str, input: NewComment) -> DbResult<Comment> {
        let comment = input.into_comment(Uuid::new_v4().to_string(), product_id, Utc::now())?;

        if !self.product_exists(product_id).await? {
            return Err(DbError::not_found("Product", product_id));
        }

        debug!(product_id = %product_id, user_id = %comment.user_id, "Adding comment");

        sqlx::query(
            r#"
            INSERT INTO comments (id, product_id, user_id, body, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&comment.id)
        .bind(&comment.product_id)
        .bind(&comment.user_id)
        .bind(&comment.body)
        .bind(comment.created_at)
        .bind(comment.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(comment)
    }

    /// Gets a comment by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Comment>> {
        let sql = format!("SELECT {} FROM comments WHERE id = ?1", COMMENT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(comment_from_row).transpose()
    }

    /// Lists a product's comments, oldest first.
    pub async fn list_for_product(&self, product_id: &str) -> DbResult<Vec<Comment>> {
        if !self.product_exists(product_id).await? {
            return Err(DbError::not_found("Product", product_id));
        }

        let sql = format!(
            "SELECT {} FROM comments WHERE product_id = ?1 ORDER BY created_at, id",
            COMMENT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(comment_from_row).collect()
    }

    /// Replaces the body of the author's own comment.
    pub async fn update(&self, id: &str, user_id: &str, body: &str) -> DbResult<Comment> {
        validate_comment_body(body)?;
        debug!(id = %id, user_id = %user_id, "Updating comment");

        let result = sqlx::query(
            "UPDATE comments SET body = ?1, updated_at = ?2 WHERE id = ?3 AND user_id = ?4",
        )
        .bind(body.trim())
        .bind(Utc::now())
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Comment", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Comment", id))
    }

    /// Deletes the author's own comment.
    pub async fn delete(&self, id: &str, user_id: &str) -> DbResult<()> {
        debug!(id = %id, user_id = %user_id, "Deleting comment");

        let result = sqlx::query("DELETE FROM comments WHERE id = ?1 AND user_id = ?2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Comment", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use shopcart_core::catalog::NewProduct;
    use shopcart_core::ValidationError;

    async fn setup() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db
            .products()
            .insert(NewProduct {
                title: "Desk Lamp".to_string(),
                description: String::new(),
                categories: vec![],
                slug: None,
                price_cents: 4_999,
                discount_bps: 0,
                stock: 3,
                images: vec![],
            })
            .await
            .unwrap();
        (db, product.id)
    }

    #[tokio::test]
    async fn test_add_and_list() {
        let (db, product_id) = setup().await;
        let repo = db.comments();

        let first = repo
            .add(&product_id, NewComment::new("alice", "Bright enough"))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        repo.add(&product_id, NewComment::new("bob", "  Too warm  "))
            .await
            .unwrap();

        let listed = repo.list_for_product(&product_id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, first.id);
        assert_eq!(listed[1].body, "Too warm");

        let stored = repo.get_by_id(&first.id).await.unwrap().unwrap();
        assert_eq!(stored.user_id, "alice");
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let (db, _) = setup().await;
        let repo = db.comments();

        let err = repo
            .add("missing", NewComment::new("alice", "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
        assert!(matches!(
            repo.list_for_product("missing").await.unwrap_err(),
            DbError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_only_author_edits_and_deletes() {
        let (db, product_id) = setup().await;
        let repo = db.comments();
        let comment = repo
            .add(&product_id, NewComment::new("alice", "Nice"))
            .await
            .unwrap();

        let err = repo.update(&comment.id, "bob", "Hijacked").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
        let err = repo.delete(&comment.id, "bob").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));

        let err = repo.update(&comment.id, "alice", "   ").await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Validation(ValidationError::Required { .. })
        ));

        let edited = repo.update(&comment.id, "alice", "Very nice").await.unwrap();
        assert_eq!(edited.body, "Very nice");
        assert!(edited.updated_at >= comment.updated_at);

        repo.delete(&comment.id, "alice").await.unwrap();
        assert!(repo.get_by_id(&comment.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_product_delete_removes_comments() {
        let (db, product_id) = setup().await;
        let comment = db
            .comments()
            .add(&product_id, NewComment::new("alice", "Nice"))
            .await
            .unwrap();

        db.products().delete(&product_id).await.unwrap();
        assert!(db.comments().get_by_id(&comment.id).await.unwrap().is_none());
    }
}
