use anyhow::Context;
use sqlx::SqlitePool;
use time::OffsetDateTime;

use super::dto::Post;

/// Newest first.
pub async fn list_recent(db: &SqlitePool, limit: i64, offset: i64) -> anyhow::Result<Vec<Post>> {
    let rows = sqlx::query_as::<_, Post>(
        r#"
        SELECT p.id, p.user_id, u.name AS author_name, p.content, p.created_at
          FROM posts p
          JOIN users u ON u.id = p.user_id
         ORDER BY p.id DESC
         LIMIT ? OFFSET ?
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
    .context("list posts")?;
    Ok(rows)
}

pub async fn insert(
    db: &SqlitePool,
    user_id: i64,
    content: &str,
    created_at: OffsetDateTime,
) -> anyhow::Result<Post> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO posts (user_id, content, created_at)
        VALUES (?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(content)
    .bind(created_at)
    .fetch_one(db)
    .await
    .context("insert post")?;

    let post = sqlx::query_as::<_, Post>(
        r#"
        SELECT p.id, p.user_id, u.name AS author_name, p.content, p.created_at
          FROM posts p
          JOIN users u ON u.id = p.user_id
         WHERE p.id = ?
        "#,
    )
    .bind(id)
    .fetch_one(db)
    .await
    .with_context(|| format!("load post {id}"))?;
    Ok(post)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::repo::{SqliteUserStore, UserStore},
        state::test_pool,
    };

    #[tokio::test]
    async fn insert_and_list_newest_first() {
        let db = test_pool().await;
        let users = SqliteUserStore::new(db.clone());
        let now = OffsetDateTime::now_utc();
        let author = users.create_user("Ada", "ada@example.com", "h", now).await.unwrap();

        let first = insert(&db, author, "first", now).await.expect("insert first");
        let second = insert(&db, author, "second", now).await.expect("insert second");
        assert_eq!(first.author_name, "Ada");
        assert!(second.id > first.id);

        let listed = list_recent(&db, 10, 0).await.expect("list");
        let contents: Vec<&str> = listed.iter().map(|p| p.content.as_str()).collect();
        assert_eq!(contents, ["second", "first"]);

        let page = list_recent(&db, 1, 1).await.expect("page");
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, first.id);
    }

    #[tokio::test]
    async fn empty_board_lists_nothing() {
        let db = test_pool().await;
        assert!(list_recent(&db, 10, 0).await.unwrap().is_empty());
    }
}
