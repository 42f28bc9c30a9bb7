//! # BookRepository
//!
//! 書誌情報の永続化を担当するリポジトリ。

use async_trait::async_trait;
use bookshelf_domain::book::{AuthorName, Book, BookId, BookName, BookSearch};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{contains_pattern, corrupted};
use crate::{db::TxContext, error::InfraError};

/// 書誌リポジトリトレイト
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// ID で書誌を検索する
    async fn find_by_id(&self, id: &BookId) -> Result<Option<Book>, InfraError>;

    /// 条件に一致する書誌を書名順で取得する
    async fn search(&self, search: &BookSearch) -> Result<Vec<Book>, InfraError>;

    async fn insert(&self, tx: &mut TxContext, book: &Book) -> Result<(), InfraError>;

    /// 書誌を更新する
    ///
    /// 対象行が存在しない場合は `Conflict`（読み取り後に削除された）。
    async fn update(&self, tx: &mut TxContext, book: &Book) -> Result<(), InfraError>;

    /// 書誌を削除する
    ///
    /// 削除した場合は `true`。蔵書から参照されている場合は `Conflict`。
    async fn delete(&self, tx: &mut TxContext, id: &BookId) -> Result<bool, InfraError>;
}

#[derive(sqlx::FromRow)]
struct BookRow {
    id:              Uuid,
    name:            String,
    author:          String,
    description:     Option<String>,
    cover_image_url: Option<String>,
    genre:           Option<String>,
    created_at:      DateTime<Utc>,
    updated_at:      DateTime<Utc>,
}

impl TryFrom<BookRow> for Book {
    type Error = InfraError;

    fn try_from(row: BookRow) -> Result<Self, Self::Error> {
        Ok(Book::from_db(
            BookId::from_uuid(row.id),
            BookName::new(row.name).map_err(|e| corrupted("Book", e))?,
            AuthorName::new(row.author).map_err(|e| corrupted("Book", e))?,
            row.description,
            row.cover_image_url,
            row.genre,
            row.created_at,
            row.updated_at,
        ))
    }
}

/// PostgreSQL 実装の BookRepository
#[derive(Debug, Clone)]
pub struct PostgresBookRepository {
    pool: PgPool,
}

impl PostgresBookRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookRepository for PostgresBookRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn find_by_id(&self, id: &BookId) -> Result<Option<Book>, InfraError> {
        let row = sqlx::query_as::<_, BookRow>(
            r#"
            SELECT id, name, author, description, cover_image_url, genre, created_at, updated_at
            FROM books
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Book::try_from).transpose()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(?search))]
    async fn search(&self, search: &BookSearch) -> Result<Vec<Book>, InfraError> {
        let rows = sqlx::query_as::<_, BookRow>(
            r#"
            SELECT id, name, author, description, cover_image_url, genre, created_at, updated_at
            FROM books
            WHERE ($1::TEXT IS NULL OR name ILIKE $1)
              AND ($2::TEXT IS NULL OR author ILIKE $2)
              AND ($3::TEXT IS NULL OR genre ILIKE $3)
            ORDER BY name ASC, id ASC
            "#,
        )
        .bind(search.name.as_deref().map(contains_pattern))
        .bind(search.author.as_deref().map(contains_pattern))
        .bind(search.genre.as_deref().map(contains_pattern))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Book::try_from).collect()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(id = %book.id()))]
    async fn insert(&self, tx: &mut TxContext, book: &Book) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO books (id, name, author, description, cover_image_url, genre, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(book.id().as_uuid())
        .bind(book.name().as_str())
        .bind(book.author().as_str())
        .bind(book.description())
        .bind(book.cover_image_url())
        .bind(book.genre())
        .bind(book.created_at())
        .bind(book.updated_at())
        .execute(tx.conn())
        .await
        .map_err(|e| InfraError::from_constraint(e, "Book", book.id().to_string()))?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(id = %book.id()))]
    async fn update(&self, tx: &mut TxContext, book: &Book) -> Result<(), InfraError> {
        let result = sqlx::query(
            r#"
            UPDATE books SET
                name = $2,
                author = $3,
                description = $4,
                cover_image_url = $5,
                genre = $6,
                updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(book.id().as_uuid())
        .bind(book.name().as_str())
        .bind(book.author().as_str())
        .bind(book.description())
        .bind(book.cover_image_url())
        .bind(book.genre())
        .bind(book.updated_at())
        .execute(tx.conn())
        .await?;

        if result.rows_affected() == 0 {
            return Err(InfraError::conflict("Book", book.id().to_string()));
        }

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn delete(&self, tx: &mut TxContext, id: &BookId) -> Result<bool, InfraError> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id.as_uuid())
            .execute(tx.conn())
            .await
            .map_err(|e| InfraError::from_constraint(e, "Book", id.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_book_repositoryはsendとsyncを実装している() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PostgresBookRepository>();
    }
}
