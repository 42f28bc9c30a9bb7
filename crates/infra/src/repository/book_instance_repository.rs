//! # BookInstanceRepository
//!
//! 蔵書（現物）の永続化を担当するリポジトリ。
//!
//! ## 設計方針
//!
//! - **タグの一意性**: `book_instances_tag_key` 一意制約の違反を `Conflict` に変換する
//! - **行ロック**: 貸出・返却・予約では `*_for_update` で行をロックしてから判定する
//! - **条件付き更新**: [`update_status`](BookInstanceRepository::update_status) は
//!   期待するステータスのときのみ更新する

use async_trait::async_trait;
use bookshelf_domain::{
    book::BookId,
    book_instance::{BookInstance, BookInstanceId, BookInstanceStatus, InstanceTag},
    shelf::ShelfId,
};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::corrupted;
use crate::{db::TxContext, error::InfraError};

/// 蔵書リポジトリトレイト
#[async_trait]
pub trait BookInstanceRepository: Send + Sync {
    async fn find_by_id(&self, id: &BookInstanceId) -> Result<Option<BookInstance>, InfraError>;

    /// ID で蔵書を検索し、行ロックを取得する
    async fn find_by_id_for_update(
        &self,
        tx: &mut TxContext,
        id: &BookInstanceId,
    ) -> Result<Option<BookInstance>, InfraError>;

    /// タグで蔵書を検索し、行ロックを取得する
    async fn find_by_tag_for_update(
        &self,
        tx: &mut TxContext,
        tag: &InstanceTag,
    ) -> Result<Option<BookInstance>, InfraError>;

    /// 書誌に紐づく貸出可能な蔵書を取得する
    async fn find_available_by_book(
        &self,
        book_id: &BookId,
    ) -> Result<Vec<BookInstance>, InfraError>;

    /// 書架に置かれている蔵書をすべて取得する
    async fn find_by_shelf(&self, shelf_id: &ShelfId) -> Result<Vec<BookInstance>, InfraError>;

    /// 蔵書を登録する
    ///
    /// タグが重複する場合は `Conflict`。
    async fn insert(&self, tx: &mut TxContext, instance: &BookInstance)
    -> Result<(), InfraError>;

    /// 管理操作による更新（全項目）
    ///
    /// タグが重複する場合、または対象行が存在しない場合は `Conflict`。
    async fn update(&self, tx: &mut TxContext, instance: &BookInstance)
    -> Result<(), InfraError>;

    /// ステータスと書架を条件付きで更新する
    ///
    /// DB 上のステータスが `expected` と一致しない場合は `Conflict`。
    async fn update_status(
        &self,
        tx: &mut TxContext,
        instance: &BookInstance,
        expected: BookInstanceStatus,
    ) -> Result<(), InfraError>;

    /// 蔵書を削除する
    ///
    /// 履歴や予約から参照されている場合は `Conflict`。
    async fn delete(&self, tx: &mut TxContext, id: &BookInstanceId) -> Result<bool, InfraError>;
}

#[derive(sqlx::FromRow)]
struct BookInstanceRow {
    id:         Uuid,
    book_id:    Uuid,
    shelf_id:   Uuid,
    shelf_pos:  f64,
    tag:        String,
    status:     String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookInstanceRow> for BookInstance {
    type Error = InfraError;

    fn try_from(row: BookInstanceRow) -> Result<Self, Self::Error> {
        let corrupt = |e| corrupted("BookInstance", e);
        Ok(BookInstance::from_db(
            BookInstanceId::from_uuid(row.id),
            BookId::from_uuid(row.book_id),
            ShelfId::from_uuid(row.shelf_id),
            row.shelf_pos,
            InstanceTag::new(row.tag).map_err(corrupt)?,
            row.status.parse::<BookInstanceStatus>().map_err(corrupt)?,
            row.created_at,
            row.updated_at,
        ))
    }
}

const SELECT_COLUMNS: &str =
    "SELECT id, book_id, shelf_id, shelf_pos, tag, status, created_at, updated_at FROM book_instances";

/// PostgreSQL 実装の BookInstanceRepository
#[derive(Debug, Clone)]
pub struct PostgresBookInstanceRepository {
    pool: PgPool,
}

impl PostgresBookInstanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookInstanceRepository for PostgresBookInstanceRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn find_by_id(&self, id: &BookInstanceId) -> Result<Option<BookInstance>, InfraError> {
        let row = sqlx::query_as::<_, BookInstanceRow>(&format!("{SELECT_COLUMNS} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(BookInstance::try_from).transpose()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn find_by_id_for_update(
        &self,
        tx: &mut TxContext,
        id: &BookInstanceId,
    ) -> Result<Option<BookInstance>, InfraError> {
        let row = sqlx::query_as::<_, BookInstanceRow>(&format!(
            "{SELECT_COLUMNS} WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(tx.conn())
        .await?;

        row.map(BookInstance::try_from).transpose()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%tag))]
    async fn find_by_tag_for_update(
        &self,
        tx: &mut TxContext,
        tag: &InstanceTag,
    ) -> Result<Option<BookInstance>, InfraError> {
        let row = sqlx::query_as::<_, BookInstanceRow>(&format!(
            "{SELECT_COLUMNS} WHERE tag = $1 FOR UPDATE"
        ))
        .bind(tag.as_str())
        .fetch_optional(tx.conn())
        .await?;

        row.map(BookInstance::try_from).transpose()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%book_id))]
    async fn find_available_by_book(
        &self,
        book_id: &BookId,
    ) -> Result<Vec<BookInstance>, InfraError> {
        let rows = sqlx::query_as::<_, BookInstanceRow>(&format!(
            "{SELECT_COLUMNS} WHERE book_id = $1 AND status = $2 ORDER BY tag ASC"
        ))
        .bind(book_id.as_uuid())
        .bind(BookInstanceStatus::Available.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(BookInstance::try_from).collect()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%shelf_id))]
    async fn find_by_shelf(&self, shelf_id: &ShelfId) -> Result<Vec<BookInstance>, InfraError> {
        let rows = sqlx::query_as::<_, BookInstanceRow>(&format!(
            "{SELECT_COLUMNS} WHERE shelf_id = $1 ORDER BY shelf_pos ASC, tag ASC"
        ))
        .bind(shelf_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(BookInstance::try_from).collect()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(id = %instance.id(), tag = %instance.tag()))]
    async fn insert(
        &self,
        tx: &mut TxContext,
        instance: &BookInstance,
    ) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO book_instances (id, book_id, shelf_id, shelf_pos, tag, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(instance.id().as_uuid())
        .bind(instance.book_id().as_uuid())
        .bind(instance.shelf_id().as_uuid())
        .bind(instance.shelf_pos())
        .bind(instance.tag().as_str())
        .bind(instance.status().as_str())
        .bind(instance.created_at())
        .bind(instance.updated_at())
        .execute(tx.conn())
        .await
        .map_err(|e| InfraError::from_constraint(e, "BookInstance", instance.tag().as_str()))?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(id = %instance.id(), tag = %instance.tag()))]
    async fn update(
        &self,
        tx: &mut TxContext,
        instance: &BookInstance,
    ) -> Result<(), InfraError> {
        let result = sqlx::query(
            r#"
            UPDATE book_instances SET
                book_id = $2,
                shelf_id = $3,
                shelf_pos = $4,
                tag = $5,
                status = $6,
                updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(instance.id().as_uuid())
        .bind(instance.book_id().as_uuid())
        .bind(instance.shelf_id().as_uuid())
        .bind(instance.shelf_pos())
        .bind(instance.tag().as_str())
        .bind(instance.status().as_str())
        .bind(instance.updated_at())
        .execute(tx.conn())
        .await
        .map_err(|e| InfraError::from_constraint(e, "BookInstance", instance.tag().as_str()))?;

        if result.rows_affected() == 0 {
            return Err(InfraError::conflict(
                "BookInstance",
                instance.id().to_string(),
            ));
        }

        Ok(())
    }

    #[tracing::instrument(
        skip_all,
        level = "debug",
        fields(id = %instance.id(), %expected, to = %instance.status())
    )]
    async fn update_status(
        &self,
        tx: &mut TxContext,
        instance: &BookInstance,
        expected: BookInstanceStatus,
    ) -> Result<(), InfraError> {
        let result = sqlx::query(
            r#"
            UPDATE book_instances SET
                status = $2,
                shelf_id = $3,
                updated_at = $4
            WHERE id = $1 AND status = $5
            "#,
        )
        .bind(instance.id().as_uuid())
        .bind(instance.status().as_str())
        .bind(instance.shelf_id().as_uuid())
        .bind(instance.updated_at())
        .bind(expected.as_str())
        .execute(tx.conn())
        .await
        .map_err(|e| InfraError::from_constraint(e, "BookInstance", instance.id().to_string()))?;

        if result.rows_affected() == 0 {
            return Err(InfraError::conflict(
                "BookInstance",
                instance.id().to_string(),
            ));
        }

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn delete(&self, tx: &mut TxContext, id: &BookInstanceId) -> Result<bool, InfraError> {
        let result = sqlx::query("DELETE FROM book_instances WHERE id = $1")
            .bind(id.as_uuid())
            .execute(tx.conn())
            .await
            .map_err(|e| InfraError::from_constraint(e, "BookInstance", id.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}
