//! # ShelfRepository
//!
//! 書架の永続化を担当するリポジトリ。

use async_trait::async_trait;
use bookshelf_domain::shelf::{Coordinates, Shelf, ShelfId, ShelfName, ShelfStatus};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::corrupted;
use crate::{db::TxContext, error::InfraError};

/// 書架リポジトリトレイト
#[async_trait]
pub trait ShelfRepository: Send + Sync {
    /// 全書架を名前順で取得する
    async fn find_all(&self) -> Result<Vec<Shelf>, InfraError>;

    async fn find_by_id(&self, id: &ShelfId) -> Result<Option<Shelf>, InfraError>;

    async fn insert(&self, tx: &mut TxContext, shelf: &Shelf) -> Result<(), InfraError>;

    /// 書架を更新する
    ///
    /// 対象行が存在しない場合は `Conflict`。
    async fn update(&self, tx: &mut TxContext, shelf: &Shelf) -> Result<(), InfraError>;

    /// 書架を削除する
    ///
    /// 蔵書や履歴から参照されている場合は `Conflict`。
    async fn delete(&self, tx: &mut TxContext, id: &ShelfId) -> Result<bool, InfraError>;
}

#[derive(sqlx::FromRow)]
struct ShelfRow {
    id:         Uuid,
    name:       String,
    capacity:   i32,
    latitude:   Option<f64>,
    longitude:  Option<f64>,
    status:     String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ShelfRow> for Shelf {
    type Error = InfraError;

    fn try_from(row: ShelfRow) -> Result<Self, Self::Error> {
        let corrupt = |e| corrupted("Shelf", e);
        Ok(Shelf::from_db(
            ShelfId::from_uuid(row.id),
            ShelfName::new(row.name).map_err(corrupt)?,
            row.capacity,
            Coordinates::from_optional(row.latitude, row.longitude).map_err(corrupt)?,
            row.status.parse::<ShelfStatus>().map_err(corrupt)?,
            row.created_at,
            row.updated_at,
        ))
    }
}

/// PostgreSQL 実装の ShelfRepository
#[derive(Debug, Clone)]
pub struct PostgresShelfRepository {
    pool: PgPool,
}

impl PostgresShelfRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ShelfRepository for PostgresShelfRepository {
    #[tracing::instrument(skip_all, level = "debug")]
    async fn find_all(&self) -> Result<Vec<Shelf>, InfraError> {
        let rows = sqlx::query_as::<_, ShelfRow>(
            r#"
            SELECT id, name, capacity, latitude, longitude, status, created_at, updated_at
            FROM shelves
            ORDER BY name ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Shelf::try_from).collect()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn find_by_id(&self, id: &ShelfId) -> Result<Option<Shelf>, InfraError> {
        let row = sqlx::query_as::<_, ShelfRow>(
            r#"
            SELECT id, name, capacity, latitude, longitude, status, created_at, updated_at
            FROM shelves
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Shelf::try_from).transpose()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(id = %shelf.id()))]
    async fn insert(&self, tx: &mut TxContext, shelf: &Shelf) -> Result<(), InfraError> {
        let coordinates = shelf.coordinates();
        sqlx::query(
            r#"
            INSERT INTO shelves (id, name, capacity, latitude, longitude, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(shelf.id().as_uuid())
        .bind(shelf.name().as_str())
        .bind(shelf.capacity())
        .bind(coordinates.map(|c| c.latitude()))
        .bind(coordinates.map(|c| c.longitude()))
        .bind(shelf.status().as_str())
        .bind(shelf.created_at())
        .bind(shelf.updated_at())
        .execute(tx.conn())
        .await
        .map_err(|e| InfraError::from_constraint(e, "Shelf", shelf.id().to_string()))?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(id = %shelf.id()))]
    async fn update(&self, tx: &mut TxContext, shelf: &Shelf) -> Result<(), InfraError> {
        let coordinates = shelf.coordinates();
        let result = sqlx::query(
            r#"
            UPDATE shelves SET
                name = $2,
                capacity = $3,
                latitude = $4,
                longitude = $5,
                status = $6,
                updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(shelf.id().as_uuid())
        .bind(shelf.name().as_str())
        .bind(shelf.capacity())
        .bind(coordinates.map(|c| c.latitude()))
        .bind(coordinates.map(|c| c.longitude()))
        .bind(shelf.status().as_str())
        .bind(shelf.updated_at())
        .execute(tx.conn())
        .await?;

        if result.rows_affected() == 0 {
            return Err(InfraError::conflict("Shelf", shelf.id().to_string()));
        }

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn delete(&self, tx: &mut TxContext, id: &ShelfId) -> Result<bool, InfraError> {
        let result = sqlx::query("DELETE FROM shelves WHERE id = $1")
            .bind(id.as_uuid())
            .execute(tx.conn())
            .await
            .map_err(|e| InfraError::from_constraint(e, "Shelf", id.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}
