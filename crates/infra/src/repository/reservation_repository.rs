//! # ReservationRepository
//!
//! 取り置き予約の永続化を担当するリポジトリ。
//!
//! 受け取り待ち（`pending`）の予約は、蔵書ごと・受け取りコードごとに
//! 部分一意インデックスで高々 1 件に制限されている。

use async_trait::async_trait;
use bookshelf_domain::{
    book_instance::BookInstanceId,
    reservation::{PickupCode, Reservation, ReservationId, ReservationStatus},
    user::UserId,
};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::corrupted;
use crate::{db::TxContext, error::InfraError};

/// 予約リポジトリトレイト
#[async_trait]
pub trait ReservationRepository: Send + Sync {
    async fn find_by_id(&self, id: &ReservationId) -> Result<Option<Reservation>, InfraError>;

    async fn find_by_id_for_update(
        &self,
        tx: &mut TxContext,
        id: &ReservationId,
    ) -> Result<Option<Reservation>, InfraError>;

    /// 蔵書に紐づく受け取り待ちの予約を取得し、行ロックを取得する
    async fn find_pending_by_instance_for_update(
        &self,
        tx: &mut TxContext,
        instance_id: &BookInstanceId,
    ) -> Result<Option<Reservation>, InfraError>;

    /// 受け取りコードで受け取り待ちの予約を取得し、行ロックを取得する
    async fn find_pending_by_code_for_update(
        &self,
        tx: &mut TxContext,
        code: &PickupCode,
    ) -> Result<Option<Reservation>, InfraError>;

    /// 受け取り待ちの予約が既にこのコードを使っているか
    async fn exists_pending_code(
        &self,
        tx: &mut TxContext,
        code: &PickupCode,
    ) -> Result<bool, InfraError>;

    /// 利用者の受け取り待ちの予約を新しい順で取得する
    async fn find_pending_by_user(&self, user_id: &UserId)
    -> Result<Vec<Reservation>, InfraError>;

    /// 予約を登録する
    ///
    /// 蔵書または受け取りコードが他の受け取り待ち予約と重複する場合は `Conflict`。
    async fn insert(&self, tx: &mut TxContext, reservation: &Reservation)
    -> Result<(), InfraError>;

    /// 管理操作による更新（ステータス・期限）
    async fn update(&self, tx: &mut TxContext, reservation: &Reservation)
    -> Result<(), InfraError>;

    /// ステータスを条件付きで更新する
    async fn update_status(
        &self,
        tx: &mut TxContext,
        reservation: &Reservation,
        expected: ReservationStatus,
    ) -> Result<(), InfraError>;

    /// 受け取りコード画像の URL のみを設定する
    ///
    /// 予約確定後の別トランザクションで呼ばれるため、ステータスには触れない。
    async fn set_qr_code_url(
        &self,
        tx: &mut TxContext,
        id: &ReservationId,
        url: &str,
        now: DateTime<Utc>,
    ) -> Result<(), InfraError>;

    async fn delete(&self, tx: &mut TxContext, id: &ReservationId) -> Result<bool, InfraError>;
}

#[derive(sqlx::FromRow)]
struct ReservationRow {
    id:               Uuid,
    user_id:          Uuid,
    book_instance_id: Uuid,
    status:           String,
    date:             DateTime<Utc>,
    exp_date:         DateTime<Utc>,
    pickup_code:      String,
    qr_code_url:      Option<String>,
    created_at:       DateTime<Utc>,
    updated_at:       DateTime<Utc>,
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = InfraError;

    fn try_from(row: ReservationRow) -> Result<Self, Self::Error> {
        let corrupt = |e| corrupted("Reservation", e);
        Ok(Reservation::from_db(
            ReservationId::from_uuid(row.id),
            UserId::from_uuid(row.user_id),
            BookInstanceId::from_uuid(row.book_instance_id),
            row.status.parse::<ReservationStatus>().map_err(corrupt)?,
            row.date,
            row.exp_date,
            PickupCode::parse(row.pickup_code).map_err(corrupt)?,
            row.qr_code_url,
            row.created_at,
            row.updated_at,
        ))
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, user_id, book_instance_id, status, date, exp_date,
           pickup_code, qr_code_url, created_at, updated_at
    FROM reservations
"#;

/// PostgreSQL 実装の ReservationRepository
#[derive(Debug, Clone)]
pub struct PostgresReservationRepository {
    pool: PgPool,
}

impl PostgresReservationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReservationRepository for PostgresReservationRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn find_by_id(&self, id: &ReservationId) -> Result<Option<Reservation>, InfraError> {
        let row = sqlx::query_as::<_, ReservationRow>(&format!("{SELECT_COLUMNS} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Reservation::try_from).transpose()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn find_by_id_for_update(
        &self,
        tx: &mut TxContext,
        id: &ReservationId,
    ) -> Result<Option<Reservation>, InfraError> {
        let row = sqlx::query_as::<_, ReservationRow>(&format!(
            "{SELECT_COLUMNS} WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(tx.conn())
        .await?;

        row.map(Reservation::try_from).transpose()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%instance_id))]
    async fn find_pending_by_instance_for_update(
        &self,
        tx: &mut TxContext,
        instance_id: &BookInstanceId,
    ) -> Result<Option<Reservation>, InfraError> {
        let row = sqlx::query_as::<_, ReservationRow>(&format!(
            "{SELECT_COLUMNS} WHERE book_instance_id = $1 AND status = $2 FOR UPDATE"
        ))
        .bind(instance_id.as_uuid())
        .bind(ReservationStatus::Pending.as_str())
        .fetch_optional(tx.conn())
        .await?;

        row.map(Reservation::try_from).transpose()
    }

    // 受け取りコードはログに出さない
    #[tracing::instrument(skip_all, level = "debug")]
    async fn find_pending_by_code_for_update(
        &self,
        tx: &mut TxContext,
        code: &PickupCode,
    ) -> Result<Option<Reservation>, InfraError> {
        let row = sqlx::query_as::<_, ReservationRow>(&format!(
            "{SELECT_COLUMNS} WHERE pickup_code = $1 AND status = $2 FOR UPDATE"
        ))
        .bind(code.as_str())
        .bind(ReservationStatus::Pending.as_str())
        .fetch_optional(tx.conn())
        .await?;

        row.map(Reservation::try_from).transpose()
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn exists_pending_code(
        &self,
        tx: &mut TxContext,
        code: &PickupCode,
    ) -> Result<bool, InfraError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM reservations WHERE pickup_code = $1 AND status = $2)",
        )
        .bind(code.as_str())
        .bind(ReservationStatus::Pending.as_str())
        .fetch_one(tx.conn())
        .await?;

        Ok(exists)
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%user_id))]
    async fn find_pending_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Reservation>, InfraError> {
        let rows = sqlx::query_as::<_, ReservationRow>(&format!(
            "{SELECT_COLUMNS} WHERE user_id = $1 AND status = $2 ORDER BY date DESC, id DESC"
        ))
        .bind(user_id.as_uuid())
        .bind(ReservationStatus::Pending.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Reservation::try_from).collect()
    }

    #[tracing::instrument(
        skip_all,
        level = "debug",
        fields(id = %reservation.id(), instance_id = %reservation.book_instance_id())
    )]
    async fn insert(
        &self,
        tx: &mut TxContext,
        reservation: &Reservation,
    ) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO reservations (
                id, user_id, book_instance_id, status, date, exp_date,
                pickup_code, qr_code_url, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(reservation.id().as_uuid())
        .bind(reservation.user_id().as_uuid())
        .bind(reservation.book_instance_id().as_uuid())
        .bind(reservation.status().as_str())
        .bind(reservation.date())
        .bind(reservation.exp_date())
        .bind(reservation.pickup_code().as_str())
        .bind(reservation.qr_code_url())
        .bind(reservation.created_at())
        .bind(reservation.updated_at())
        .execute(tx.conn())
        .await
        .map_err(|e| {
            InfraError::from_constraint(e, "Reservation", reservation.id().to_string())
        })?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(id = %reservation.id()))]
    async fn update(
        &self,
        tx: &mut TxContext,
        reservation: &Reservation,
    ) -> Result<(), InfraError> {
        let result = sqlx::query(
            r#"
            UPDATE reservations SET status = $2, exp_date = $3, updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(reservation.id().as_uuid())
        .bind(reservation.status().as_str())
        .bind(reservation.exp_date())
        .bind(reservation.updated_at())
        .execute(tx.conn())
        .await
        .map_err(|e| {
            InfraError::from_constraint(e, "Reservation", reservation.id().to_string())
        })?;

        if result.rows_affected() == 0 {
            return Err(InfraError::conflict(
                "Reservation",
                reservation.id().to_string(),
            ));
        }

        Ok(())
    }

    #[tracing::instrument(
        skip_all,
        level = "debug",
        fields(id = %reservation.id(), %expected, to = %reservation.status())
    )]
    async fn update_status(
        &self,
        tx: &mut TxContext,
        reservation: &Reservation,
        expected: ReservationStatus,
    ) -> Result<(), InfraError> {
        let result = sqlx::query(
            r#"
            UPDATE reservations SET status = $2, updated_at = $3
            WHERE id = $1 AND status = $4
            "#,
        )
        .bind(reservation.id().as_uuid())
        .bind(reservation.status().as_str())
        .bind(reservation.updated_at())
        .bind(expected.as_str())
        .execute(tx.conn())
        .await?;

        if result.rows_affected() == 0 {
            return Err(InfraError::conflict(
                "Reservation",
                reservation.id().to_string(),
            ));
        }

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn set_qr_code_url(
        &self,
        tx: &mut TxContext,
        id: &ReservationId,
        url: &str,
        now: DateTime<Utc>,
    ) -> Result<(), InfraError> {
        sqlx::query("UPDATE reservations SET qr_code_url = $2, updated_at = $3 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(url)
            .bind(now)
            .execute(tx.conn())
            .await?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn delete(&self, tx: &mut TxContext, id: &ReservationId) -> Result<bool, InfraError> {
        let result = sqlx::query("DELETE FROM reservations WHERE id = $1")
            .bind(id.as_uuid())
            .execute(tx.conn())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
