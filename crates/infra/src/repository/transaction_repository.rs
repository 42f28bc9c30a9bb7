//! # TransactionRepository
//!
//! 貸出・返却トランザクションの永続化を担当するリポジトリ。
//!
//! トランザクションは追記のみで削除しない。更新は貸出レコードを
//! `pending` → `completed` にする条件付き UPDATE のみ。

use async_trait::async_trait;
use bookshelf_domain::{
    book_instance::BookInstanceId,
    shelf::ShelfId,
    transaction::{Transaction, TransactionId, TransactionStatus, TransactionType},
    user::UserId,
};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::corrupted;
use crate::{db::TxContext, error::InfraError};

/// トランザクションリポジトリトレイト
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// トランザクションを追記する
    ///
    /// 同じ蔵書に返却待ちの貸出が既にある場合は `Conflict`。
    async fn insert(&self, tx: &mut TxContext, transaction: &Transaction)
    -> Result<(), InfraError>;

    /// 蔵書の返却待ちの貸出（最新のもの）を取得し、行ロックを取得する
    async fn find_open_borrow_for_update(
        &self,
        tx: &mut TxContext,
        instance_id: &BookInstanceId,
    ) -> Result<Option<Transaction>, InfraError>;

    /// ステータスを条件付きで更新する
    async fn update_status(
        &self,
        tx: &mut TxContext,
        transaction: &Transaction,
        expected: TransactionStatus,
    ) -> Result<(), InfraError>;

    /// 利用者の全トランザクションを新しい順で取得する
    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<Transaction>, InfraError>;

    /// 全利用者のトランザクションを新しい順で最大 `limit` 件取得する
    async fn find_recent(&self, limit: i64) -> Result<Vec<Transaction>, InfraError>;
}

#[derive(sqlx::FromRow)]
struct TransactionRow {
    id:               Uuid,
    transaction_type: String,
    status:           String,
    date:             DateTime<Utc>,
    due_date:         Option<DateTime<Utc>>,
    user_id:          Uuid,
    book_instance_id: Uuid,
    shelf_id:         Uuid,
    created_at:       DateTime<Utc>,
    updated_at:       DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = InfraError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let corrupt = |e| corrupted("Transaction", e);
        Ok(Transaction::from_db(
            TransactionId::from_uuid(row.id),
            row.transaction_type
                .parse::<TransactionType>()
                .map_err(corrupt)?,
            row.status.parse::<TransactionStatus>().map_err(corrupt)?,
            row.date,
            row.due_date,
            UserId::from_uuid(row.user_id),
            BookInstanceId::from_uuid(row.book_instance_id),
            ShelfId::from_uuid(row.shelf_id),
            row.created_at,
            row.updated_at,
        ))
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, transaction_type, status, date, due_date, user_id,
           book_instance_id, shelf_id, created_at, updated_at
    FROM transactions
"#;

/// PostgreSQL 実装の TransactionRepository
#[derive(Debug, Clone)]
pub struct PostgresTransactionRepository {
    pool: PgPool,
}

impl PostgresTransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionRepository for PostgresTransactionRepository {
    #[tracing::instrument(
        skip_all,
        level = "debug",
        fields(id = %transaction.id(), kind = %transaction.transaction_type())
    )]
    async fn insert(
        &self,
        tx: &mut TxContext,
        transaction: &Transaction,
    ) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, transaction_type, status, date, due_date, user_id,
                book_instance_id, shelf_id, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(transaction.id().as_uuid())
        .bind(transaction.transaction_type().as_str())
        .bind(transaction.status().as_str())
        .bind(transaction.date())
        .bind(transaction.due_date())
        .bind(transaction.user_id().as_uuid())
        .bind(transaction.book_instance_id().as_uuid())
        .bind(transaction.shelf_id().as_uuid())
        .bind(transaction.created_at())
        .bind(transaction.updated_at())
        .execute(tx.conn())
        .await
        .map_err(|e| {
            InfraError::from_constraint(
                e,
                "Transaction",
                transaction.book_instance_id().to_string(),
            )
        })?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%instance_id))]
    async fn find_open_borrow_for_update(
        &self,
        tx: &mut TxContext,
        instance_id: &BookInstanceId,
    ) -> Result<Option<Transaction>, InfraError> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            r#"
            {SELECT_COLUMNS}
            WHERE book_instance_id = $1 AND transaction_type = $2 AND status = $3
            ORDER BY date DESC
            LIMIT 1
            FOR UPDATE
            "#
        ))
        .bind(instance_id.as_uuid())
        .bind(TransactionType::Borrow.as_str())
        .bind(TransactionStatus::Pending.as_str())
        .fetch_optional(tx.conn())
        .await?;

        row.map(Transaction::try_from).transpose()
    }

    #[tracing::instrument(
        skip_all,
        level = "debug",
        fields(id = %transaction.id(), %expected, to = %transaction.status())
    )]
    async fn update_status(
        &self,
        tx: &mut TxContext,
        transaction: &Transaction,
        expected: TransactionStatus,
    ) -> Result<(), InfraError> {
        let result = sqlx::query(
            r#"
            UPDATE transactions SET status = $2, updated_at = $3
            WHERE id = $1 AND status = $4
            "#,
        )
        .bind(transaction.id().as_uuid())
        .bind(transaction.status().as_str())
        .bind(transaction.updated_at())
        .bind(expected.as_str())
        .execute(tx.conn())
        .await?;

        if result.rows_affected() == 0 {
            return Err(InfraError::conflict(
                "Transaction",
                transaction.id().to_string(),
            ));
        }

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%user_id))]
    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<Transaction>, InfraError> {
        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            "{SELECT_COLUMNS} WHERE user_id = $1 ORDER BY date DESC, id DESC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Transaction::try_from).collect()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%limit))]
    async fn find_recent(&self, limit: i64) -> Result<Vec<Transaction>, InfraError> {
        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            "{SELECT_COLUMNS} ORDER BY date DESC, id DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Transaction::try_from).collect()
    }
}
