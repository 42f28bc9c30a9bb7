//! # 貸出トランザクション
//!
//! 貸出・返却の 1 回ごとに追記される履歴レコード。
//! 削除されることはなく、貸出レコードのみ対応する返却時に
//! `pending` → `completed` へ更新される。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::{DomainError, book_instance::BookInstanceId, shelf::ShelfId, user::UserId};

define_uuid_id! {
    /// トランザクションの一意識別子
    pub struct TransactionId;
}

/// トランザクション種別
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransactionType {
    /// 貸出
    Borrow,
    /// 返却
    Return,
    /// 貸出延長
    Extend,
}

impl_status_from_str!(TransactionType, "トランザクション種別", {
    "borrow" => Borrow,
    "return" => Return,
    "extend" => Extend,
});

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// トランザクションのステータス
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransactionStatus {
    /// 進行中（貸出中）
    Pending,
    /// 完了
    Completed,
    /// 延滞
    Overdue,
    /// 取消
    Cancelled,
}

impl_status_from_str!(TransactionStatus, "トランザクションステータス", {
    "pending" => Pending,
    "completed" => Completed,
    "overdue" => Overdue,
    "cancelled" => Cancelled,
});

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// 貸出トランザクションの作成パラメータ
pub struct NewBorrow {
    pub id:               TransactionId,
    pub user_id:          UserId,
    pub book_instance_id: BookInstanceId,
    /// 貸出時点で蔵書が置かれていた書架
    pub shelf_id:         ShelfId,
    pub due_date:         Option<DateTime<Utc>>,
    pub now:              DateTime<Utc>,
}

/// 貸出・返却トランザクション
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    id: TransactionId,
    transaction_type: TransactionType,
    status: TransactionStatus,
    date: DateTime<Utc>,
    due_date: Option<DateTime<Utc>>,
    user_id: UserId,
    book_instance_id: BookInstanceId,
    shelf_id: ShelfId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Transaction {
    /// 貸出トランザクションを作成する
    ///
    /// 返却されるまで `pending` のままとなる。
    pub fn borrow(params: NewBorrow) -> Self {
        Self {
            id: params.id,
            transaction_type: TransactionType::Borrow,
            status: TransactionStatus::Pending,
            date: params.now,
            due_date: params.due_date,
            user_id: params.user_id,
            book_instance_id: params.book_instance_id,
            shelf_id: params.shelf_id,
            created_at: params.now,
            updated_at: params.now,
        }
    }

    /// 貸出に対応する返却トランザクションを作成する
    ///
    /// 利用者は貸出レコードの借り手を引き継ぎ、作成時点で `completed` とする。
    pub fn return_of(
        borrow: &Transaction,
        id: TransactionId,
        shelf_id: ShelfId,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if borrow.transaction_type != TransactionType::Borrow {
            return Err(DomainError::InvalidState(format!(
                "貸出トランザクションではありません（種別: {}）",
                borrow.transaction_type
            )));
        }
        Ok(Self {
            id,
            transaction_type: TransactionType::Return,
            status: TransactionStatus::Completed,
            date: now,
            due_date: None,
            user_id: borrow.user_id.clone(),
            book_instance_id: borrow.book_instance_id.clone(),
            shelf_id,
            created_at: now,
            updated_at: now,
        })
    }

    /// DB からエンティティを復元する
    #[allow(clippy::too_many_arguments)]
    pub fn from_db(
        id: TransactionId,
        transaction_type: TransactionType,
        status: TransactionStatus,
        date: DateTime<Utc>,
        due_date: Option<DateTime<Utc>>,
        user_id: UserId,
        book_instance_id: BookInstanceId,
        shelf_id: ShelfId,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            transaction_type,
            status,
            date,
            due_date,
            user_id,
            book_instance_id,
            shelf_id,
            created_at,
            updated_at,
        }
    }

    /// `pending` のトランザクションを完了にする
    pub fn completed(self, now: DateTime<Utc>) -> Result<Self, DomainError> {
        if self.status != TransactionStatus::Pending {
            return Err(DomainError::InvalidState(format!(
                "進行中のトランザクションではありません（ステータス: {}）",
                self.status
            )));
        }
        Ok(Self {
            status: TransactionStatus::Completed,
            updated_at: now,
            ..self
        })
    }

    /// 返却待ちの貸出かどうか
    pub fn is_open_borrow(&self) -> bool {
        self.transaction_type == TransactionType::Borrow
            && self.status == TransactionStatus::Pending
    }

    pub fn id(&self) -> &TransactionId {
        &self.id
    }

    pub fn transaction_type(&self) -> TransactionType {
        self.transaction_type
    }

    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn due_date(&self) -> Option<DateTime<Utc>> {
        self.due_date
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn book_instance_id(&self) -> &BookInstanceId {
        &self.book_instance_id
    }

    pub fn shelf_id(&self) -> &ShelfId {
        &self.shelf_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
