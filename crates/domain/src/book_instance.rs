//! # 蔵書（現物）
//!
//! 書架に置かれた 1 冊の物理的な本。RFID や印字コードなどの
//! 物理タグで一意に識別される。
//!
//! ## 状態遷移
//!
//! ```text
//! available ──reserve──▶ reserved ──borrow──▶ borrowed
//!     ▲  │                  │                    │
//!     │  └─────borrow───────┼────────────────────┤
//!     │                     │                    │
//!     ├──release────────────┘                    │
//!     └──return──────────────────────────────────┘
//! ```
//!
//! `damaged` は貸出フローの外で（管理操作として）設定される。
//! 管理操作で設定できるのは `available` と `damaged` のみで、
//! `reserved` / `borrowed` の蔵書のステータスは貸出フロー以外から変えられない。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::{DomainError, book::BookId, shelf::ShelfId};

define_uuid_id! {
    /// 蔵書の一意識別子
    pub struct BookInstanceId;
}

define_validated_string! {
    /// 物理タグ（RFID・バーコード等、全蔵書で一意）
    pub struct InstanceTag {
        label: "蔵書タグ",
        max_length: 64,
    }
}

/// 蔵書のステータス
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BookInstanceStatus {
    /// 貸出可能
    #[default]
    Available,
    /// 貸出中
    Borrowed,
    /// 取り置き中（pending の予約が 1 件存在する）
    Reserved,
    /// 破損
    Damaged,
}

impl_status_from_str!(BookInstanceStatus, "蔵書ステータス", {
    "available" => Available,
    "borrowed" => Borrowed,
    "reserved" => Reserved,
    "damaged" => Damaged,
});

impl BookInstanceStatus {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    /// 予約または貸出の記録と対になっているステータスか
    pub fn is_in_circulation(&self) -> bool {
        matches!(self, Self::Reserved | Self::Borrowed)
    }

    /// 管理操作で直接設定できるステータスか検証する
    pub fn ensure_settable_by_admin(self) -> Result<Self, DomainError> {
        if self.is_in_circulation() {
            return Err(DomainError::InvalidState(format!(
                "{self} は貸出・予約の操作でのみ設定できます"
            )));
        }
        Ok(self)
    }
}

/// 書架上の位置（棚の左端からの距離など、0 以上）
fn validate_shelf_pos(shelf_pos: f64) -> Result<f64, DomainError> {
    if !shelf_pos.is_finite() || shelf_pos < 0.0 {
        return Err(DomainError::Validation(format!(
            "書架上の位置は 0 以上である必要があります: {shelf_pos}"
        )));
    }
    Ok(shelf_pos)
}

/// 蔵書の新規登録パラメータ
pub struct NewBookInstance {
    pub id:        BookInstanceId,
    pub book_id:   BookId,
    pub shelf_id:  ShelfId,
    pub shelf_pos: f64,
    pub tag:       InstanceTag,
    pub status:    BookInstanceStatus,
    pub now:       DateTime<Utc>,
}

/// 蔵書の部分更新内容（管理操作）
#[derive(Debug, Clone, Default)]
pub struct BookInstanceChanges {
    pub book_id:   Option<BookId>,
    pub shelf_id:  Option<ShelfId>,
    pub shelf_pos: Option<f64>,
    pub tag:       Option<InstanceTag>,
    pub status:    Option<BookInstanceStatus>,
}

/// 蔵書エンティティ
#[derive(Debug, Clone, PartialEq)]
pub struct BookInstance {
    id: BookInstanceId,
    book_id: BookId,
    shelf_id: ShelfId,
    shelf_pos: f64,
    tag: InstanceTag,
    status: BookInstanceStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BookInstance {
    pub fn new(params: NewBookInstance) -> Result<Self, DomainError> {
        Ok(Self {
            id: params.id,
            book_id: params.book_id,
            shelf_id: params.shelf_id,
            shelf_pos: validate_shelf_pos(params.shelf_pos)?,
            tag: params.tag,
            status: params.status,
            created_at: params.now,
            updated_at: params.now,
        })
    }

    /// DB からエンティティを復元する
    #[allow(clippy::too_many_arguments)]
    pub fn from_db(
        id: BookInstanceId,
        book_id: BookId,
        shelf_id: ShelfId,
        shelf_pos: f64,
        tag: InstanceTag,
        status: BookInstanceStatus,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            book_id,
            shelf_id,
            shelf_pos,
            tag,
            status,
            created_at,
            updated_at,
        }
    }

    /// 管理操作による部分更新
    ///
    /// ステータスは `available` と `damaged` の間でのみ変更できる。
    /// 取り置き中・貸出中の蔵書のステータスは変更できない。
    pub fn updated(
        self,
        changes: BookInstanceChanges,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let status = match changes.status {
            Some(status) if status != self.status => {
                if self.status.is_in_circulation() {
                    return Err(DomainError::InvalidState(format!(
                        "{} の蔵書のステータスは変更できません",
                        self.status
                    )));
                }
                status.ensure_settable_by_admin()?
            }
            _ => self.status,
        };
        let shelf_pos = match changes.shelf_pos {
            Some(pos) => validate_shelf_pos(pos)?,
            None => self.shelf_pos,
        };
        Ok(Self {
            book_id: changes.book_id.unwrap_or(self.book_id),
            shelf_id: changes.shelf_id.unwrap_or(self.shelf_id),
            shelf_pos,
            tag: changes.tag.unwrap_or(self.tag),
            status,
            updated_at: now,
            ..self
        })
    }

    /// 取り置き状態に遷移する
    ///
    /// `available` 以外からはエラー。
    pub fn reserved(self, now: DateTime<Utc>) -> Result<Self, DomainError> {
        if self.status != BookInstanceStatus::Available {
            return Err(DomainError::InvalidState(format!(
                "予約できない蔵書です（ステータス: {}）",
                self.status
            )));
        }
        Ok(Self {
            status: BookInstanceStatus::Reserved,
            updated_at: now,
            ..self
        })
    }

    /// 貸出中に遷移する
    ///
    /// `available` または `reserved` からのみ遷移できる。
    /// 予約者本人かどうかの判定は [`crate::circulation`] で行う。
    pub fn borrowed(self, now: DateTime<Utc>) -> Result<Self, DomainError> {
        if !matches!(
            self.status,
            BookInstanceStatus::Available | BookInstanceStatus::Reserved
        ) {
            return Err(DomainError::InvalidState(format!(
                "貸出できない蔵書です（ステータス: {}）",
                self.status
            )));
        }
        Ok(Self {
            status: BookInstanceStatus::Borrowed,
            updated_at: now,
            ..self
        })
    }

    /// 返却により貸出可能に戻す
    ///
    /// `destination` が指定された場合のみ書架を移動する。
    /// 未指定の場合は記録上の現在の書架に戻したものとみなす。
    /// `borrowed` 以外からはエラー。
    pub fn returned(
        self,
        destination: Option<ShelfId>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if self.status != BookInstanceStatus::Borrowed {
            return Err(DomainError::InvalidState(format!(
                "貸出中の蔵書ではありません（ステータス: {}）",
                self.status
            )));
        }
        Ok(Self {
            shelf_id: destination.unwrap_or(self.shelf_id),
            status: BookInstanceStatus::Available,
            updated_at: now,
            ..self
        })
    }

    /// 取り置きを解除して貸出可能に戻す
    ///
    /// `reserved` 以外からはエラー。
    pub fn released(self, now: DateTime<Utc>) -> Result<Self, DomainError> {
        if self.status != BookInstanceStatus::Reserved {
            return Err(DomainError::InvalidState(format!(
                "取り置き中ではありません（ステータス: {}）",
                self.status
            )));
        }
        Ok(Self {
            status: BookInstanceStatus::Available,
            updated_at: now,
            ..self
        })
    }

    pub fn id(&self) -> &BookInstanceId {
        &self.id
    }

    pub fn book_id(&self) -> &BookId {
        &self.book_id
    }

    pub fn shelf_id(&self) -> &ShelfId {
        &self.shelf_id
    }

    pub fn shelf_pos(&self) -> f64 {
        self.shelf_pos
    }

    pub fn tag(&self) -> &InstanceTag {
        &self.tag
    }

    pub fn status(&self) -> BookInstanceStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
