//! # 取り置き予約
//!
//! 利用者が特定の蔵書を取り置くための予約。作成時に 6 桁の受け取りコードを
//! 発行し、利用者はコード入力（または QR 読み取り）で蔵書を受け取る。
//!
//! ## 状態遷移
//!
//! ```text
//! pending ──受け取り / 予約者本人の貸出──▶ completed
//!    │
//!    └──期限切れで受け取り──▶ expired
//! ```
//!
//! 期限切れは受け取り時にのみ判定する（定期的な掃き出しは行わない）。

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::{DomainError, book_instance::BookInstanceId, user::UserId};

define_uuid_id! {
    /// 予約の一意識別子
    pub struct ReservationId;
}

/// 予約のステータス
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReservationStatus {
    /// 受け取り待ち
    Pending,
    /// 確認済み
    Confirmed,
    /// 受け取り完了
    Completed,
    /// 取消
    Cancelled,
    /// 期限切れ
    Expired,
}

impl_status_from_str!(ReservationStatus, "予約ステータス", {
    "pending" => Pending,
    "confirmed" => Confirmed,
    "completed" => Completed,
    "cancelled" => Cancelled,
    "expired" => Expired,
});

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// 受け取りコード（6 桁の数字）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PickupCode(String);

impl PickupCode {
    /// 受け取りコードの桁数
    pub const LENGTH: usize = 6;

    /// 暗号論的に安全な乱数源から新しいコードを生成する
    ///
    /// `rand::rng()` は OS エントロピーでシードされた CSPRNG を返す。
    pub fn generate() -> Self {
        let n: u32 = rand::rng().random_range(0..1_000_000);
        Self(format!("{n:06}"))
    }

    /// 入力されたコードを検証する
    pub fn parse(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into().trim().to_string();
        if value.len() != Self::LENGTH || !value.chars().all(|c| c.is_ascii_digit()) {
            return Err(DomainError::Validation(format!(
                "受け取りコードは {} 桁の数字である必要があります",
                Self::LENGTH
            )));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PickupCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 予約の作成パラメータ
pub struct NewReservation {
    pub id:               ReservationId,
    pub user_id:          UserId,
    pub book_instance_id: BookInstanceId,
    pub exp_date:         DateTime<Utc>,
    pub pickup_code:      PickupCode,
    pub now:              DateTime<Utc>,
}

/// 予約の部分更新内容（管理操作）
#[derive(Debug, Clone, Default)]
pub struct ReservationChanges {
    pub status:   Option<ReservationStatus>,
    pub exp_date: Option<DateTime<Utc>>,
}

/// 予約エンティティ
#[derive(Debug, Clone, PartialEq)]
pub struct Reservation {
    id: ReservationId,
    user_id: UserId,
    book_instance_id: BookInstanceId,
    status: ReservationStatus,
    date: DateTime<Utc>,
    exp_date: DateTime<Utc>,
    pickup_code: PickupCode,
    qr_code_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Reservation {
    /// 受け取り待ちの予約を作成する
    ///
    /// 期限の妥当性は問わない。過去の期限は受け取り時に期限切れとして扱われる。
    pub fn new(params: NewReservation) -> Self {
        Self {
            id: params.id,
            user_id: params.user_id,
            book_instance_id: params.book_instance_id,
            status: ReservationStatus::Pending,
            date: params.now,
            exp_date: params.exp_date,
            pickup_code: params.pickup_code,
            qr_code_url: None,
            created_at: params.now,
            updated_at: params.now,
        }
    }

    /// DB からエンティティを復元する
    #[allow(clippy::too_many_arguments)]
    pub fn from_db(
        id: ReservationId,
        user_id: UserId,
        book_instance_id: BookInstanceId,
        status: ReservationStatus,
        date: DateTime<Utc>,
        exp_date: DateTime<Utc>,
        pickup_code: PickupCode,
        qr_code_url: Option<String>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            book_instance_id,
            status,
            date,
            exp_date,
            pickup_code,
            qr_code_url,
            created_at,
            updated_at,
        }
    }

    /// 期限を過ぎているか
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.exp_date < now
    }

    pub fn is_pending(&self) -> bool {
        self.status == ReservationStatus::Pending
    }

    /// 受け取り完了にする（`pending` のみ）
    pub fn completed(self, now: DateTime<Utc>) -> Result<Self, DomainError> {
        self.transition_from_pending(ReservationStatus::Completed, now)
    }

    /// 期限切れにする（`pending` のみ）
    pub fn expired(self, now: DateTime<Utc>) -> Result<Self, DomainError> {
        self.transition_from_pending(ReservationStatus::Expired, now)
    }

    fn transition_from_pending(
        self,
        to: ReservationStatus,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if self.status != ReservationStatus::Pending {
            return Err(DomainError::InvalidState(format!(
                "受け取り待ちの予約ではありません（ステータス: {}）",
                self.status
            )));
        }
        Ok(Self {
            status: to,
            updated_at: now,
            ..self
        })
    }

    /// 受け取りコード画像の URL を設定する
    pub fn with_qr_code_url(self, url: String, now: DateTime<Utc>) -> Self {
        Self {
            qr_code_url: Some(url),
            updated_at: now,
            ..self
        }
    }

    /// 管理操作による部分更新
    ///
    /// 期限は常に変更できる。ステータスの変更は次に限る。
    ///
    /// - `pending` から `cancelled` / `expired` へ（蔵書の取り置き解除は呼び出し側が行う）
    /// - `pending` 以外のステータス同士
    ///
    /// `pending` への変更と、`pending` から `confirmed` / `completed` への変更は `InvalidState`。
    pub fn updated(
        self,
        changes: ReservationChanges,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let status = match changes.status {
            Some(status) if status != self.status => {
                if status == ReservationStatus::Pending {
                    return Err(DomainError::InvalidState(
                        "予約を受け取り待ちに戻すことはできません".to_string(),
                    ));
                }
                if self.is_pending()
                    && !matches!(
                        status,
                        ReservationStatus::Cancelled | ReservationStatus::Expired
                    )
                {
                    return Err(DomainError::InvalidState(format!(
                        "受け取り待ちの予約は {status} に変更できません"
                    )));
                }
                status
            }
            _ => self.status,
        };
        Ok(Self {
            status,
            exp_date: changes.exp_date.unwrap_or(self.exp_date),
            updated_at: now,
            ..self
        })
    }

    pub fn id(&self) -> &ReservationId {
        &self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn book_instance_id(&self) -> &BookInstanceId {
        &self.book_instance_id
    }

    pub fn status(&self) -> ReservationStatus {
        self.status
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn exp_date(&self) -> DateTime<Utc> {
        self.exp_date
    }

    pub fn pickup_code(&self) -> &PickupCode {
        &self.pickup_code
    }

    pub fn qr_code_url(&self) -> Option<&str> {
        self.qr_code_url.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
