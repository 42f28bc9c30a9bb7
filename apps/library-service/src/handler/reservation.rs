//! # 取り置き予約ハンドラ
//!
//! ## エンドポイント
//!
//! - `POST /reservations` - 予約作成
//! - `GET /users/{user_id}/reservations` - 利用者の受け取り待ち予約一覧
//! - `PUT /reservations/{reservation_id}` - ステータス・期限の修正
//! - `DELETE /reservations/{reservation_id}` - 予約削除（取り置きの解除）
//!
//! 受け取り（`POST /reservations/pickup`）は貸出を作るため
//! [`circulation`](super::circulation) に置く。

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use bookshelf_domain::{
    book_instance::BookInstanceId,
    reservation::{Reservation, ReservationId, ReservationStatus},
    user::UserId,
};
use bookshelf_shared::ApiResponse;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::ServiceError,
    usecase::{ReservationUseCaseImpl, UpdateReservationInput},
};

/// 予約 API の共有状態
pub struct ReservationState {
    pub usecase: ReservationUseCaseImpl,
}

// --- リクエスト/レスポンス型 ---

/// 予約作成リクエスト
#[derive(Debug, Deserialize)]
pub struct CreateReservationRequest {
    pub user_id:          Uuid,
    pub book_instance_id: Uuid,
    pub exp_date:         DateTime<Utc>,
}

/// 予約更新リクエスト
#[derive(Debug, Deserialize)]
pub struct UpdateReservationRequest {
    pub status:   Option<ReservationStatus>,
    pub exp_date: Option<DateTime<Utc>>,
}

/// 予約 DTO
///
/// `qr_code_url` は QR 画像の保存に失敗した場合 `null`。
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ReservationDto {
    pub id:               Uuid,
    pub user_id:          Uuid,
    pub book_instance_id: Uuid,
    pub status:           ReservationStatus,
    pub date:             String,
    pub exp_date:         String,
    pub pickup_code:      String,
    pub qr_code_url:      Option<String>,
    pub created_at:       String,
    pub updated_at:       String,
}

impl From<&Reservation> for ReservationDto {
    fn from(reservation: &Reservation) -> Self {
        Self {
            id:               *reservation.id().as_uuid(),
            user_id:          *reservation.user_id().as_uuid(),
            book_instance_id: *reservation.book_instance_id().as_uuid(),
            status:           reservation.status(),
            date:             reservation.date().to_rfc3339(),
            exp_date:         reservation.exp_date().to_rfc3339(),
            pickup_code:      reservation.pickup_code().as_str().to_string(),
            qr_code_url:      reservation.qr_code_url().map(str::to_string),
            created_at:       reservation.created_at().to_rfc3339(),
            updated_at:       reservation.updated_at().to_rfc3339(),
        }
    }
}

// --- ハンドラ ---

/// POST /reservations
///
/// ## レスポンス
///
/// - `201 Created`: 作成された予約（受け取りコードを含む）
/// - `400 Bad Request`: 期限が現在時刻以前
/// - `404 Not Found`: 蔵書が存在しない
/// - `409 Conflict`: 同時に予約された、または受け取りコードを発行できない
/// - `422 Unprocessable Entity`: 蔵書が貸出可能でない
#[tracing::instrument(skip_all, fields(user_id = %req.user_id, instance_id = %req.book_instance_id))]
pub async fn create_reservation(
    State(state): State<Arc<ReservationState>>,
    Json(req): Json<CreateReservationRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let reservation = state
        .usecase
        .reserve(
            UserId::from_uuid(req.user_id),
            BookInstanceId::from_uuid(req.book_instance_id),
            req.exp_date,
        )
        .await?;

    let response = ApiResponse::new(ReservationDto::from(&reservation));
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /users/{user_id}/reservations
#[tracing::instrument(skip_all, fields(%user_id))]
pub async fn list_user_reservations(
    State(state): State<Arc<ReservationState>>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let reservations = state
        .usecase
        .list_for_user(&UserId::from_uuid(user_id))
        .await?;

    let items: Vec<ReservationDto> = reservations.iter().map(ReservationDto::from).collect();
    Ok(Json(ApiResponse::new(items)))
}

/// PUT /reservations/{reservation_id}
///
/// 予約レコードのみ書き換え、蔵書のステータスは変更しない。
#[tracing::instrument(skip_all, fields(%reservation_id))]
pub async fn update_reservation(
    State(state): State<Arc<ReservationState>>,
    Path(reservation_id): Path<Uuid>,
    Json(req): Json<UpdateReservationRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let input = UpdateReservationInput {
        status:   req.status,
        exp_date: req.exp_date,
    };

    let reservation = state
        .usecase
        .update_reservation(&ReservationId::from_uuid(reservation_id), input)
        .await?;

    Ok(Json(ApiResponse::new(ReservationDto::from(&reservation))))
}

/// DELETE /reservations/{reservation_id}
///
/// ## レスポンス
///
/// - `204 No Content`: 削除成功（受け取り待ちなら蔵書を貸出可能に戻す）
/// - `404 Not Found`: 予約が存在しない
#[tracing::instrument(skip_all, fields(%reservation_id))]
pub async fn delete_reservation(
    State(state): State<Arc<ReservationState>>,
    Path(reservation_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .usecase
        .cancel_reservation(&ReservationId::from_uuid(reservation_id))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
