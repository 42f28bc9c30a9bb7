//! # 蔵書ハンドラ
//!
//! ## エンドポイント
//!
//! - `POST /book-instances` - 蔵書登録
//! - `GET /book-instances/{instance_id}` - 蔵書詳細
//! - `PUT /book-instances/{instance_id}` - 蔵書の部分更新
//! - `DELETE /book-instances/{instance_id}` - 蔵書削除

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use bookshelf_domain::{
    book::BookId,
    book_instance::{BookInstance, BookInstanceId, BookInstanceStatus},
    shelf::ShelfId,
};
use bookshelf_shared::ApiResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::ServiceError,
    usecase::{BookInstanceUseCaseImpl, CreateBookInstanceInput, UpdateBookInstanceInput},
};

/// 蔵書 API の共有状態
pub struct BookInstanceState {
    pub usecase: BookInstanceUseCaseImpl,
}

// --- リクエスト/レスポンス型 ---

/// 蔵書登録リクエスト
#[derive(Debug, Deserialize)]
pub struct CreateBookInstanceRequest {
    pub book_id:   Uuid,
    pub shelf_id:  Uuid,
    pub shelf_pos: f64,
    #[serde(alias = "rfid_tag")]
    pub tag:       String,
    pub status:    Option<BookInstanceStatus>,
}

/// 蔵書更新リクエスト
#[derive(Debug, Deserialize)]
pub struct UpdateBookInstanceRequest {
    pub book_id:   Option<Uuid>,
    pub shelf_id:  Option<Uuid>,
    pub shelf_pos: Option<f64>,
    #[serde(alias = "rfid_tag")]
    pub tag:       Option<String>,
    pub status:    Option<BookInstanceStatus>,
}

/// 蔵書 DTO
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct BookInstanceDto {
    pub id:         Uuid,
    pub book_id:    Uuid,
    pub shelf_id:   Uuid,
    pub shelf_pos:  f64,
    pub tag:        String,
    pub status:     BookInstanceStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&BookInstance> for BookInstanceDto {
    fn from(instance: &BookInstance) -> Self {
        Self {
            id:         *instance.id().as_uuid(),
            book_id:    *instance.book_id().as_uuid(),
            shelf_id:   *instance.shelf_id().as_uuid(),
            shelf_pos:  instance.shelf_pos(),
            tag:        instance.tag().as_str().to_string(),
            status:     instance.status(),
            created_at: instance.created_at().to_rfc3339(),
            updated_at: instance.updated_at().to_rfc3339(),
        }
    }
}

pub(crate) fn instance_dtos(instances: &[BookInstance]) -> Vec<BookInstanceDto> {
    instances.iter().map(BookInstanceDto::from).collect()
}

// --- ハンドラ ---

/// POST /book-instances
///
/// ## レスポンス
///
/// - `201 Created`: 登録された蔵書
/// - `400 Bad Request`: タグが空、位置が負数
/// - `404 Not Found`: 書誌または書架が存在しない
/// - `409 Conflict`: タグが重複
#[tracing::instrument(skip_all)]
pub async fn create_instance(
    State(state): State<Arc<BookInstanceState>>,
    Json(req): Json<CreateBookInstanceRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let input = CreateBookInstanceInput {
        book_id:   BookId::from_uuid(req.book_id),
        shelf_id:  ShelfId::from_uuid(req.shelf_id),
        shelf_pos: req.shelf_pos,
        tag:       req.tag,
        status:    req.status,
    };

    let instance = state.usecase.create_instance(input).await?;

    let response = ApiResponse::new(BookInstanceDto::from(&instance));
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /book-instances/{instance_id}
#[tracing::instrument(skip_all, fields(%instance_id))]
pub async fn get_instance(
    State(state): State<Arc<BookInstanceState>>,
    Path(instance_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let instance = state
        .usecase
        .get_instance(&BookInstanceId::from_uuid(instance_id))
        .await?;

    Ok(Json(ApiResponse::new(BookInstanceDto::from(&instance))))
}

/// PUT /book-instances/{instance_id}
///
/// 指定した項目のみ更新する。
///
/// ## レスポンス
///
/// - `200 OK`: 更新後の蔵書
/// - `404 Not Found`: 蔵書、または変更先の書誌・書架が存在しない
/// - `409 Conflict`: タグが重複
#[tracing::instrument(skip_all, fields(%instance_id))]
pub async fn update_instance(
    State(state): State<Arc<BookInstanceState>>,
    Path(instance_id): Path<Uuid>,
    Json(req): Json<UpdateBookInstanceRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let input = UpdateBookInstanceInput {
        book_id:   req.book_id.map(BookId::from_uuid),
        shelf_id:  req.shelf_id.map(ShelfId::from_uuid),
        shelf_pos: req.shelf_pos,
        tag:       req.tag,
        status:    req.status,
    };

    let instance = state
        .usecase
        .update_instance(&BookInstanceId::from_uuid(instance_id), input)
        .await?;

    Ok(Json(ApiResponse::new(BookInstanceDto::from(&instance))))
}

/// DELETE /book-instances/{instance_id}
///
/// ## レスポンス
///
/// - `204 No Content`: 削除成功
/// - `404 Not Found`: 蔵書が存在しない
/// - `409 Conflict`: 貸出履歴や予約から参照されている
#[tracing::instrument(skip_all, fields(%instance_id))]
pub async fn delete_instance(
    State(state): State<Arc<BookInstanceState>>,
    Path(instance_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .usecase
        .delete_instance(&BookInstanceId::from_uuid(instance_id))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
