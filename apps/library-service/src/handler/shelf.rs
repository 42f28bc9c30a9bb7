//! # 書架ハンドラ
//!
//! ## エンドポイント
//!
//! - `GET /shelves` - 書架一覧
//! - `POST /shelves` - 書架登録
//! - `GET /shelves/{shelf_id}` - 書架詳細
//! - `PUT /shelves/{shelf_id}` - 書架の部分更新
//! - `DELETE /shelves/{shelf_id}` - 書架削除
//! - `GET /shelves/{shelf_id}/books` - 書架に置かれた蔵書一覧

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use bookshelf_domain::shelf::{Shelf, ShelfId, ShelfStatus};
use bookshelf_shared::ApiResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::ServiceError,
    handler::book_instance::instance_dtos,
    usecase::{CreateShelfInput, ShelfUseCaseImpl, UpdateShelfInput},
};

/// 書架 API の共有状態
pub struct ShelfState {
    pub usecase: ShelfUseCaseImpl,
}

// --- リクエスト/レスポンス型 ---

/// 書架登録リクエスト
#[derive(Debug, Deserialize)]
pub struct CreateShelfRequest {
    pub name:      String,
    pub capacity:  i32,
    pub latitude:  Option<f64>,
    pub longitude: Option<f64>,
    pub status:    Option<ShelfStatus>,
}

/// 書架更新リクエスト
#[derive(Debug, Deserialize)]
pub struct UpdateShelfRequest {
    pub name:      Option<String>,
    pub capacity:  Option<i32>,
    pub latitude:  Option<f64>,
    pub longitude: Option<f64>,
    pub status:    Option<ShelfStatus>,
}

/// 書架 DTO
///
/// 位置が未登録の書架は `latitude` / `longitude` ともに `null`。
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ShelfDto {
    pub id:         Uuid,
    pub name:       String,
    pub capacity:   i32,
    pub latitude:   Option<f64>,
    pub longitude:  Option<f64>,
    pub status:     ShelfStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Shelf> for ShelfDto {
    fn from(shelf: &Shelf) -> Self {
        let coordinates = shelf.coordinates();
        Self {
            id:         *shelf.id().as_uuid(),
            name:       shelf.name().as_str().to_string(),
            capacity:   shelf.capacity(),
            latitude:   coordinates.map(|c| c.latitude()),
            longitude:  coordinates.map(|c| c.longitude()),
            status:     shelf.status(),
            created_at: shelf.created_at().to_rfc3339(),
            updated_at: shelf.updated_at().to_rfc3339(),
        }
    }
}

// --- ハンドラ ---

/// GET /shelves
#[tracing::instrument(skip_all)]
pub async fn list_shelves(
    State(state): State<Arc<ShelfState>>,
) -> Result<impl IntoResponse, ServiceError> {
    let shelves = state.usecase.list_shelves().await?;

    let items: Vec<ShelfDto> = shelves.iter().map(ShelfDto::from).collect();
    Ok(Json(ApiResponse::new(items)))
}

/// POST /shelves
///
/// ## レスポンス
///
/// - `201 Created`: 登録された書架
/// - `400 Bad Request`: 名前が空、収容数が負数、緯度・経度の片方のみ指定
#[tracing::instrument(skip_all)]
pub async fn create_shelf(
    State(state): State<Arc<ShelfState>>,
    Json(req): Json<CreateShelfRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let input = CreateShelfInput {
        name:      req.name,
        capacity:  req.capacity,
        latitude:  req.latitude,
        longitude: req.longitude,
        status:    req.status,
    };

    let shelf = state.usecase.create_shelf(input).await?;

    let response = ApiResponse::new(ShelfDto::from(&shelf));
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /shelves/{shelf_id}
#[tracing::instrument(skip_all, fields(%shelf_id))]
pub async fn get_shelf(
    State(state): State<Arc<ShelfState>>,
    Path(shelf_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let shelf = state
        .usecase
        .get_shelf(&ShelfId::from_uuid(shelf_id))
        .await?;

    Ok(Json(ApiResponse::new(ShelfDto::from(&shelf))))
}

/// PUT /shelves/{shelf_id}
#[tracing::instrument(skip_all, fields(%shelf_id))]
pub async fn update_shelf(
    State(state): State<Arc<ShelfState>>,
    Path(shelf_id): Path<Uuid>,
    Json(req): Json<UpdateShelfRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let input = UpdateShelfInput {
        name:      req.name,
        capacity:  req.capacity,
        latitude:  req.latitude,
        longitude: req.longitude,
        status:    req.status,
    };

    let shelf = state
        .usecase
        .update_shelf(&ShelfId::from_uuid(shelf_id), input)
        .await?;

    Ok(Json(ApiResponse::new(ShelfDto::from(&shelf))))
}

/// DELETE /shelves/{shelf_id}
///
/// ## レスポンス
///
/// - `204 No Content`: 削除成功
/// - `404 Not Found`: 書架が存在しない
/// - `409 Conflict`: 蔵書が置かれている
#[tracing::instrument(skip_all, fields(%shelf_id))]
pub async fn delete_shelf(
    State(state): State<Arc<ShelfState>>,
    Path(shelf_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .usecase
        .delete_shelf(&ShelfId::from_uuid(shelf_id))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /shelves/{shelf_id}/books
///
/// ステータスに関わらず書架上の蔵書をすべて返す。
#[tracing::instrument(skip_all, fields(%shelf_id))]
pub async fn list_shelf_books(
    State(state): State<Arc<ShelfState>>,
    Path(shelf_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let instances = state
        .usecase
        .list_instances(&ShelfId::from_uuid(shelf_id))
        .await?;

    Ok(Json(ApiResponse::new(instance_dtos(&instances))))
}
