//! # 書誌ハンドラ
//!
//! ## エンドポイント
//!
//! - `GET /books` - 書誌一覧（`name` / `author` / `genre` の部分一致検索）
//! - `POST /books` - 書誌登録
//! - `GET /books/{book_id}` - 書誌詳細
//! - `PUT /books/{book_id}` - 書誌の部分更新
//! - `DELETE /books/{book_id}` - 書誌削除
//! - `GET /books/{book_id}/instances` - 貸出可能な蔵書一覧

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use bookshelf_domain::book::{Book, BookId, BookSearch};
use bookshelf_shared::ApiResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::ServiceError,
    handler::book_instance::instance_dtos,
    usecase::{BookUseCaseImpl, CreateBookInput, UpdateBookInput},
};

/// 書誌 API の共有状態
pub struct BookState {
    pub usecase: BookUseCaseImpl,
}

// --- リクエスト/レスポンス型 ---

/// 書誌検索クエリ
#[derive(Debug, Deserialize)]
pub struct BookSearchQuery {
    pub name:   Option<String>,
    pub author: Option<String>,
    pub genre:  Option<String>,
}

/// 書誌登録リクエスト
#[derive(Debug, Deserialize)]
pub struct CreateBookRequest {
    pub name:            String,
    pub author:          String,
    pub description:     Option<String>,
    pub cover_image_url: Option<String>,
    pub genre:           Option<String>,
}

/// 書誌更新リクエスト
#[derive(Debug, Deserialize)]
pub struct UpdateBookRequest {
    pub name:            Option<String>,
    pub author:          Option<String>,
    pub description:     Option<String>,
    pub cover_image_url: Option<String>,
    pub genre:           Option<String>,
}

/// 書誌 DTO
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct BookDto {
    pub id:              Uuid,
    pub name:            String,
    pub author:          String,
    pub description:     Option<String>,
    pub cover_image_url: Option<String>,
    pub genre:           Option<String>,
    pub created_at:      String,
    pub updated_at:      String,
}

impl From<&Book> for BookDto {
    fn from(book: &Book) -> Self {
        Self {
            id:              *book.id().as_uuid(),
            name:            book.name().as_str().to_string(),
            author:          book.author().as_str().to_string(),
            description:     book.description().map(str::to_string),
            cover_image_url: book.cover_image_url().map(str::to_string),
            genre:           book.genre().map(str::to_string),
            created_at:      book.created_at().to_rfc3339(),
            updated_at:      book.updated_at().to_rfc3339(),
        }
    }
}

// --- ハンドラ ---

/// GET /books
///
/// 指定した条件すべてに大文字小文字を区別せず部分一致する書誌を返す。
#[tracing::instrument(skip_all)]
pub async fn list_books(
    State(state): State<Arc<BookState>>,
    Query(query): Query<BookSearchQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let search = BookSearch::new(query.name, query.author, query.genre);

    let books = state.usecase.list_books(&search).await?;

    let items: Vec<BookDto> = books.iter().map(BookDto::from).collect();
    Ok(Json(ApiResponse::new(items)))
}

/// POST /books
///
/// ## レスポンス
///
/// - `201 Created`: 登録された書誌
/// - `400 Bad Request`: 書名・著者名が空、または長すぎる
#[tracing::instrument(skip_all)]
pub async fn create_book(
    State(state): State<Arc<BookState>>,
    Json(req): Json<CreateBookRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let input = CreateBookInput {
        name:            req.name,
        author:          req.author,
        description:     req.description,
        cover_image_url: req.cover_image_url,
        genre:           req.genre,
    };

    let book = state.usecase.create_book(input).await?;

    let response = ApiResponse::new(BookDto::from(&book));
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /books/{book_id}
#[tracing::instrument(skip_all, fields(%book_id))]
pub async fn get_book(
    State(state): State<Arc<BookState>>,
    Path(book_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let book = state.usecase.get_book(&BookId::from_uuid(book_id)).await?;

    Ok(Json(ApiResponse::new(BookDto::from(&book))))
}

/// PUT /books/{book_id}
///
/// 指定した項目のみ更新する。
#[tracing::instrument(skip_all, fields(%book_id))]
pub async fn update_book(
    State(state): State<Arc<BookState>>,
    Path(book_id): Path<Uuid>,
    Json(req): Json<UpdateBookRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let input = UpdateBookInput {
        name:            req.name,
        author:          req.author,
        description:     req.description,
        cover_image_url: req.cover_image_url,
        genre:           req.genre,
    };

    let book = state
        .usecase
        .update_book(&BookId::from_uuid(book_id), input)
        .await?;

    Ok(Json(ApiResponse::new(BookDto::from(&book))))
}

/// DELETE /books/{book_id}
///
/// ## レスポンス
///
/// - `204 No Content`: 削除成功
/// - `404 Not Found`: 書誌が存在しない
/// - `409 Conflict`: 蔵書から参照されている
#[tracing::instrument(skip_all, fields(%book_id))]
pub async fn delete_book(
    State(state): State<Arc<BookState>>,
    Path(book_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .usecase
        .delete_book(&BookId::from_uuid(book_id))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /books/{book_id}/instances
///
/// 書誌の蔵書のうち貸出可能なものを返す。
#[tracing::instrument(skip_all, fields(%book_id))]
pub async fn list_book_instances(
    State(state): State<Arc<BookState>>,
    Path(book_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let instances = state
        .usecase
        .list_available_instances(&BookId::from_uuid(book_id))
        .await?;

    Ok(Json(ApiResponse::new(instance_dtos(&instances))))
}
