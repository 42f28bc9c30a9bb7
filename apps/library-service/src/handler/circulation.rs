//! # 貸出・返却ハンドラ
//!
//! 蔵書は RFID タグで指定する。
//!
//! ## エンドポイント
//!
//! - `POST /borrow` - 貸出
//! - `POST /return` - 返却（返却先の書架を指定可能）
//! - `POST /return-quick` - 返却先を指定しない返却
//! - `POST /reservations/pickup?pickup_code=...` - 受け取りコードによる貸出

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use bookshelf_domain::{
    shelf::ShelfId,
    transaction::{Transaction, TransactionStatus, TransactionType},
    user::UserId,
};
use bookshelf_shared::ApiResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::ServiceError, usecase::CirculationUseCaseImpl};

/// 貸出・返却 API の共有状態
pub struct CirculationState {
    pub usecase: CirculationUseCaseImpl,
}

// --- リクエスト/レスポンス型 ---

/// 貸出リクエスト
#[derive(Debug, Deserialize)]
pub struct BorrowRequest {
    pub user_id:      Uuid,
    pub instance_tag: String,
}

/// 返却リクエスト
#[derive(Debug, Deserialize)]
pub struct ReturnRequest {
    pub instance_tag: String,
    /// 返却先の書架。省略時は蔵書の現在の書架
    pub shelf_id:     Option<Uuid>,
}

/// 返却先を指定しない返却リクエスト
#[derive(Debug, Deserialize)]
pub struct ReturnQuickRequest {
    pub instance_tag: String,
}

/// 受け取りクエリ
#[derive(Debug, Deserialize)]
pub struct PickupQuery {
    pub pickup_code: String,
}

/// 貸出・返却トランザクション DTO
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct TransactionDto {
    pub id:               Uuid,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub status:           TransactionStatus,
    pub date:             String,
    pub due_date:         Option<String>,
    pub user_id:          Uuid,
    pub book_instance_id: Uuid,
    pub shelf_id:         Uuid,
    pub created_at:       String,
    pub updated_at:       String,
}

impl From<&Transaction> for TransactionDto {
    fn from(transaction: &Transaction) -> Self {
        Self {
            id:               *transaction.id().as_uuid(),
            transaction_type: transaction.transaction_type(),
            status:           transaction.status(),
            date:             transaction.date().to_rfc3339(),
            due_date:         transaction.due_date().map(|d| d.to_rfc3339()),
            user_id:          *transaction.user_id().as_uuid(),
            book_instance_id: *transaction.book_instance_id().as_uuid(),
            shelf_id:         *transaction.shelf_id().as_uuid(),
            created_at:       transaction.created_at().to_rfc3339(),
            updated_at:       transaction.updated_at().to_rfc3339(),
        }
    }
}

pub(crate) fn transaction_dtos(transactions: &[Transaction]) -> Vec<TransactionDto> {
    transactions.iter().map(TransactionDto::from).collect()
}

// --- ハンドラ ---

/// POST /borrow
///
/// ## レスポンス
///
/// - `201 Created`: 作成された貸出トランザクション
/// - `403 Forbidden`: 他の利用者が取り置き中
/// - `404 Not Found`: タグに対応する蔵書がない
/// - `422 Unprocessable Entity`: 貸出できないステータス
#[tracing::instrument(skip_all, fields(user_id = %req.user_id))]
pub async fn borrow(
    State(state): State<Arc<CirculationState>>,
    Json(req): Json<BorrowRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let transaction = state
        .usecase
        .borrow(UserId::from_uuid(req.user_id), req.instance_tag)
        .await?;

    let response = ApiResponse::new(TransactionDto::from(&transaction));
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /return
///
/// ## レスポンス
///
/// - `201 Created`: 作成された返却トランザクション
/// - `404 Not Found`: 蔵書または返却先の書架がない
/// - `422 Unprocessable Entity`: 貸出中の蔵書ではない
#[tracing::instrument(skip_all)]
pub async fn return_book(
    State(state): State<Arc<CirculationState>>,
    Json(req): Json<ReturnRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let transaction = state
        .usecase
        .return_book(req.instance_tag, req.shelf_id.map(ShelfId::from_uuid))
        .await?;

    let response = ApiResponse::new(TransactionDto::from(&transaction));
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /return-quick
#[tracing::instrument(skip_all)]
pub async fn return_quick(
    State(state): State<Arc<CirculationState>>,
    Json(req): Json<ReturnQuickRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let transaction = state.usecase.return_quick(req.instance_tag).await?;

    let response = ApiResponse::new(TransactionDto::from(&transaction));
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /reservations/pickup?pickup_code=...
///
/// ## レスポンス
///
/// - `201 Created`: 作成された貸出トランザクション
/// - `400 Bad Request`: コードが 6 桁の数字でない
/// - `404 Not Found`: 受け取り待ちの予約がない
/// - `410 Gone`: 受け取り期限を過ぎている（予約は期限切れになる）
#[tracing::instrument(skip_all)]
pub async fn pickup(
    State(state): State<Arc<CirculationState>>,
    Query(query): Query<PickupQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let transaction = state.usecase.pickup_by_code(query.pickup_code).await?;

    let response = ApiResponse::new(TransactionDto::from(&transaction));
    Ok((StatusCode::CREATED, Json(response)))
}

#[cfg(test)]
mod tests {
    use axum::http::Method;
    use bookshelf_domain::book_instance::BookInstanceStatus;
    use chrono::Duration;
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    use super::*;
    use crate::{
        app_builder::build_app,
        handler::test_support::{empty_request, json_request, response_body},
        test_utils::LibraryTestBuilder,
    };

    #[tokio::test]
    async fn test_borrow_貸出可能な蔵書は201が返る() {
        // Given
        let builder = LibraryTestBuilder::new();
        let instance = builder.add_instance("RFID-0001", BookInstanceStatus::Available);
        let user_id = UserId::new();
        let sut = build_app(builder.dependencies());

        // When
        let response = sut
            .oneshot(json_request(
                Method::POST,
                "/borrow",
                serde_json::json!({
                    "user_id": user_id.as_uuid(),
                    "instance_tag": "RFID-0001"
                }),
            ))
            .await
            .unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: ApiResponse<TransactionDto> = response_body(response).await;
        assert_eq!(body.data.transaction_type, TransactionType::Borrow);
        assert_eq!(body.data.status, TransactionStatus::Pending);
        assert_eq!(body.data.book_instance_id, *instance.id().as_uuid());
        assert!(body.data.due_date.is_none());
        assert_eq!(
            builder.instances.get(instance.id()).unwrap().status(),
            BookInstanceStatus::Borrowed
        );
    }

    #[tokio::test]
    async fn test_borrow_トランザクション種別はtypeとして出力される() {
        // Given
        let builder = LibraryTestBuilder::new();
        builder.add_instance("RFID-0001", BookInstanceStatus::Available);
        let sut = build_app(builder.dependencies());

        // When
        let response = sut
            .oneshot(json_request(
                Method::POST,
                "/borrow",
                serde_json::json!({
                    "user_id": UserId::new().as_uuid(),
                    "instance_tag": "RFID-0001"
                }),
            ))
            .await
            .unwrap();

        // Then
        let body: serde_json::Value = response_body(response).await;
        assert_eq!(body["data"]["type"], "borrow");
        assert_eq!(body["data"]["status"], "pending");
    }

    #[tokio::test]
    async fn test_borrow_他の利用者の取り置きは403が返る() {
        // Given
        let builder = LibraryTestBuilder::new();
        builder.add_reserved_instance("RFID-0001", &UserId::new(), "123456", Duration::days(1));
        let sut = build_app(builder.dependencies());

        // When
        let response = sut
            .oneshot(json_request(
                Method::POST,
                "/borrow",
                serde_json::json!({
                    "user_id": UserId::new().as_uuid(),
                    "instance_tag": "RFID-0001"
                }),
            ))
            .await
            .unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_borrow_貸出中の蔵書は422が返る() {
        // Given
        let builder = LibraryTestBuilder::new();
        builder.add_borrowed_instance("RFID-0001", &UserId::new());
        let sut = build_app(builder.dependencies());

        // When
        let response = sut
            .oneshot(json_request(
                Method::POST,
                "/borrow",
                serde_json::json!({
                    "user_id": UserId::new().as_uuid(),
                    "instance_tag": "RFID-0001"
                }),
            ))
            .await
            .unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_return_返却先の書架に移動する() {
        // Given
        let builder = LibraryTestBuilder::new();
        let user_id = UserId::new();
        let (instance, _) = builder.add_borrowed_instance("RFID-0001", &user_id);
        let destination = builder.add_shelf("図書館前の書架");
        let sut = build_app(builder.dependencies());

        // When
        let response = sut
            .oneshot(json_request(
                Method::POST,
                "/return",
                serde_json::json!({
                    "instance_tag": "RFID-0001",
                    "shelf_id": destination.id().as_uuid()
                }),
            ))
            .await
            .unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: ApiResponse<TransactionDto> = response_body(response).await;
        assert_eq!(body.data.transaction_type, TransactionType::Return);
        assert_eq!(body.data.status, TransactionStatus::Completed);
        assert_eq!(body.data.user_id, *user_id.as_uuid());
        assert_eq!(body.data.shelf_id, *destination.id().as_uuid());

        let returned = builder.instances.get(instance.id()).unwrap();
        assert_eq!(returned.status(), BookInstanceStatus::Available);
        assert_eq!(returned.shelf_id(), destination.id());
    }

    #[tokio::test]
    async fn test_return_quick_貸出中でない蔵書は422が返る() {
        // Given
        let builder = LibraryTestBuilder::new();
        builder.add_instance("RFID-0001", BookInstanceStatus::Available);
        let sut = build_app(builder.dependencies());

        // When
        let response = sut
            .oneshot(json_request(
                Method::POST,
                "/return-quick",
                serde_json::json!({ "instance_tag": "RFID-0001" }),
            ))
            .await
            .unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_pickup_受け取りコードで貸し出される() {
        // Given
        let builder = LibraryTestBuilder::new();
        let user_id = UserId::new();
        let (instance, _) =
            builder.add_reserved_instance("RFID-0001", &user_id, "123456", Duration::days(1));
        let sut = build_app(builder.dependencies());

        // When
        let response = sut
            .oneshot(empty_request(
                Method::POST,
                "/reservations/pickup?pickup_code=123456",
            ))
            .await
            .unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: ApiResponse<TransactionDto> = response_body(response).await;
        assert_eq!(body.data.user_id, *user_id.as_uuid());
        assert_eq!(body.data.book_instance_id, *instance.id().as_uuid());
        assert_eq!(
            builder.instances.get(instance.id()).unwrap().status(),
            BookInstanceStatus::Borrowed
        );
    }

    #[tokio::test]
    async fn test_pickup_期限切れは410が返る() {
        // Given
        let builder = LibraryTestBuilder::new();
        let (instance, _) =
            builder.add_reserved_instance("RFID-0001", &UserId::new(), "123456", Duration::hours(1));
        builder.clock.advance(Duration::hours(2));
        let sut = build_app(builder.dependencies());

        // When
        let response = sut
            .oneshot(empty_request(
                Method::POST,
                "/reservations/pickup?pickup_code=123456",
            ))
            .await
            .unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::GONE);
        assert_eq!(
            builder.instances.get(instance.id()).unwrap().status(),
            BookInstanceStatus::Available
        );
    }

    #[tokio::test]
    async fn test_pickup_コードの形式が不正なら400が返る() {
        // Given
        let sut = build_app(LibraryTestBuilder::new().dependencies());

        // When
        let response = sut
            .oneshot(empty_request(
                Method::POST,
                "/reservations/pickup?pickup_code=12ab",
            ))
            .await
            .unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
