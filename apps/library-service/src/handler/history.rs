//! # 貸出履歴ハンドラ
//!
//! ## エンドポイント
//!
//! - `GET /users/{user_id}/history` - 利用者の貸出・返却履歴（新しい順）
//! - `GET /admin/transactions` - 直近のトランザクション（新しい順、最大 100 件）

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use bookshelf_domain::user::UserId;
use bookshelf_shared::ApiResponse;
use uuid::Uuid;

use crate::{
    error::ServiceError,
    handler::circulation::transaction_dtos,
    usecase::HistoryUseCaseImpl,
};

/// 履歴 API の共有状態
pub struct HistoryState {
    pub usecase: HistoryUseCaseImpl,
}

/// GET /users/{user_id}/history
#[tracing::instrument(skip_all, fields(%user_id))]
pub async fn user_history(
    State(state): State<Arc<HistoryState>>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let transactions = state
        .usecase
        .user_history(&UserId::from_uuid(user_id))
        .await?;

    Ok(Json(ApiResponse::new(transaction_dtos(&transactions))))
}

/// GET /admin/transactions
#[tracing::instrument(skip_all)]
pub async fn admin_transactions(
    State(state): State<Arc<HistoryState>>,
) -> Result<impl IntoResponse, ServiceError> {
    let transactions = state.usecase.recent_transactions().await?;

    Ok(Json(ApiResponse::new(transaction_dtos(&transactions))))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use bookshelf_domain::transaction::TransactionType;
    use chrono::Duration;
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    use super::*;
    use crate::{
        app_builder::build_app,
        handler::{
            circulation::TransactionDto,
            test_support::{empty_request, response_body},
        },
        test_utils::LibraryTestBuilder,
    };

    #[tokio::test]
    async fn test_get_利用者の履歴が新しい順に返る() {
        // Given
        let builder = LibraryTestBuilder::new();
        let user_id = UserId::new();
        builder.add_borrowed_instance("RFID-0001", &user_id);
        builder.clock.advance(Duration::minutes(5));
        builder
            .circulation_usecase()
            .return_quick("RFID-0001".to_string())
            .await
            .unwrap();
        builder.add_borrowed_instance("RFID-0002", &UserId::new());
        let sut = build_app(builder.dependencies());

        // When
        let response = sut
            .oneshot(empty_request(
                Method::GET,
                &format!("/users/{user_id}/history"),
            ))
            .await
            .unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::OK);
        let body: ApiResponse<Vec<TransactionDto>> = response_body(response).await;
        let types: Vec<_> = body.data.iter().map(|t| t.transaction_type).collect();
        assert_eq!(types, vec![TransactionType::Return, TransactionType::Borrow]);
    }

    #[tokio::test]
    async fn test_get_admin_全利用者のトランザクションが返る() {
        // Given
        let builder = LibraryTestBuilder::new();
        builder.add_borrowed_instance("RFID-0001", &UserId::new());
        builder.add_borrowed_instance("RFID-0002", &UserId::new());
        let sut = build_app(builder.dependencies());

        // When
        let response = sut
            .oneshot(empty_request(Method::GET, "/admin/transactions"))
            .await
            .unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::OK);
        let body: ApiResponse<Vec<TransactionDto>> = response_body(response).await;
        assert_eq!(body.data.len(), 2);
    }
}
