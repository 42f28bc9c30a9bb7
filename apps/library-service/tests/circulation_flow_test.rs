//! 貸出業務の統合テスト
//!
//! 書誌・書架・蔵書の登録から、予約 → 受け取り → 返却までを
//! HTTP 経由で通しで実行し、履歴と蔵書の状態を検証する。

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use bookshelf_domain::{
    book_instance::BookInstanceStatus,
    reservation::ReservationStatus,
    transaction::{TransactionStatus, TransactionType},
    user::UserId,
};
use bookshelf_library_service::{
    app_builder::build_app,
    handler::{
        book::BookDto,
        book_instance::BookInstanceDto,
        circulation::TransactionDto,
        reservation::ReservationDto,
        shelf::ShelfDto,
    },
    test_utils::LibraryTestBuilder,
};
use bookshelf_shared::ApiResponse;
use chrono::Duration;
use pretty_assertions::assert_eq;
use serde::de::DeserializeOwned;
use tower::ServiceExt;

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
) -> Response {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => request.body(Body::empty()),
    };
    app.clone().oneshot(request.unwrap()).await.unwrap()
}

async fn data_of<T: DeserializeOwned>(response: Response) -> T {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice::<ApiResponse<T>>(&bytes).unwrap().data
}

#[tokio::test]
async fn test_予約から受け取りと返却までの一連の流れ() {
    // Arrange
    let builder = LibraryTestBuilder::new();
    let app = build_app(builder.dependencies());
    let user_id = UserId::new();

    let response = send(
        &app,
        Method::POST,
        "/books",
        Some(serde_json::json!({ "name": "War and Peace", "author": "Leo Tolstoy" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let book: BookDto = data_of(response).await;

    let response = send(
        &app,
        Method::POST,
        "/shelves",
        Some(serde_json::json!({ "name": "駅前の書架", "capacity": 20 })),
    )
    .await;
    let home: ShelfDto = data_of(response).await;
    let response = send(
        &app,
        Method::POST,
        "/shelves",
        Some(serde_json::json!({ "name": "図書館前の書架", "capacity": 20 })),
    )
    .await;
    let other: ShelfDto = data_of(response).await;

    let response = send(
        &app,
        Method::POST,
        "/book-instances",
        Some(serde_json::json!({
            "book_id": book.id,
            "shelf_id": home.id,
            "shelf_pos": 2.0,
            "tag": "RFID-0001"
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let instance: BookInstanceDto = data_of(response).await;

    // Act: 予約
    let exp_date = builder.now() + Duration::days(1);
    let response = send(
        &app,
        Method::POST,
        "/reservations",
        Some(serde_json::json!({
            "user_id": user_id.as_uuid(),
            "book_instance_id": instance.id,
            "exp_date": exp_date.to_rfc3339()
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let reservation: ReservationDto = data_of(response).await;

    // 取り置き中は書誌の貸出可能一覧に出ない
    let response = send(&app, Method::GET, &format!("/books/{}/instances", book.id), None).await;
    let available: Vec<BookInstanceDto> = data_of(response).await;
    assert!(available.is_empty());

    // Act: 受け取り
    builder.clock.advance(Duration::hours(3));
    let response = send(
        &app,
        Method::POST,
        &format!("/reservations/pickup?pickup_code={}", reservation.pickup_code),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let borrow: TransactionDto = data_of(response).await;
    assert_eq!(borrow.user_id, *user_id.as_uuid());

    // 受け取り済みの予約は一覧に出ない
    let response = send(&app, Method::GET, &format!("/users/{user_id}/reservations"), None).await;
    let pending: Vec<ReservationDto> = data_of(response).await;
    assert!(pending.is_empty());

    // Act: 別の書架へ返却
    builder.clock.advance(Duration::days(2));
    let response = send(
        &app,
        Method::POST,
        "/return",
        Some(serde_json::json!({ "instance_tag": "RFID-0001", "shelf_id": other.id })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    // Assert
    let response = send(&app, Method::GET, &format!("/users/{user_id}/history"), None).await;
    let history: Vec<TransactionDto> = data_of(response).await;
    let summary: Vec<_> = history
        .iter()
        .map(|t| (t.transaction_type, t.status))
        .collect();
    assert_eq!(
        summary,
        vec![
            (TransactionType::Return, TransactionStatus::Completed),
            (TransactionType::Borrow, TransactionStatus::Completed),
        ]
    );
    assert_eq!(history[0].shelf_id, other.id);

    let response = send(&app, Method::GET, &format!("/shelves/{}/books", other.id), None).await;
    let on_other: Vec<BookInstanceDto> = data_of(response).await;
    assert_eq!(on_other.len(), 1);
    assert_eq!(on_other[0].status, BookInstanceStatus::Available);

    let stored = builder.reservations.snapshot();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].status(), ReservationStatus::Completed);
}

#[tokio::test]
async fn test_期限切れの受け取りコードでは借りられず蔵書は再び予約できる() {
    // Arrange
    let builder = LibraryTestBuilder::new();
    let instance = builder.add_instance("RFID-0001", BookInstanceStatus::Available);
    let app = build_app(builder.dependencies());

    let response = send(
        &app,
        Method::POST,
        "/reservations",
        Some(serde_json::json!({
            "user_id": UserId::new().as_uuid(),
            "book_instance_id": instance.id().as_uuid(),
            "exp_date": (builder.now() + Duration::hours(1)).to_rfc3339()
        })),
    )
    .await;
    let reservation: ReservationDto = data_of(response).await;

    // Act
    builder.clock.advance(Duration::hours(2));
    let pickup_uri = format!("/reservations/pickup?pickup_code={}", reservation.pickup_code);
    let expired = send(&app, Method::POST, &pickup_uri, None).await;
    let retried = send(&app, Method::POST, &pickup_uri, None).await;

    // Assert
    assert_eq!(expired.status(), StatusCode::GONE);
    assert_eq!(retried.status(), StatusCode::NOT_FOUND);

    let response = send(
        &app,
        Method::POST,
        "/reservations",
        Some(serde_json::json!({
            "user_id": UserId::new().as_uuid(),
            "book_instance_id": instance.id().as_uuid(),
            "exp_date": (builder.now() + Duration::hours(1)).to_rfc3339()
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}
