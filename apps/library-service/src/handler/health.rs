//! # ヘルスチェックハンドラ
//!
//! ロードバランサーやコンテナオーケストレーターの死活監視に使う。
//!
//! ```text
//! GET /health
//! ```
//!
//! ## レスポンス例
//!
//! ```json
//! {
//!   "status": "healthy",
//!   "version": "0.1.0"
//! }
//! ```

use axum::Json;
use bookshelf_shared::HealthResponse;

/// ヘルスチェックエンドポイント
///
/// DB には問い合わせず、プロセスが応答できることだけを返す。
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy(env!("CARGO_PKG_VERSION")))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    use super::*;
    use crate::{
        app_builder::build_app,
        handler::test_support::{empty_request, response_body},
        test_utils::LibraryTestBuilder,
    };

    #[tokio::test]
    async fn test_healthはバージョンを返す() {
        // Given
        let sut = build_app(LibraryTestBuilder::new().dependencies());

        // When
        let response = sut
            .oneshot(empty_request(Method::GET, "/health"))
            .await
            .unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::OK);
        let body: HealthResponse = response_body(response).await;
        assert_eq!(body, HealthResponse::healthy(env!("CARGO_PKG_VERSION")));
    }
}
