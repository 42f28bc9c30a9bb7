//! # Bookshelf 共有ユーティリティ
//!
//! HTTP レスポンスの共通形式とトレーシング初期化を提供する。
//!
//! ## 設計方針
//!
//! - ドメイン・インフラのどちらにも依存しない
//! - axum への依存は持たない（`IntoResponse` 変換はサービス側の責務）

pub mod api_response;
pub mod error_response;
pub mod health;
pub mod observability;

pub use api_response::ApiResponse;
pub use error_response::ErrorResponse;
pub use health::HealthResponse;
