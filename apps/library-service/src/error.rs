//! # Library Service エラー定義
//!
//! サービス固有のエラーと、HTTP レスポンス（RFC 9457）への変換を定義する。
//!
//! | バリアント | HTTP |
//! |-----------|------|
//! | `BadRequest` | 400 |
//! | `Forbidden` | 403 |
//! | `NotFound` | 404 |
//! | `Conflict` | 409 |
//! | `Expired` | 410 |
//! | `InvalidState` | 422 |
//! | `Database` / `Internal` | 500 |

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bookshelf_domain::DomainError;
use bookshelf_infra::InfraError;
use bookshelf_shared::ErrorResponse;
use thiserror::Error;

/// Library Service で発生するエラー
#[derive(Debug, Error)]
pub enum ServiceError {
    /// リソースが見つからない
    #[error("リソースが見つかりません: {0}")]
    NotFound(String),

    /// 不正なリクエスト（入力値の検証失敗を含む）
    #[error("不正なリクエスト: {0}")]
    BadRequest(String),

    /// 他の利用者の予約がある
    #[error("権限がありません: {0}")]
    Forbidden(String),

    /// 一意制約違反・同時操作
    #[error("競合が発生しました: {0}")]
    Conflict(String),

    /// 現在のステータスでは実行できない
    #[error("不正な状態です: {0}")]
    InvalidState(String),

    /// 受け取り期限切れ
    #[error("期限切れです: {0}")]
    Expired(String),

    /// データベースエラー
    #[error("データベースエラー: {0}")]
    Database(InfraError),

    /// 内部エラー
    #[error("内部エラー: {0}")]
    Internal(String),
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => Self::BadRequest(msg),
            e @ DomainError::NotFound { .. } => Self::NotFound(e.to_string()),
            DomainError::InvalidState(msg) => Self::InvalidState(msg),
            DomainError::Conflict(msg) => Self::Conflict(msg),
            DomainError::Forbidden(msg) => Self::Forbidden(msg),
            DomainError::Expired(msg) => Self::Expired(msg),
        }
    }
}

/// 競合はクライアントが再試行できるよう 409 として返す
impl From<InfraError> for ServiceError {
    fn from(err: InfraError) -> Self {
        match err.as_conflict() {
            Some((entity, id)) => Self::Conflict(format!(
                "{entity}({id}) は既に存在するか、他の操作で更新されています"
            )),
            None => Self::Database(err),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let body = match &self {
            ServiceError::NotFound(msg) => ErrorResponse::not_found(msg),
            ServiceError::BadRequest(msg) => ErrorResponse::bad_request(msg),
            ServiceError::Forbidden(msg) => ErrorResponse::forbidden(msg),
            ServiceError::Conflict(msg) => ErrorResponse::conflict(msg),
            ServiceError::InvalidState(msg) => ErrorResponse::invalid_state(msg),
            ServiceError::Expired(msg) => ErrorResponse::expired(msg),
            ServiceError::Database(e) => {
                tracing::error!(
                    error.category = "infrastructure",
                    error.kind = "database",
                    "データベースエラー: {}\n{}",
                    e,
                    e.span_trace()
                );
                ErrorResponse::internal_error()
            }
            ServiceError::Internal(msg) => {
                tracing::error!(
                    error.category = "infrastructure",
                    error.kind = "internal",
                    "内部エラー: {}",
                    msg
                );
                ErrorResponse::internal_error()
            }
        };

        let status =
            StatusCode::from_u16(body.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(body)).into_response()
    }
}
