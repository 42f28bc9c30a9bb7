//! # エラーレスポンス（RFC 9457 Problem Details）
//!
//! - `ErrorResponse` は純粋なデータ構造（`Serialize` / `Deserialize` のみ）
//! - axum の `IntoResponse` 変換はサービス側で行う
//! - 貸出・予約の失敗種別ごとに便利コンストラクタを用意する

use serde::{Deserialize, Serialize};

/// error_type URI のベースパス
const ERROR_TYPE_BASE: &str = "https://bookshelf.example.com/errors";

/// エラーレスポンス（RFC 9457 Problem Details）
///
/// `type` フィールドの URI で問題の種類を識別する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(rename = "type")]
    pub error_type: String,
    pub title:      String,
    pub status:     u16,
    pub detail:     String,
}

impl ErrorResponse {
    /// `error_type_suffix` はベース URI に付加される（例: `"not-found"`）。
    pub fn new(
        error_type_suffix: &str,
        title: impl Into<String>,
        status: u16,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            error_type: format!("{ERROR_TYPE_BASE}/{error_type_suffix}"),
            title: title.into(),
            status,
            detail: detail.into(),
        }
    }

    /// 400 Bad Request
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new("bad-request", "Bad Request", 400, detail)
    }

    /// 400 Validation Error
    pub fn validation_error(detail: impl Into<String>) -> Self {
        Self::new("validation-error", "Validation Error", 400, detail)
    }

    /// 403 Forbidden
    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self::new("forbidden", "Forbidden", 403, detail)
    }

    /// 404 Not Found
    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new("not-found", "Not Found", 404, detail)
    }

    /// 409 Conflict
    pub fn conflict(detail: impl Into<String>) -> Self {
        Self::new("conflict", "Conflict", 409, detail)
    }

    /// 410 Gone（受け取り期限切れ）
    pub fn expired(detail: impl Into<String>) -> Self {
        Self::new("expired", "Expired", 410, detail)
    }

    /// 422 Unprocessable Entity（現在のステータスでは実行できない）
    pub fn invalid_state(detail: impl Into<String>) -> Self {
        Self::new("invalid-state", "Invalid State", 422, detail)
    }

    /// 500 Internal Server Error
    ///
    /// detail は固定値（内部情報を漏らさないため）。
    pub fn internal_error() -> Self {
        Self::new(
            "internal-error",
            "Internal Server Error",
            500,
            "内部エラーが発生しました",
        )
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_jsonシリアライズでtypeフィールド名になる() {
        let error = ErrorResponse::expired("予約の受け取り期限を過ぎています");
        let json = serde_json::to_value(&error).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "type": "https://bookshelf.example.com/errors/expired",
                "title": "Expired",
                "status": 410,
                "detail": "予約の受け取り期限を過ぎています",
            })
        );
    }

    #[test]
    fn test_internal_errorは固定のdetailを返す() {
        let error = ErrorResponse::internal_error();

        assert_eq!(error.status, 500);
        assert_eq!(error.detail, "内部エラーが発生しました");
    }

    #[rstest]
    #[case(ErrorResponse::bad_request(""), 400, "bad-request")]
    #[case(ErrorResponse::validation_error(""), 400, "validation-error")]
    #[case(ErrorResponse::forbidden(""), 403, "forbidden")]
    #[case(ErrorResponse::not_found(""), 404, "not-found")]
    #[case(ErrorResponse::conflict(""), 409, "conflict")]
    #[case(ErrorResponse::expired(""), 410, "expired")]
    #[case(ErrorResponse::invalid_state(""), 422, "invalid-state")]
    fn test_便利コンストラクタのstatusとtype(
        #[case] error: ErrorResponse,
        #[case] status: u16,
        #[case] suffix: &str,
    ) {
        assert_eq!(error.status, status);
        assert_eq!(error.error_type, format!("{ERROR_TYPE_BASE}/{suffix}"));
    }
}
