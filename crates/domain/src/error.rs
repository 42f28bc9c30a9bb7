//! # ドメイン層エラー定義
//!
//! ビジネスルール違反やドメイン固有の例外状態を表現するエラー型。
//!
//! ## エラーの種類と HTTP ステータスの対応
//!
//! | エラー種別 | HTTP ステータス | 用途 |
//! |-----------|----------------|------|
//! | `Validation` | 400 Bad Request | 入力値の検証失敗 |
//! | `Forbidden` | 403 Forbidden | 他の利用者の予約がある |
//! | `NotFound` | 404 Not Found | エンティティが存在しない |
//! | `Conflict` | 409 Conflict | 一意制約違反・同時更新 |
//! | `Expired` | 410 Gone | 受け取り期限切れの予約 |
//! | `InvalidState` | 422 Unprocessable Entity | 現在のステータスでは実行できない操作 |
//!
//! ## 使用例
//!
//! ```rust
//! use bookshelf_domain::DomainError;
//!
//! fn ensure_available(available: bool) -> Result<(), DomainError> {
//!     if !available {
//!         return Err(DomainError::InvalidState("貸出できない蔵書です".to_string()));
//!     }
//!     Ok(())
//! }
//!
//! assert!(ensure_available(false).is_err());
//! ```

use thiserror::Error;

/// ドメイン層で発生するエラー
///
/// API 層でこのエラーを受け取り、適切な HTTP レスポンスに変換する。
#[derive(Debug, Error)]
pub enum DomainError {
    /// バリデーションエラー
    ///
    /// 必須項目の欠落、文字数超過、範囲外の数値など。
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    /// エンティティが見つからない
    #[error("{entity_type} が見つかりません: {id}")]
    NotFound {
        /// エンティティの種類（"Book", "BookInstance" など）
        entity_type: &'static str,
        /// 検索に使用した識別子
        id:          String,
    },

    /// 現在のステータスでは許可されない操作
    ///
    /// 貸出中の蔵書の予約、未貸出の蔵書の返却など。
    #[error("不正な状態です: {0}")]
    InvalidState(String),

    /// 競合エラー
    ///
    /// タグの重複や、同一蔵書に対する同時操作で発生する。
    #[error("競合が発生しました: {0}")]
    Conflict(String),

    /// 権限エラー
    ///
    /// 他の利用者が予約している蔵書を借りようとした場合など。
    #[error("権限がありません: {0}")]
    Forbidden(String),

    /// 期限切れ
    ///
    /// 受け取り期限を過ぎた予約で受け取りを試みた場合。
    #[error("期限切れです: {0}")]
    Expired(String),
}
