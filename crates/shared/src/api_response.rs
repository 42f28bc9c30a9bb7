//! # API レスポンスエンベロープ
//!
//! 成功レスポンスの統一形式 `{ "data": T }` を提供する。

use serde::{Deserialize, Serialize};

/// 成功レスポンスの統一型
///
/// 一覧でも単体でも `data` の下に結果を置く。
///
/// ```
/// use bookshelf_shared::ApiResponse;
///
/// let response = ApiResponse::new(vec!["RFID-0001"]);
/// assert_eq!(response.data, vec!["RFID-0001"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}
