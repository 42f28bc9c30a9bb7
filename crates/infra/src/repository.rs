//! # リポジトリ実装
//!
//! エンティティごとのリポジトリトレイトと PostgreSQL 実装を提供する。
//!
//! ## 設計方針
//!
//! - **読み取り**: プールから直接実行する（一覧・詳細表示）
//! - **書き込み・行ロック付き読み取り**: [`TxContext`](crate::db::TxContext) を必須引数にする
//! - **ステータス遷移**: `WHERE id = $1 AND status = $expected` の条件付き UPDATE。
//!   0 行なら [`InfraError::conflict`] を返し、同時操作の片方を失敗させる

pub mod book_instance_repository;
pub mod book_repository;
pub mod reservation_repository;
pub mod shelf_repository;
pub mod transaction_repository;

pub use book_instance_repository::{BookInstanceRepository, PostgresBookInstanceRepository};
pub use book_repository::{BookRepository, PostgresBookRepository};
pub use reservation_repository::{PostgresReservationRepository, ReservationRepository};
pub use shelf_repository::{PostgresShelfRepository, ShelfRepository};
pub use transaction_repository::{PostgresTransactionRepository, TransactionRepository};

use bookshelf_domain::DomainError;

use crate::error::InfraError;

/// DB から読み出した値がドメインの制約を満たさない場合のエラー
///
/// CHECK 制約で防いでいるため通常は発生しない。
pub(crate) fn corrupted(entity: &str, source: DomainError) -> InfraError {
    InfraError::unexpected(format!("{entity} の格納値が不正です: {source}"))
}

/// ILIKE 用の部分一致パターンを組み立てる
///
/// 入力中の `%` `_` `\` はワイルドカードとして解釈させない。
pub(crate) fn contains_pattern(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}
