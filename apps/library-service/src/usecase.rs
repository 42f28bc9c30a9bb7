//! # ユースケース層
//!
//! Library Service のビジネスロジックを実装する。
//!
//! ## 設計方針
//!
//! - **依存性注入**: リポジトリ・ストレージ・時刻を `Arc<dyn Trait>` で外部から注入
//! - **薄いハンドラ**: ハンドラは入出力の変換のみ行い、判定はユースケースとドメインに集約
//! - **トランザクション境界**: 1 つの操作の読み書きは 1 つの `TxContext` で確定する
//!
//! ## モジュール構成
//!
//! - `book`: 書誌の CRUD と貸出可能な蔵書の一覧
//! - `shelf`: 書架の CRUD と書架上の蔵書の一覧
//! - `book_instance`: 蔵書（現物）の登録・更新・削除
//! - `circulation`: 貸出・返却・受け取り
//! - `reservation`: 取り置き予約
//! - `history`: 貸出履歴の参照

pub(crate) mod helpers;

pub mod book;
pub mod book_instance;
pub mod circulation;
pub mod history;
pub mod reservation;
pub mod shelf;

pub use book::{BookUseCaseImpl, CreateBookInput, UpdateBookInput};
pub use book_instance::{BookInstanceUseCaseImpl, CreateBookInstanceInput, UpdateBookInstanceInput};
pub use circulation::CirculationUseCaseImpl;
pub use history::HistoryUseCaseImpl;
pub use reservation::{ReservationUseCaseImpl, UpdateReservationInput};
pub use shelf::{CreateShelfInput, ShelfUseCaseImpl, UpdateShelfInput};
