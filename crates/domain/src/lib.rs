//! # Bookshelf ドメイン層
//!
//! 図書館の蔵書・書架・貸出・予約を表すドメインモデルを定義する。
//!
//! ## 設計方針
//!
//! - **エンティティ**: 一意の識別子を持つオブジェクト（Book, Shelf, BookInstance など）
//! - **値オブジェクト**: バリデーション済みの不変値（BookName, InstanceTag, PickupCode など）
//! - **状態遷移**: ステータス変更はエンティティのメソッドとして表現し、
//!   不正な遷移は [`DomainError`] で拒否する
//!
//! エンティティ間の関連は外部キー相当の ID でのみ保持する。
//! 関連エンティティが必要な場合はリポジトリ経由で明示的に取得する。
//!
//! ## 依存関係の方向
//!
//! ```text
//! library-service → infra → domain
//! ```
//!
//! ドメイン層はインフラ層（DB、外部サービス）に一切依存しない。
//!
//! ## モジュール構成
//!
//! - [`book`] - 書誌情報
//! - [`shelf`] - 物理的な書架
//! - [`book_instance`] - 書架に置かれた蔵書（1 冊の現物）
//! - [`transaction`] - 貸出・返却の履歴
//! - [`reservation`] - 取り置き予約と受け取りコード
//! - [`circulation`] - 貸出可否の判定
//! - [`clock`] - 時刻プロバイダ
//! - [`error`] - ドメインエラー

#[macro_use]
mod macros;

pub mod book;
pub mod book_instance;
pub mod circulation;
pub mod clock;
pub mod error;
pub mod reservation;
pub mod shelf;
pub mod transaction;
pub mod user;

pub use error::DomainError;
