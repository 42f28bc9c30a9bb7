//! # Bookshelf インフラ層
//!
//! 外部システム（PostgreSQL、S3 互換ストレージ）との接続を担当する。
//!
//! ## 責務
//!
//! - **データベース接続**: PostgreSQL への接続プールとマイグレーション
//! - **トランザクション**: [`db::TxContext`] / [`db::TransactionManager`]
//! - **リポジトリ実装**: エンティティごとのトレイトと PostgreSQL 実装
//! - **オブジェクトストレージ**: 受け取りコード画像の保存
//!
//! ## 依存関係
//!
//! ```text
//! library-service → infra → domain
//! ```
//!
//! ## モジュール構成
//!
//! - [`db`] - 接続プール・マイグレーション・トランザクション
//! - [`error`] - インフラ層エラー定義
//! - [`repository`] - リポジトリ実装
//! - [`s3`] - オブジェクトストレージ
//! - [`qr`] - 受け取りコードの QR 描画
//!
//! ## 使用例
//!
//! ```rust,ignore
//! use bookshelf_infra::{db, repository::PostgresBookRepository};
//!
//! async fn setup() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = db::create_pool("postgres://localhost/bookshelf").await?;
//!     let books = PostgresBookRepository::new(pool.clone());
//!     Ok(())
//! }
//! ```

pub mod db;
pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod qr;
pub mod repository;
pub mod s3;

pub use error::InfraError;
