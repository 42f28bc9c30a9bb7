//! # Library Service ライブラリ
//!
//! 無人書架の貸出・返却・取り置き予約を扱う HTTP サービス。
//!
//! ## モジュール構成
//!
//! - [`config`] - 環境変数からの設定読み込み
//! - [`error`] - サービスエラーと HTTP レスポンスへの変換
//! - [`usecase`] - 書誌・書架・蔵書の管理と貸出業務
//! - [`handler`] - HTTP リクエストハンドラ
//! - [`app_builder`] - 依存コンポーネントからのルーター構築
//!
//! バイナリ（`main.rs`）は Postgres / S3 実装を組み立てて
//! [`app_builder::build_app`] に渡すだけの薄い層にする。

pub mod app_builder;
pub mod config;
pub mod error;
pub mod handler;
pub mod usecase;

// テストユーティリティ（内部実装、ドキュメントからは隠す）
#[cfg(any(test, feature = "test-utils"))]
#[doc(hidden)]
pub mod test_utils;
