//! # テストユーティリティ
//!
//! ユースケース・ハンドラテスト用のビルダーを提供する。
//! `test-utils` feature で他のテストクレートからも利用できる。

mod library_test_builder;

pub use library_test_builder::LibraryTestBuilder;
